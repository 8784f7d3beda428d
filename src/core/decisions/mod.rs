// Decision persistence port and the read/override service on top of it.

pub mod decision_service;
pub mod decision_store;

pub use decision_service::*;
pub use decision_store::*;
