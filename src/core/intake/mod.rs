// Intake boundary - validation, rate tracking, enqueue.

pub mod intake_service;

pub use intake_service::*;
