// Content analysis - scoring backends and the ports they implement.

pub mod analyzer;
pub mod language;
pub mod rule_based;

pub use analyzer::*;
pub use language::*;
pub use rule_based::*;
