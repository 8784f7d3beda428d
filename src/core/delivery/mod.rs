// Job delivery subsystem - the transport port and the worker loop.

pub mod queue;
pub mod worker;

pub use queue::*;
pub use worker::*;
