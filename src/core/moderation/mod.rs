// Core moderation module - the decision pipeline and its policy.

pub mod moderation_models;
pub mod pipeline;
pub mod policy;

pub use moderation_models::*;
pub use pipeline::*;
