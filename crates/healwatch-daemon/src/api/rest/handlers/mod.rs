//! API request handlers

mod chaos;
mod events;
mod health;
mod incidents;
mod orchestrator;

pub use chaos::*;
pub use events::*;
pub use health::*;
pub use incidents::*;
pub use orchestrator::*;
