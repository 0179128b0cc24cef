//! # healwatch incident
//!
//! Owner of incident records and their lifecycle.
//!
//! Status moves forward only:
//!
//! ```text
//! detected -> analyzing -> healing -> (escalated -> recovering) -> resolved
//! ```
//!
//! with `failed` reachable from any non-terminal state. Recovery attempts and
//! timeline entries are append-only. Mutations against unknown ids are no-ops.

mod error;
mod store;

pub use error::{IncidentError, IncidentResult};
pub use store::IncidentStore;
