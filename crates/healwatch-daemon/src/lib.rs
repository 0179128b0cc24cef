//! healwatch daemon library
//!
//! This module provides the pieces of the `healwatchd` binary:
//! - Layered configuration
//! - REST/SSE API over the orchestrator, incident store and event bus
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError};
pub use server::Server;
