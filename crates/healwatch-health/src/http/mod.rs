//! reqwest-backed implementations of the collaborator capabilities.

mod prometheus;
mod service;

pub use prometheus::{parse_instant_scalar, PrometheusClient};
pub use service::{HttpServiceClient, ServiceEndpoints};
