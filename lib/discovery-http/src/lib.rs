//! HTTP surface of a discoverable service
//!
//! - `/` liveness text
//! - `/health` JSON health report, probed by the registry
//! - `/api/service` name-to-URL discovery facade
pub mod handlers;
pub mod health;
pub mod server;

pub use handlers::AppState;
pub use health::{HealthCheckResult, HealthChecks, HealthReport, HealthStatus};
pub use server::HttpServer;
