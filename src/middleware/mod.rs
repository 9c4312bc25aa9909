//! Pipeline middleware.
//!
//! Middleware attached to a resource is inherited, parent first, by every
//! method and child declared under it afterwards.

mod core;
mod metrics;
mod tracing;

pub use core::Middleware;
pub use metrics::MetricsMiddleware;
pub use tracing::TracingMiddleware;
