//! # Middleware Stack
//!
//! Tower middleware wrapped around every route:
//! - [`tracing_layer`]: request/response tracing with `TraceLayer`.
//! - [`metrics`]: Prometheus request metrics and blog gauges.

pub mod metrics;
pub mod tracing_layer;
