mod core;
mod metrics;
mod tracing;
mod transaction;

pub use core::Middleware;
pub use metrics::MetricsMiddleware;
pub use tracing::TracingMiddleware;
pub use transaction::TransactionMiddleware;
