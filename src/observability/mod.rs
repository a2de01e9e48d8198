//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request produces:
//!     → logging.rs (structured log events carrying the request ID)
//!     → metrics.rs (request counter and latency histogram)
//!
//! Consumers:
//!     → stdout (log aggregation)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the middleware into every log line of a request
//! - Metrics are cheap; with no recorder installed they are no-ops

pub mod logging;
pub mod metrics;
