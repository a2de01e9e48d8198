//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → user_agent.rs (crawler blocklist → decoy page)
//!     → headers.rs (allowlist headers for the outbound request)
//! Upstream response:
//!     → headers.rs (strip security headers, inject CORS)
//! ```
//!
//! # Design Decisions
//! - Header sets are constant data, not per-request logic
//! - Blocklist is parsed at startup and never mutated

pub mod headers;
pub mod user_agent;

pub use headers::HeaderRewritePolicy;
pub use user_agent::UserAgentBlocklist;
