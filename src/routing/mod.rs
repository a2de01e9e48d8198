//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, query)
//!     → path.rs (repair encoded query)
//!     → router.rs (host label / ns → upstream registry)
//!     → path.rs (implicit library/ namespace)
//!     → Return: ProxyRequestContext
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → exact label map + default registry fallback
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always resolves to the same registry
//! - Resolution state lives in a per-request context, never in globals

pub mod context;
pub mod path;
pub mod router;

pub use context::ProxyRequestContext;
pub use router::{Resolution, RouteEntry, RouteTable};
