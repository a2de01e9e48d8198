//! Outbound proxy stages.
//!
//! # Data Flow
//! ```text
//! ProxyRequestContext
//!     → landing.rs (browser-style request on a landing host)
//!         → hub.rs (Docker Hub web API passthrough)
//!     → token.rs (path contains /token: relay, return unmodified)
//!     → upstream.rs (build + send registry request)
//!     → http::response (rewrite)
//!         → redirect.rs (Location: second-hop fetch)
//! ```
//!
//! # Design Decisions
//! - One outbound request per stage, never retried
//! - Clients are built once and shared read-only

pub mod client;
pub mod hub;
pub mod landing;
pub mod redirect;
pub mod token;
pub mod upstream;

pub use client::UpstreamClients;
pub use landing::{LandingPage, StaticLandingPage};
pub use upstream::UpstreamRequest;
