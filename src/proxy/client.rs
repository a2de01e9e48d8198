//! Outbound HTTP clients.

use std::time::Duration;

use reqwest::{redirect, Client};

use crate::config::schema::TimeoutConfig;

/// The two outbound clients shared by every request.
///
/// `direct` never follows redirects, so a registry `Location` reaches the
/// response rewriter. `following` is used once a redirect has been chosen
/// to be followed, and for web passthroughs.
#[derive(Debug, Clone)]
pub struct UpstreamClients {
    pub direct: Client,
    pub following: Client,
}

impl UpstreamClients {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let connect_timeout = Duration::from_secs(timeouts.connect_secs);
        // Per-read deadline: a silent upstream fails, a long blob stream does not.
        let read_timeout = Duration::from_secs(timeouts.request_secs);

        let direct = Client::builder()
            .redirect(redirect::Policy::none())
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        let following = Client::builder()
            .redirect(redirect::Policy::limited(10))
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self { direct, following })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clients_build_from_defaults() {
        assert!(UpstreamClients::new(&TimeoutConfig::default()).is_ok());
    }
}
