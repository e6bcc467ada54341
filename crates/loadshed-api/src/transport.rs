// Shared transport configuration for building reqwest::Client instances.
//
// The request/response client and the push-channel reader share timeout
// and user-agent settings through this module. The push channel must not
// inherit the request timeout: a long-lived stream would be cut off.

use std::time::Duration;

use crate::error::Error;

const USER_AGENT: &str = concat!("loadshed/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whole-request timeout for the request/response operations.
    pub timeout: Duration,
    /// TCP connect timeout, applied to every client including the push channel.
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` for request/response calls.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }

    /// Build a `reqwest::Client` for long-lived event streams.
    ///
    /// Only the connect timeout applies; the body is read indefinitely.
    pub fn build_stream_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
