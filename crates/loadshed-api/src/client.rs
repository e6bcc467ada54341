// Web API HTTP client
//
// Wraps `reqwest::Client` with URL construction and JSON response
// handling. Endpoint groups (stage, places, schedule) are implemented as
// inherent methods in separate files to keep this module focused on
// transport mechanics.

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{Error, Operation};
use crate::transport::TransportConfig;

/// Raw HTTP client for the loadshedding web API.
///
/// All methods return parsed payloads. Non-success statuses and bodies
/// that fail to parse are reported as errors tagged with the operation
/// that issued the request; nothing is retried at this layer.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// The `base_url` is the web service root (e.g. `http://localhost:7010`);
    /// a path prefix such as `https://host/loadshed/` is preserved.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Result<Self, Error> {
        if base_url.cannot_be_a_base() {
            return Err(Error::CannotBeABase(base_url.to_string()));
        }
        Ok(Self { http, base_url })
    }

    /// Convenience constructor from a URL string.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Self::with_client(http, Url::parse(base_url)?)
    }

    /// The web service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/{segments...}`.
    ///
    /// Each segment is percent-encoded individually, so a province named
    /// `"North West"` or a town containing `/` stays a single path segment.
    pub(crate) fn api_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::CannotBeABase(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and parse the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        operation: Operation,
        url: Url,
    ) -> Result<T, Error> {
        debug!(%operation, "GET {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| Error::Transport { operation, source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                operation,
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|source| Error::Transport { operation, source })?;

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => Err(Error::Deserialization {
                operation,
                message: e.to_string(),
                body,
            }),
        }
    }
}

/// Reject empty path identifiers before any request is made.
pub(crate) fn require_non_empty(
    operation: Operation,
    field: &'static str,
    value: &str,
) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument { operation, field });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::from_reqwest(base, reqwest::Client::new()).unwrap()
    }

    #[test]
    fn api_url_from_bare_host() {
        let url = client("http://localhost:7010").api_url(&["provinces"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:7010/api/provinces");
    }

    #[test]
    fn api_url_keeps_path_prefix() {
        let url = client("https://example.org/loadshed/")
            .api_url(&["stage"])
            .unwrap();
        assert_eq!(url.as_str(), "https://example.org/loadshed/api/stage");
    }

    #[test]
    fn api_url_percent_encodes_each_segment() {
        let url = client("http://localhost:7010")
            .api_url(&["schedule", "North West", "Rustenburg/Central"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:7010/api/schedule/North%20West/Rustenburg%2FCentral"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        let result = ApiClient::from_reqwest("mailto:ops@example.org", reqwest::Client::new());
        assert!(matches!(result, Err(Error::CannotBeABase(_))));
    }

    #[test]
    fn blank_identifiers_are_rejected() {
        let err = require_non_empty(Operation::Towns, "province", "  ").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidArgument {
                operation: Operation::Towns,
                field: "province"
            }
        ));
        assert!(require_non_empty(Operation::Towns, "province", "Gauteng").is_ok());
    }
}
