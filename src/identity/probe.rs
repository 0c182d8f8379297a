//! Public-identity probe: "what address does the outside world see".

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::IdentityError;

/// Request timeout for the probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const PROBE_USER_AGENT: &str = concat!("discography/", env!("CARGO_PKG_VERSION"));

/// Returns the caller's current public address.
#[async_trait]
pub trait PublicIdentityProbe: Send + Sync {
    async fn public_identity(&self) -> Result<String, IdentityError>;
}

/// Probe that GETs a plain-text echo service and trims the body.
#[derive(Debug, Clone)]
pub struct HttpIdentityProbe {
    client: Client,
    url: String,
}

impl HttpIdentityProbe {
    /// Builds a probe for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Probe`] when the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(PROBE_TIMEOUT)
            .user_agent(PROBE_USER_AGENT)
            .build()
            .map_err(|e| IdentityError::probe(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PublicIdentityProbe for HttpIdentityProbe {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn public_identity(&self) -> Result<String, IdentityError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| IdentityError::probe(e.to_string()))?
            .error_for_status()
            .map_err(|e| IdentityError::probe(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| IdentityError::probe(e.to_string()))?;
        let identity = body.trim();
        if identity.is_empty() {
            return Err(IdentityError::probe("empty response body"));
        }
        debug!(identity, "public identity");
        Ok(identity.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_http_probe_trims_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_string("203.0.113.50\n"))
            .mount(&server)
            .await;

        let probe = HttpIdentityProbe::new(format!("{}/ip", server.uri())).unwrap();
        assert_eq!(probe.public_identity().await.unwrap(), "203.0.113.50");
    }

    #[tokio::test]
    async fn test_http_probe_error_status_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let probe = HttpIdentityProbe::new(server.uri()).unwrap();
        assert!(matches!(
            probe.public_identity().await,
            Err(IdentityError::Probe { .. })
        ));
    }

    #[tokio::test]
    async fn test_http_probe_empty_body_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  "))
            .mount(&server)
            .await;

        let probe = HttpIdentityProbe::new(server.uri()).unwrap();
        assert!(probe.public_identity().await.is_err());
    }
}
