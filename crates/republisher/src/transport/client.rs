//! HTTP transport for the republish API
//!
//! Every request is a JSON `POST` carrying the configured token header. Only
//! 2xx answers count as delivered; anything else becomes
//! [`TransportError::Status`] with the canonical reason phrase.

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT};
use reqwest::Client;
use republisher_common::Identifier;
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::endpoints;
use super::types::{BatchRequest, BatchResponse, IdItem};
use super::{PublishOutcome, PublishTransport};
use crate::config::ClientConfig;
use crate::error::TransportError;

/// reqwest-backed [`PublishTransport`]
pub struct HttpTransport {
    client: Client,
    batch_url: Url,
    single_url: Url,
    auth_header: HeaderName,
    auth_token: HeaderValue,
}

impl HttpTransport {
    /// Build the client, resolve both endpoint URLs, and validate the token header
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        let batch_url = endpoints::resource_url(&config.api_base_url, &config.batch_path)?;
        let single_url = endpoints::resource_url(&config.api_base_url, &config.single_path)?;

        let auth_header = HeaderName::from_bytes(config.auth_header.as_bytes())
            .map_err(|e| TransportError::Header(format!("{}: {}", config.auth_header, e)))?;
        let mut auth_token = HeaderValue::from_str(&config.auth_token)
            .map_err(|e| TransportError::Header(format!("token for {}: {}", config.auth_header, e)))?;
        auth_token.set_sensitive(true);

        Ok(Self {
            client,
            batch_url,
            single_url,
            auth_header,
            auth_token,
        })
    }

    pub fn batch_url(&self) -> &Url {
        &self.batch_url
    }

    /// POST `body` as JSON and return the raw response body of a 2xx answer
    async fn post<B: Serialize + Sync>(&self, url: &Url, body: &B) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .post(url.clone())
            .header(ACCEPT, "application/json")
            .header(self.auth_header.clone(), self.auth_token.clone())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "Republish API responded");

        if !status.is_success() {
            return Err(TransportError::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown Status"),
            ));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl PublishTransport for HttpTransport {
    async fn publish(&self, identifiers: &[Identifier]) -> Result<PublishOutcome, TransportError> {
        let request = BatchRequest::new(identifiers);
        let body = self.post(&self.batch_url, &request).await?;

        let response: BatchResponse = serde_json::from_slice(&body)
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        debug!(
            sent = identifiers.len(),
            accepted = response.ids.len(),
            rejected = response.errors.len(),
            "Batch published"
        );

        Ok(PublishOutcome::new(
            response.ids.into_iter().map(|item| item.id),
            response.errors.into_iter().map(|item| item.id),
        ))
    }

    async fn publish_one(&self, identifier: Identifier) -> Result<(), TransportError> {
        self.post(&self.single_url, &IdItem::from(identifier)).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_resolves_urls() {
        let config = ClientConfig {
            api_base_url: "http://localhost:8080/".to_string(),
            batch_path: "/cashback/republish".to_string(),
            ..Default::default()
        };

        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(
            transport.batch_url().as_str(),
            "http://localhost:8080/cashback/republish"
        );
    }

    #[test]
    fn test_transport_rejects_bad_header_name() {
        let config = ClientConfig {
            auth_header: "X Bad Header".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            HttpTransport::new(&config),
            Err(TransportError::Header(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let config = ClientConfig {
            api_base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_millis: 500,
            ..Default::default()
        };

        let transport = HttpTransport::new(&config).unwrap();
        let err = transport.publish(&[Identifier::new(1)]).await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
