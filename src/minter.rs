//! Link-Minting Backend
//!
//! Converts a destination URL into a trackable short URL through a
//! Linkly-style link-creation API. One bounded request per mint; a failure is
//! reported to the caller, which degrades substitution rather than the run.

use crate::config::MinterConfig;
use crate::error::BackendError;
use crate::http::{build_http_client, map_status_error, map_transport_error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Complete, validated minting credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintCredentials {
    pub email: String,
    pub api_key: String,
    pub workspace_id: i64,
}

/// One minted tracking link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingLink {
    pub short_url: String,
}

#[derive(Serialize)]
struct MintRequest<'a> {
    email: &'a str,
    api_key: &'a str,
    workspace_id: i64,
    url: &'a str,
    name: &'a str,
    utm_source: &'a str,
}

#[derive(Deserialize)]
struct MintResponse {
    full_url: Option<String>,
}

/// Client for the link-minting backend.
pub struct LinkMinter {
    http: Client,
    endpoint: String,
    link_name: String,
    utm_source: String,
}

impl LinkMinter {
    pub fn new(config: &MinterConfig) -> Result<Self, BackendError> {
        Ok(Self {
            http: build_http_client()?,
            endpoint: config.endpoint.clone(),
            link_name: config.link_name.clone(),
            utm_source: config.utm_source.clone(),
        })
    }

    /// Mint one tracking link for `destination`.
    pub async fn mint(
        &self,
        credentials: &MintCredentials,
        destination: &str,
    ) -> Result<TrackingLink, BackendError> {
        debug!(%destination, workspace_id = credentials.workspace_id, "Minting tracking link");

        let request = MintRequest {
            email: &credentials.email,
            api_key: &credentials.api_key,
            workspace_id: credentials.workspace_id,
            url: destination,
            name: &self.link_name,
            utm_source: &self.utm_source,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, body));
        }

        let minted: MintResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

        match minted.full_url {
            Some(short_url) if !short_url.is_empty() => Ok(TrackingLink { short_url }),
            _ => Err(BackendError::MalformedResponse(
                "No short URL in mint response".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_request_serialization() {
        let request = MintRequest {
            email: "ops@example.com",
            api_key: "key",
            workspace_id: 12345,
            url: "https://www.method.me",
            name: "My New Tracking Link",
            utm_source: "newsletter",
        };

        let value: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["email"], "ops@example.com");
        assert_eq!(value["workspace_id"], 12345);
        assert_eq!(value["url"], "https://www.method.me");
        assert_eq!(value["utm_source"], "newsletter");
    }

    #[test]
    fn test_mint_response_parses_full_url() {
        let minted: MintResponse =
            serde_json::from_str(r#"{"full_url": "https://x.ly/abc", "id": 7}"#).unwrap();
        assert_eq!(minted.full_url.as_deref(), Some("https://x.ly/abc"));

        let missing: MintResponse = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert!(missing.full_url.is_none());
    }
}
