//! HTTP access to the server under test

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use routewatch_common::{DISCOVERY_PATH, PING_PATH};

use crate::config::ServerConfig;
use crate::error::{E2eError, E2eResult};

/// Authenticated JSON client for the server's API.
///
/// Every request is a single attempt; failures are returned to the caller
/// unchanged so a flaky server shows up as a fetch failure, not a retry loop.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ServerConfig) -> E2eResult<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET the discovery document (`{"links": {...}}`)
    pub async fn fetch_discovery(&self) -> E2eResult<Value> {
        self.get_json(DISCOVERY_PATH).await
    }

    /// GET the service health document
    pub async fn fetch_ping(&self) -> E2eResult<Value> {
        self.get_json(PING_PATH).await
    }

    /// GET `path` and require an HTTP 200 JSON answer
    pub async fn get_json(&self, path: &str) -> E2eResult<Value> {
        let url = self.url(path);
        debug!("GET {}", url);

        let mut request = self.http.get(&url);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(E2eError::UnexpectedStatus {
                url,
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("application/json") {
            return Err(E2eError::UnexpectedContentType { url, content_type });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = ApiClient::new(&ServerConfig {
            base_url: "https://satellite.example.com/".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(client.base_url(), "https://satellite.example.com");
        assert_eq!(
            client.url(DISCOVERY_PATH),
            "https://satellite.example.com/api/v2"
        );
    }
}
