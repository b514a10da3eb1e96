// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, HeaderName};

use crate::config::{ProviderConfig, default_user_agent};
use crate::error::HttpError;
use crate::urls::{extract_credentials, strip_credentials};

/// Response headers relevant to a metadata probe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Length header value, if present
    pub content_length: Option<u64>,
    /// Content-Type header value, if present
    pub content_type: Option<String>,
    /// Content-Disposition header value, if present
    pub content_disposition: Option<String>,
}

/// HTTP client abstraction for testability
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch the entire response body as bytes
    async fn get_bytes(&self, url: &str) -> Result<Bytes, HttpError>;

    /// Issue a request and read only the response headers
    async fn get_headers(&self, url: &str) -> Result<HeadResponse, HttpError>;
}

/// Default HTTP client implementation using reqwest.
///
/// Credentials embedded in a URL are removed from it and sent as HTTP
/// basic auth instead.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl ReqwestClient {
    /// Create a new ReqwestClient with default settings
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(default_user_agent())
            .build()
            .unwrap_or_default();
        Self::with_client(client)
    }

    /// Create a client carrying the configured user agent and timeout
    pub fn from_config(config: &ProviderConfig) -> Result<Self, HttpError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            timeout: config.timeout,
        })
    }

    /// Create a new ReqwestClient with a custom reqwest::Client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, HttpError> {
        let credentials = extract_credentials(url)?;
        let mut request = self.client.get(strip_credentials(url));

        if credentials.is_present()
            && let Some(username) = credentials.username
        {
            request = request.basic_auth(username, credentials.password);
        }

        request.send().await.map_err(|e| self.map_error(e))
    }

    fn map_error(&self, e: reqwest::Error) -> HttpError {
        match self.timeout {
            Some(timeout) if e.is_timeout() => HttpError::Timeout(timeout),
            _ => HttpError::Request(e),
        }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_bytes(&self, url: &str) -> Result<Bytes, HttpError> {
        let response = self.send(url).await?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(HttpError::Status {
                url: strip_credentials(url),
                status,
            });
        }

        response.bytes().await.map_err(|e| self.map_error(e))
    }

    async fn get_headers(&self, url: &str) -> Result<HeadResponse, HttpError> {
        // The body is never polled; dropping the response closes it
        let response = self.send(url).await?;
        let headers = response.headers();

        Ok(HeadResponse {
            status: response.status().as_u16(),
            content_length: response.content_length(),
            content_type: header_string(headers, CONTENT_TYPE),
            content_disposition: header_string(headers, CONTENT_DISPOSITION),
        })
    }
}

fn header_string(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reqwest_client_can_be_created() {
        let _client = ReqwestClient::new();
        let _client_default = ReqwestClient::default();
    }

    #[test]
    fn reqwest_client_can_be_built_from_config() {
        let config = ProviderConfig::new("key").with_timeout(Some(Duration::from_secs(5)));
        let client = ReqwestClient::from_config(&config).unwrap();
        assert_eq!(client.timeout, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn malformed_credentials_fail_before_sending() {
        let client = ReqwestClient::new();
        let result = client.get_bytes("http://%FF:pw@127.0.0.1:9/").await;
        assert!(matches!(result, Err(HttpError::Credentials(_))));
    }
}
