//! HTTP client implementation

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::PlatformError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-over-HTTP client for the control-plane API
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client. The base URL must be absolute.
    pub fn new(base_url: &str) -> Result<Self, PlatformError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| PlatformError::ConfigError(format!("invalid base url {:?}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PlatformError::ConfigError(format!(
                "unsupported scheme in base url {:?}",
                base_url
            )));
        }

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        self.client.request(method, url)
    }

    /// Send a request and turn any non-2xx answer into an error
    async fn send(&self, method: Method, request: RequestBuilder) -> Result<Response, PlatformError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP {} failed: {} - {}", method, status, body);
            return Err(PlatformError::ControlPlaneError(format!("{}: {}", status, body.trim())));
        }

        Ok(response)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PlatformError> {
        let response = self.send(Method::GET, self.request(Method::GET, path)).await?;
        Ok(response.json().await?)
    }

    /// Make a GET request and return the raw body
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, PlatformError> {
        let response = self.send(Method::GET, self.request(Method::GET, path)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, PlatformError> {
        let response = self
            .send(Method::POST, self.request(Method::POST, path).json(body))
            .await?;
        Ok(response.json().await?)
    }

    /// Make a POST request whose answer may be `204 No Content`
    pub async fn post_optional<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, PlatformError> {
        let response = self
            .send(Method::POST, self.request(Method::POST, path).json(body))
            .await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, PlatformError> {
        let response = self
            .send(Method::PUT, self.request(Method::PUT, path).json(body))
            .await?;
        Ok(response.json().await?)
    }

    /// Make a PATCH request
    pub async fn patch<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, PlatformError> {
        let response = self
            .send(Method::PATCH, self.request(Method::PATCH, path).json(body))
            .await?;
        Ok(response.json().await?)
    }
}
