use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// A fully-buffered HTTP response.
///
/// Header names are stored lowercased so lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Minimal HTTP surface used by the synchronization engine.
///
/// `head` and `get` fail with `AppError::Download` for any status outside 2xx,
/// except that `get` passes 416 through so range probes can observe it.
/// `post_json` always returns the response; callers decide what a failure means.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn head(&self, url: &str, headers: &[(&str, &str)]) -> AppResult<HttpResponse>;

    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> AppResult<HttpResponse>;

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> AppResult<HttpResponse>;
}

pub struct ReqwestTransport {
    http_client: Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns `AppError::Http` if the TLS backend cannot be initialized.
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .user_agent(config.http_user_agent.clone())
            .build()?;

        Ok(Self { http_client })
    }

    async fn buffer(response: reqwest::Response) -> AppResult<HttpResponse> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn head(&self, url: &str, headers: &[(&str, &str)]) -> AppResult<HttpResponse> {
        tracing::debug!(url, "HEAD");
        let mut request = self.http_client.head(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(AppError::Download {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Self::buffer(response).await
    }

    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> AppResult<HttpResponse> {
        tracing::debug!(url, "GET");
        let mut request = self.http_client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() && status != reqwest::StatusCode::RANGE_NOT_SATISFIABLE {
            return Err(AppError::Download {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Self::buffer(response).await
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> AppResult<HttpResponse> {
        tracing::debug!(url, "POST");
        let response = self.http_client.post(url).json(body).send().await?;
        Self::buffer(response).await
    }
}
