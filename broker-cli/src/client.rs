//! HTTP client for the broker's HTTP API.
//!
//! Unlike a wrapped `{success, data}` envelope, the broker returns the
//! resource body directly on success and `{"error": {"code", "message"}}`
//! on failure (see `broker-core`'s `BrokerError::into_response`).

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, serde::Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check_status(&self, url: &str, status: StatusCode, body: &str) -> Result<()> {
        if status.is_success() {
            return Ok(());
        }
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => anyhow::bail!("{} ({}): {}", envelope.error.code, status, envelope.error.message),
            Err(_) => anyhow::bail!("{} returned {}: {}", url, status, body),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).send().await.with_context(|| format!("GET {url} failed"))?;
        let status = resp.status();
        let body = resp.text().await.with_context(|| format!("reading response body from {url}"))?;
        self.check_status(&url, status, &body).await?;
        serde_json::from_str(&body).with_context(|| format!("parsing response from {url}"))
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?;
        let status = resp.status();
        let text = resp.text().await.with_context(|| format!("reading response body from {url}"))?;
        self.check_status(&url, status, &text).await?;
        serde_json::from_str(&text).with_context(|| format!("parsing response from {url}"))
    }

    /// POST with a JSON body, for endpoints that answer with a bare status
    /// code (`report_result`/`report_failure`/`heartbeat`/`force_close_bidding`).
    pub async fn post_no_content<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        self.check_status(&url, status, &text).await
    }

    pub async fn get_raw(&self, path: &str) -> Result<serde_json::Value> {
        self.get(path).await
    }
}
