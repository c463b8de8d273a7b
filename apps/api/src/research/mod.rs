//! Research API client: the single point of entry for calls to the
//! third-party research service.
//!
//! Each request is attempted once. Upstream failures keep their status and
//! JSON body so handlers can pass them through to the caller.

pub mod handlers;

use axum::http::StatusCode;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::AppError;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Research request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Research API error (status {status})")]
    Api { status: u16, body: Value },

    #[error("Research API returned invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<ResearchError> for AppError {
    fn from(err: ResearchError) -> Self {
        match err {
            ResearchError::Api { status, body } => AppError::Upstream {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                body,
            },
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

#[derive(Clone)]
pub struct ResearchClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ResearchClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET {base}/search?query=...`, returning the upstream JSON unchanged.
    pub async fn search(&self, query: &str) -> Result<Value, ResearchError> {
        let response = self
            .client
            .get(self.endpoint("search"))
            .bearer_auth(&self.api_key)
            .query(&[("query", query)])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!("Research API returned {status}");
            return Err(ResearchError::Api {
                status: status.as_u16(),
                body: upstream_body(&text),
            });
        }

        debug!("Research API call succeeded ({} bytes)", text.len());
        Ok(serde_json::from_str(&text)?)
    }
}

/// Upstream error bodies pass through when they are JSON; plain text is
/// wrapped in the usual error envelope.
fn upstream_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "error": text }))
}
