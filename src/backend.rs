//! Thin HTTP client for the story backend.
//!
//! Wraps the three contracts the chat front end depends on:
//!
//! | Method | Path | Failure mode |
//! |--------|------|--------------|
//! | `POST` | `/chat` | hard — any non-2xx or transport error propagates |
//! | `POST` | `/generate-image` | soft — swallowed, yields `None` |
//! | `GET`  | `/api/pdf-index` | hard — the index is required at startup |
//!
//! The asymmetry is the contract: a missing answer blocks the conversation,
//! a missing illustration just leaves the message without one. There are no
//! retries here; callers see the raw fetch outcome.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::retriever::StoryIndex;

#[derive(Deserialize)]
struct ChatResponse {
    answer: String,
}

#[derive(Deserialize)]
struct ImageResponse {
    #[serde(default)]
    image_base64: String,
}

/// Client for the story backend's JSON API.
pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// `POST /chat` — returns the assistant's answer text.
    ///
    /// Any non-2xx status or transport failure is a hard error.
    pub async fn ask(&self, question: &str) -> Result<String> {
        let resp = self
            .http
            .post(format!("{}/chat", self.base_url))
            .json(&serde_json::json!({ "question": question }))
            .send()
            .await
            .with_context(|| format!("Could not connect to backend at {}", self.base_url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Backend error {} from /chat: {}", status, body);
        }

        let data: ChatResponse = resp
            .json()
            .await
            .context("Invalid /chat response: expected {\"answer\": ...}")?;
        Ok(data.answer)
    }

    /// `POST /generate-image` — returns the illustration as base64 PNG.
    ///
    /// Every failure is swallowed: the message is simply shown without an
    /// illustration. The cause goes to stderr so operators can see it.
    pub async fn illustrate(&self, prompt: &str) -> Option<String> {
        match self.try_illustrate(prompt).await {
            Ok(image) if !image.is_empty() => Some(image),
            Ok(_) => None,
            Err(e) => {
                eprintln!("illustration skipped: {:#}", e);
                None
            }
        }
    }

    async fn try_illustrate(&self, prompt: &str) -> Result<String> {
        let resp = self
            .http
            .post(format!("{}/generate-image", self.base_url))
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            bail!("backend returned {} from /generate-image", status);
        }

        let data: ImageResponse = resp.json().await?;
        Ok(data.image_base64)
    }

    /// `GET /api/pdf-index` — fetch the embedding index.
    ///
    /// Hard failure: without the index there is nothing to search.
    pub async fn fetch_index(&self) -> Result<StoryIndex> {
        let resp = self
            .http
            .get(format!("{}/api/pdf-index", self.base_url))
            .send()
            .await
            .with_context(|| format!("Could not connect to backend at {}", self.base_url))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("Failed to fetch index from backend: {}", status);
        }

        let index: StoryIndex = resp
            .json()
            .await
            .context("Invalid /api/pdf-index response")?;
        Ok(index)
    }
}
