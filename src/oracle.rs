//! Text-completion oracle backed by the Gemini `generateContent` API.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, instrument, trace, warn};

use crate::config::Config;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/";

/// Takes a prompt, returns free-form text that should contain JSON.
#[async_trait]
pub trait CompletionOracle: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    model: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let base_url = Url::parse(GEMINI_API_BASE).context("invalid default Gemini URL")?;
        Self::with_base_url(api_key, model, base_url)
    }

    pub fn with_base_url(api_key: String, model: String, base_url: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent("graolar-sales/0.1")
            .no_proxy()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            api_key,
            model,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url = Url::parse(&cfg.gemini.base_url).context("invalid gemini.base_url")?;
        Self::with_base_url(cfg.gemini.api_key.clone(), cfg.gemini.model.clone(), base_url)
    }

    pub fn build_request(&self, prompt: &str) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join(&format!("v1beta/models/{}:generateContent", self.model))
            .context("invalid Gemini base URL")?;
        self.http
            .post(endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_generate_body(prompt))
            .build()
            .context("failed to build Gemini request")
    }
}

#[async_trait]
impl CompletionOracle for GeminiClient {
    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt)?;
        debug!(url = %request.url(), "sending generateContent request");

        let resp = self
            .http
            .execute(request)
            .await
            .context("failed to reach Gemini")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err_text = resp.text().await.unwrap_or_default();
            warn!(%status, "Gemini API error");
            return Err(anyhow!("Gemini API error {status}: {err_text}"));
        }

        let raw = resp.text().await.context("failed to read Gemini response")?;
        trace!(raw = %raw, "generateContent response");
        parse_completion_text(&raw)
    }
}

pub fn build_generate_body(prompt: &str) -> Value {
    json!({
        "contents": [
            { "role": "user", "parts": [ { "text": prompt } ] }
        ]
    })
}

/// Concatenated text parts of the first candidate.
pub fn parse_completion_text(raw: &str) -> Result<String> {
    let resp: GenerateContentResponse =
        serde_json::from_str(raw).context("invalid Gemini response JSON")?;
    let content = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| anyhow!("missing Gemini candidate"))?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.trim().is_empty() {
        return Err(anyhow!("empty Gemini response"));
    }
    Ok(text)
}
