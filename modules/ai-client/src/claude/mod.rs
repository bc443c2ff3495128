pub(crate) mod types;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::traits::LabelClassifier;
use crate::util::match_label;
use types::*;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

// =============================================================================
// Claude
// =============================================================================

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn messages_url(&self) -> String {
        match self.base_url {
            Some(ref base) => format!("{}/messages", base.trim_end_matches('/')),
            None => MESSAGES_URL.to_string(),
        }
    }

    /// One Messages API round trip. Non-2xx answers become errors carrying
    /// the status and body.
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!(model = %request.model, "Claude label request");

        let response = self
            .http
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await
            .context("Claude request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Claude API error ({status}): {body}"));
        }
        response.json().await.context("Malformed Claude response")
    }
}

fn label_system_prompt(instructions: &str, labels: &[&str]) -> String {
    format!(
        "{instructions}\n\nAnswer with exactly one of these labels and nothing else: {}",
        labels.join(", ")
    )
}

// =============================================================================
// LabelClassifier Implementation
// =============================================================================

#[async_trait]
impl LabelClassifier for Claude {
    async fn classify(&self, instructions: &str, text: &str, labels: &[&str]) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .system(label_system_prompt(instructions, labels))
            .message(WireMessage::user(text))
            .max_tokens(16)
            .temperature(0.0);

        let response = self.send(&request).await?;
        let answer = response
            .text()
            .ok_or_else(|| anyhow!("No text in Claude response"))?;

        match_label(answer, labels)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Claude answered outside the label set: {answer:?}"))
    }
}
