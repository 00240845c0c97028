use super::TextGenerator;
use crate::config::Config;
use crate::error::PipelineError;
use crate::{logi, logw};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You are a narrator for short videos. Continue the user's text as a \
short spoken narration. Reply with the narration only, no titles or stage directions.";

pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            client: super::build_client(cfg.request_timeout_secs)?,
            api_key: cfg.openai_key.clone(),
            model: cfg.text_model.clone(),
            max_tokens: cfg.max_tokens,
        })
    }

    fn request_body(&self, prompt: &str, seed: u64) -> serde_json::Value {
        json!({
            "model": self.model,
            "seed": seed,
            "max_tokens": self.max_tokens,
            "n": 1,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, seed: u64) -> Result<String, PipelineError> {
        if prompt.trim().is_empty() {
            return Err(PipelineError::EmptyPrompt);
        }

        logi(format!("Requesting narrative from {} (seed {})...", self.model, seed));
        let resp = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt, seed))
            .send()
            .await
            .map_err(|e| PipelineError::ModelUnavailable(format!("OpenAI request failed: {e}")))?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();

        if let Some(api_err) = openai_extract_error(&raw) {
            logw(format!("OpenAI HTTP {}: {}", status.as_u16(), api_err));
            return Err(PipelineError::ModelUnavailable(api_err));
        }

        if !status.is_success() {
            let snippet = raw.chars().take(800).collect::<String>();
            logw(format!("OpenAI raw body: {}", snippet));
            return Err(PipelineError::ModelUnavailable(format!(
                "OpenAI HTTP {}",
                status.as_u16()
            )));
        }

        openai_extract_output_text(&raw).ok_or_else(|| {
            let snippet = raw.chars().take(800).collect::<String>();
            logw(format!("OpenAI response parse failed. Raw body: {}", snippet));
            PipelineError::ModelUnavailable("OpenAI response had no message content".to_string())
        })
    }
}

/// Returns `message (type, code)` for an OpenAI error body.
fn openai_extract_error(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;
    let err = root.get("error")?;

    let msg = err
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown error");
    let mut details = Vec::new();
    if let Some(typ) = err.get("type").and_then(|v| v.as_str()) {
        details.push(format!("type {}", typ));
    }
    if let Some(code) = err.get("code").and_then(|v| v.as_str()) {
        details.push(format!("code {}", code));
    }

    if details.is_empty() {
        Some(msg.to_string())
    } else {
        Some(format!("{} ({})", msg, details.join(", ")))
    }
}

fn openai_extract_output_text(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;
    let choices = root.get("choices")?.as_array()?;
    let first = choices.first()?;
    let text = first.get("message")?.get("content")?.as_str()?;
    Some(text.trim().to_string())
}
