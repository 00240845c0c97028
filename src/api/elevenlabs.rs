use super::SpeechSynthesizer;
use crate::config::Config;
use crate::error::PipelineError;
use crate::logw;
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct ElevenLabsSynthesizer {
    client: Client,
    api_key: String,
    voice_id: String,
    model_id: String,
}

impl ElevenLabsSynthesizer {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            client: super::build_client(cfg.request_timeout_secs)?,
            api_key: cfg.elevenlabs_key.clone(),
            voice_id: cfg.eleven_voice_id.clone(),
            model_id: cfg.eleven_model_id.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}?output_format=mp3_44100_128",
            self.voice_id
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, out_mp3_path: &Path) -> Result<PathBuf, PipelineError> {
        let body = serde_json::json!({
            "text": text,
            "model_id": self.model_id,
        });

        let resp = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::SynthesisFailure(format!("ElevenLabs request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            let snippet = raw.chars().take(400).collect::<String>();
            logw(format!("ElevenLabs TTS failed HTTP {}: {}", status.as_u16(), snippet));
            return Err(PipelineError::SynthesisFailure(format!(
                "ElevenLabs HTTP {}",
                status.as_u16()
            )));
        }

        let bytes = resp.bytes().await.map_err(|e| {
            PipelineError::SynthesisFailure(format!("ElevenLabs response read failed: {e}"))
        })?;

        if let Some(parent) = out_mp3_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| PipelineError::media(format!("create dir {}", parent.display()), e))?;
            }
        }
        fs::write(out_mp3_path, &bytes)
            .await
            .map_err(|e| PipelineError::media(format!("write {}", out_mp3_path.display()), e))?;

        Ok(out_mp3_path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_uses_configured_voice() {
        let synth = ElevenLabsSynthesizer {
            client: Client::new(),
            api_key: "el-test".to_string(),
            voice_id: "voice123".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
        };
        assert_eq!(
            synth.endpoint(),
            "https://api.elevenlabs.io/v1/text-to-speech/voice123?output_format=mp3_44100_128"
        );
    }
}
