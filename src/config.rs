use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "open_api_key")]
    #[serde(default)]
    pub openai_key: String,
    #[serde(rename = "elevenlabs_api_key")]
    #[serde(default)]
    pub elevenlabs_key: String,
    #[serde(default = "default_voice_id")]
    pub eleven_voice_id: String,
    #[serde(default = "default_model_id")]
    pub eleven_model_id: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_font")]
    pub subtitle_font: String,
    #[serde(default = "default_font_size")]
    pub subtitle_font_size: u32,
    /// Cut narration that runs past the end of the video. Shorter narration is never padded.
    #[serde(default = "default_true")]
    pub truncate_audio_to_video: bool,
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,
    #[serde(default)]
    pub stop_on_first_failure: bool,
    /// Leave `output_<n>_<name>` files from earlier runs out of discovery.
    #[serde(default)]
    pub skip_previous_outputs: bool,
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_voice_id() -> String {
    "JBFqnCBsd6RMkjVDRZzb".to_string()
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_text_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    150
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_font() -> String {
    "Arial".to_string()
}

fn default_font_size() -> u32 {
    24
}

fn default_true() -> bool {
    true
}

fn default_video_extensions() -> Vec<String> {
    vec!["mp4".to_string(), "mov".to_string(), "avi".to_string()]
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        Self::from_json_str(&content)
    }

    /// Parses and validates a config, filling empty credentials from the environment.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let mut config: Config =
            serde_json::from_str(content).context("Failed to parse config JSON")?;

        if config.openai_key.is_empty() {
            config.openai_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        }
        if config.elevenlabs_key.is_empty() {
            config.elevenlabs_key = std::env::var("ELEVENLABS_API_KEY").unwrap_or_default();
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.openai_key.is_empty() {
            anyhow::bail!("config.json: open_api_key missing");
        }
        if self.elevenlabs_key.is_empty() {
            anyhow::bail!("config.json: elevenlabs_api_key missing");
        }
        if self.video_extensions.is_empty() {
            anyhow::bail!("config.json: video_extensions must list at least one extension");
        }
        if self.subtitle_font.is_empty() || self.subtitle_font.contains(',') {
            anyhow::bail!("config.json: subtitle_font must be a non-empty name without commas");
        }
        if self.subtitle_font_size == 0 {
            anyhow::bail!("config.json: subtitle_font_size must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = Config::from_json_str(
            r#"{"open_api_key":"sk-test","elevenlabs_api_key":"el-test"}"#,
        )
        .unwrap();

        assert_eq!(cfg.text_model, "gpt-4o-mini");
        assert_eq!(cfg.max_tokens, 150);
        assert_eq!(cfg.eleven_voice_id, "JBFqnCBsd6RMkjVDRZzb");
        assert_eq!(cfg.subtitle_font, "Arial");
        assert_eq!(cfg.subtitle_font_size, 24);
        assert!(cfg.truncate_audio_to_video);
        assert!(!cfg.stop_on_first_failure);
        assert!(!cfg.skip_previous_outputs);
        assert_eq!(cfg.video_extensions, vec!["mp4", "mov", "avi"]);
        assert_eq!(cfg.audio_dir, PathBuf::from("."));
        assert_eq!(cfg.rng_seed, None);
    }

    #[test]
    fn overrides_are_honoured() {
        let cfg = Config::from_json_str(
            r#"{
                "open_api_key": "sk-test",
                "elevenlabs_api_key": "el-test",
                "truncate_audio_to_video": false,
                "stop_on_first_failure": true,
                "rng_seed": 42,
                "skip_previous_outputs": true,
                "video_extensions": ["mkv"]
            }"#,
        )
        .unwrap();

        assert!(!cfg.truncate_audio_to_video);
        assert!(cfg.stop_on_first_failure);
        assert_eq!(cfg.rng_seed, Some(42));
        assert!(cfg.skip_previous_outputs);
        assert_eq!(cfg.video_extensions, vec!["mkv"]);
    }

    #[test]
    fn empty_extension_list_is_rejected() {
        let err = Config::from_json_str(
            r#"{"open_api_key":"a","elevenlabs_api_key":"b","video_extensions":[]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("video_extensions"));
    }

    #[test]
    fn font_with_comma_is_rejected() {
        let err = Config::from_json_str(
            r#"{"open_api_key":"a","elevenlabs_api_key":"b","subtitle_font":"Arial,Bold"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("subtitle_font"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(Config::from_json_str("{not json").is_err());
    }
}
