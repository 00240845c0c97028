//! Remote text and speech backends.

use crate::error::PipelineError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod elevenlabs;
pub mod openai;

pub use elevenlabs::ElevenLabsSynthesizer;
pub use openai::OpenAiGenerator;

/// Produces narrative text from a prompt.
///
/// Output for a fixed `(model, prompt, seed)` is as deterministic as the
/// backend allows; callers pass a fresh seed per video for distinct results.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, seed: u64) -> Result<String, PipelineError>;
}

/// Turns text into an audio file at `out_path`, overwriting it.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, out_path: &Path) -> Result<PathBuf, PipelineError>;
}

fn build_client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    use anyhow::Context;

    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .connect_timeout(std::time::Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")
}
