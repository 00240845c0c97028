//! Error kinds for a single video's pipeline.

use thiserror::Error;

/// Failure of one step of the narrate/synthesize/allocate/compose pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The prompt was empty after trimming.
    #[error("narrative prompt is empty")]
    EmptyPrompt,

    /// Text-generation backend failed to respond or returned an unusable body.
    #[error("text generation unavailable: {0}")]
    ModelUnavailable(String),

    /// Text-to-speech backend failed.
    #[error("speech synthesis failed: {0}")]
    SynthesisFailure(String),

    /// Subtitles cannot be spread over a non-positive duration.
    #[error("invalid duration {duration}s for {words} subtitle words")]
    InvalidDuration { duration: f64, words: usize },

    /// Unreadable or unwritable media, or a failed ffmpeg/ffprobe run.
    #[error("media I/O failure: {0}")]
    MediaIo(String),
}

impl PipelineError {
    pub fn media(context: impl AsRef<str>, err: impl std::fmt::Display) -> Self {
        Self::MediaIo(format!("{}: {}", context.as_ref(), err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_duration_message_names_duration_and_word_count() {
        let err = PipelineError::InvalidDuration {
            duration: 0.0,
            words: 3,
        };
        let text = err.to_string();
        assert!(text.contains("0s"));
        assert!(text.contains("3 subtitle words"));
    }

    #[test]
    fn media_helper_joins_context_and_cause() {
        let err = PipelineError::media("read dir /tmp/x", "permission denied");
        assert_eq!(
            err.to_string(),
            "media I/O failure: read dir /tmp/x: permission denied"
        );
    }
}
