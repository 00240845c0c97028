//! Word-level subtitle timing.
//!
//! Every word of a narrative gets the same slice of the target duration. This
//! ignores word length, punctuation pauses and the real speech audio; it is a
//! stand-in for forced alignment.

use crate::error::PipelineError;
use std::fmt::Write;

/// One word's display interval, in seconds from the start of the video.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    pub start: f64,
    pub end: f64,
    pub word: String,
}

/// Splits `narrative` on whitespace and spreads the words uniformly over
/// `[0, total_duration]`.
///
/// An empty narrative yields no entries whatever the duration. Otherwise a
/// duration that is not strictly positive and finite fails with
/// [`PipelineError::InvalidDuration`].
pub fn allocate(narrative: &str, total_duration: f64) -> Result<Vec<SubtitleEntry>, PipelineError> {
    let words: Vec<&str> = narrative.split_whitespace().collect();
    let n = words.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    if !total_duration.is_finite() || total_duration <= 0.0 {
        return Err(PipelineError::InvalidDuration {
            duration: total_duration,
            words: n,
        });
    }

    let per_word = total_duration / n as f64;
    let mut entries = Vec::with_capacity(n);
    let mut cursor = 0.0;
    for (i, word) in words.into_iter().enumerate() {
        // pin the tail so accumulated rounding never leaves a gap at the end
        let end = if i + 1 == n {
            total_duration
        } else {
            cursor + per_word
        };
        entries.push(SubtitleEntry {
            start: cursor,
            end,
            word: word.to_string(),
        });
        cursor = end;
    }

    Ok(entries)
}

pub fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_sec = total_ms / 1000;
    let s = total_sec % 60;
    let total_min = total_sec / 60;
    let m = total_min % 60;
    let h = total_min / 60;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

/// Renders entries as a SubRip document, numbered from 1.
pub fn to_srt(entries: &[SubtitleEntry]) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let _ = writeln!(out, "{}", i + 1);
        let _ = writeln!(
            out,
            "{} --> {}",
            format_srt_time(entry.start),
            format_srt_time(entry.end)
        );
        let _ = writeln!(out, "{}", entry.word);
        out.push('\n');
    }
    out
}
