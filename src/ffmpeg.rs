use crate::config::Config;
use crate::error::PipelineError;
use crate::subtitle::{self, SubtitleEntry};
use crate::{logi, logw};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Everything needed to mux one narrated, subtitled video.
#[derive(Debug, Clone, Copy)]
pub struct ComposeRequest<'a> {
    pub video: &'a Path,
    pub audio: &'a Path,
    pub subtitles: &'a [SubtitleEntry],
    pub output: &'a Path,
    /// Authoritative length of the source video, in seconds.
    pub video_duration: f64,
}

#[async_trait]
pub trait VideoComposer: Send + Sync {
    async fn media_duration(&self, path: &Path) -> Result<f64, PipelineError>;

    async fn compose(&self, request: &ComposeRequest<'_>) -> Result<PathBuf, PipelineError>;
}

#[derive(Debug, Clone)]
pub struct SubtitleStyle {
    pub font: String,
    pub font_size: u32,
}

impl SubtitleStyle {
    /// ASS override: white text with a thin outline, bottom-center (alignment 2).
    fn force_style(&self) -> String {
        format!(
            "FontName={},FontSize={},PrimaryColour=&H00FFFFFF,OutlineColour=&H00000000,Outline=1,Shadow=0,Alignment=2",
            self.font, self.font_size
        )
    }
}

/// Composes with the `ffmpeg` binary and measures with `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfmpegComposer {
    pub style: SubtitleStyle,
    pub truncate_audio_to_video: bool,
}

impl FfmpegComposer {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            style: SubtitleStyle {
                font: cfg.subtitle_font.clone(),
                font_size: cfg.subtitle_font_size,
            },
            truncate_audio_to_video: cfg.truncate_audio_to_video,
        }
    }
}

#[async_trait]
impl VideoComposer for FfmpegComposer {
    async fn media_duration(&self, path: &Path) -> Result<f64, PipelineError> {
        ffmedia_duration_seconds(path).await
    }

    async fn compose(&self, request: &ComposeRequest<'_>) -> Result<PathBuf, PipelineError> {
        let audio_dur = ffmedia_duration_seconds(request.audio).await?;
        let trim_to = audio_trim(audio_dur, request.video_duration, self.truncate_audio_to_video);
        if trim_to.is_some() {
            logi(format!(
                "Narration {:.2}s is longer than video {:.2}s; truncating audio.",
                audio_dur, request.video_duration
            ));
        }

        // Deleted when dropped, on success and on every error path below.
        let srt_file = if request.subtitles.is_empty() {
            logw(format!(
                "No subtitle words for {}; rendering without subtitles.",
                request.video.display()
            ));
            None
        } else {
            Some(write_srt_tempfile(request.subtitles)?)
        };

        let args = build_compose_args(
            request.video,
            request.audio,
            srt_file.as_ref().map(|f| f.path()),
            &self.style,
            trim_to,
            request.output,
        );
        run_cmd(&args).await?;

        if !request.output.exists() {
            return Err(PipelineError::MediaIo(format!(
                "ffmpeg reported success but {} is missing",
                request.output.display()
            )));
        }
        Ok(request.output.to_path_buf())
    }
}

/// Output length cap for the mux. Only narration longer than the video is cut;
/// shorter narration is never padded.
pub fn audio_trim(audio_dur: f64, video_dur: f64, truncate: bool) -> Option<f64> {
    if truncate && audio_dur > video_dur {
        Some(video_dur)
    } else {
        None
    }
}

fn write_srt_tempfile(entries: &[SubtitleEntry]) -> Result<tempfile::NamedTempFile, PipelineError> {
    let mut file = tempfile::Builder::new()
        .prefix("narration_")
        .suffix(".srt")
        .tempfile()
        .map_err(|e| PipelineError::media("create subtitle temp file", e))?;
    file.write_all(subtitle::to_srt(entries).as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| PipelineError::media("write subtitle temp file", e))?;
    Ok(file)
}

fn escape_with(input: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if special.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Escapes an unquoted filter option value for both ffmpeg parsing levels:
/// the option value first, then the filtergraph description around it.
fn escape_filter_value(value: &str) -> String {
    let option_level = escape_with(value, &['\\', '\'', ':']);
    escape_with(&option_level, &['\\', '\'', '[', ']', ',', ';'])
}

pub fn build_compose_args(
    video: &Path,
    audio: &Path,
    srt: Option<&Path>,
    style: &SubtitleStyle,
    trim_to: Option<f64>,
    output: &Path,
) -> Vec<String> {
    let mut args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        video.display().to_string(),
        "-i".to_string(),
        audio.display().to_string(),
    ];

    if let Some(srt) = srt {
        args.push("-vf".to_string());
        args.push(format!(
            "subtitles=filename={}:charenc=UTF-8:force_style={}",
            escape_filter_value(&srt.to_string_lossy()),
            escape_filter_value(&style.force_style())
        ));
    }

    args.extend(
        [
            "-map", "0:v:0", "-map", "1:a:0", "-c:v", "libx264", "-pix_fmt", "yuv420p",
            "-preset", "veryfast", "-crf", "22", "-c:a", "aac", "-b:a", "192k",
        ]
        .iter()
        .map(|s| s.to_string()),
    );

    if let Some(dur) = trim_to {
        args.push("-t".to_string());
        args.push(format!("{:.3}", dur));
    }

    args.push("-movflags".to_string());
    args.push("+faststart".to_string());
    args.push(output.display().to_string());
    args
}

async fn run_cmd(args: &[String]) -> Result<(), PipelineError> {
    if args.is_empty() {
        return Ok(());
    }

    let output = Command::new(&args[0])
        .args(&args[1..])
        .output()
        .await
        .map_err(|e| PipelineError::media(format!("spawn {}", args[0]), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let snippet = stderr.trim().chars().take(800).collect::<String>();
        return Err(PipelineError::MediaIo(format!(
            "{} exited with {}: {}",
            args[0], output.status, snippet
        )));
    }

    Ok(())
}

/// Container duration in seconds as reported by ffprobe.
///
/// Non-positive values are returned as-is; the subtitle allocator decides what
/// to do with them.
pub async fn ffmedia_duration_seconds(path: &Path) -> Result<f64, PipelineError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| PipelineError::media("spawn ffprobe", e))?;

    if !output.status.success() {
        return Err(PipelineError::MediaIo(format!(
            "ffprobe failed on {}",
            path.display()
        )));
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        PipelineError::MediaIo(format!("ffprobe returned no duration for {}", path.display()))
    })
}

fn parse_duration(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|d| !d.is_nan())
}
