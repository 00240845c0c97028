use ai_video_narrator::api::{ElevenLabsSynthesizer, OpenAiGenerator};
use ai_video_narrator::batch::{BatchDriver, BatchOptions};
use ai_video_narrator::config::Config;
use ai_video_narrator::ffmpeg::FfmpegComposer;
use ai_video_narrator::{init, logw};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

async fn ask(lines: &mut Lines<BufReader<Stdin>>, question: &str) -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(question.as_bytes()).await?;
    stdout.flush().await?;

    let line = lines
        .next_line()
        .await
        .context("Failed to read from stdin")?
        .context("stdin closed before an answer was given")?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config.json").await?;
    init::ensure_directory(&cfg.audio_dir).await?;

    if !init::check_ffmpeg().await {
        logw("FFmpeg not found in PATH. Please install FFmpeg.");
    }
    if !init::check_ffprobe().await {
        logw("ffprobe not found in PATH. Please install FFmpeg.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let prompt = ask(&mut lines, "Enter a prompt for the narrative: ").await?;
    let dir = ask(
        &mut lines,
        "Enter the path to the directory containing video files: ",
    )
    .await?;

    let driver = BatchDriver::new(
        Box::new(OpenAiGenerator::from_config(&cfg)?),
        Box::new(ElevenLabsSynthesizer::from_config(&cfg)?),
        Box::new(FfmpegComposer::from_config(&cfg)),
        BatchOptions::from_config(&cfg),
    );

    let report = driver
        .run(&prompt, &PathBuf::from(dir))
        .await
        .context("Batch run failed")?;

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(path) => println!("[OK] {} -> {}", outcome.task.video_path.display(), path.display()),
            Err(err) => println!("[FAILED] {}: {}", outcome.task.video_path.display(), err),
        }
    }
    for task in &report.not_attempted {
        println!("[SKIPPED] {}", task.video_path.display());
    }

    std::process::exit(if report.all_succeeded() { 0 } else { 1 });
}
