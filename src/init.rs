use crate::logi;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

pub async fn ensure_directory(dir: &Path) -> Result<()> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        logi(format!("Created directory: {}", dir.display()));
    }
    Ok(())
}

async fn tool_available(tool: &str) -> bool {
    match tokio::process::Command::new(tool)
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

pub async fn check_ffmpeg() -> bool {
    tool_available("ffmpeg").await
}

pub async fn check_ffprobe() -> bool {
    tool_available("ffprobe").await
}
