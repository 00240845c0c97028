pub mod api;
pub mod batch;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod init;
pub mod subtitle;

pub use error::PipelineError;

pub fn logv(tag: &str, message: &str) {
    match tag {
        "WARN" => tracing::warn!("[{}] {}", tag, message),
        _ => tracing::info!("[{}] {}", tag, message),
    }
}

pub fn logi(message: impl AsRef<str>) {
    logv("INFO", message.as_ref());
}

pub fn logok(message: impl AsRef<str>) {
    logv("OK", message.as_ref());
}

pub fn logw(message: impl AsRef<str>) {
    logv("WARN", message.as_ref());
}
