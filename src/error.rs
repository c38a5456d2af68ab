use std::path::PathBuf;

/// Failures that can come out of a fetch, a download or the startup checks.
///
/// Every variant is caught at the worker boundary and turned into a dialog
/// plus a status line; none of them ends the process.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Failed to fetch formats: {0}")]
    ExtractionFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Audio conversion failed: {0}")]
    ConversionFailed(String),

    #[error("FFmpeg could not be found")]
    TranscoderNotFound,

    #[error("{0} is not installed or not on PATH")]
    ToolNotFound(&'static str),

    #[error("A task is already running")]
    Busy,

    #[error("Failed to write {path}: {source}")]
    SettingsWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
