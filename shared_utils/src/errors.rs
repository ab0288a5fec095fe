use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("FFprobe failed for {path}: {reason}")]
    ProbeFailed { path: PathBuf, reason: String },

    #[error("FFprobe output could not be parsed: {0}")]
    ProbeParse(String),

    #[error("Encoder failed (exit code: {exit_code:?}): {command}")]
    EncoderFailed {
        command: String,
        exit_code: Option<i32>,
    },

    #[error("Subtitle handling failed: {0}")]
    Subtitle(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TranscodeError>;
