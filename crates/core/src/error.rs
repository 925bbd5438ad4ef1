use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("chapter probe failed for {input}: {reason}")]
    ProbeFailed { input: PathBuf, reason: String },

    #[error("could not create output directory {dir}: {reason}")]
    OutputDirFailed { dir: PathBuf, reason: String },

    #[error("failed to split chapter \"{title}\": {reason}")]
    ChapterFailed { title: String, reason: String },

    #[error("download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("{tool} is not usable: {reason}")]
    ToolchainFailed { tool: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, SplitError>;
