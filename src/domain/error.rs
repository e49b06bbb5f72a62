use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Download did not produce '{0}'")]
    MissingDownload(PathBuf),

    #[error("{0}")]
    Aborted(String),

    #[error("Popup closed by user")]
    Cancelled,

    #[error("Popup host is no longer running")]
    HostClosed,

    #[error("GUI error: {0}")]
    Gui(String),

    #[error("Workflow thread panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, AppError>;
