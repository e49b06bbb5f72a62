use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::utils::ensure_newline;

/// Environment variable naming the operator log file
pub const LOG_ENV: &str = "WEMOD_LOG";

/// Where operator log lines end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    File(PathBuf),
    Null,
}

/// Appends plain text lines to the operator log.
///
/// The sink is chosen once at startup. With [`LogSink::Null`] every call is a no-op.
#[derive(Debug, Clone)]
pub struct Logger {
    sink: LogSink,
}

impl Default for Logger {
    fn default() -> Self {
        Self::null()
    }
}

impl Logger {
    pub fn new(sink: LogSink) -> Self {
        Self { sink }
    }

    pub fn null() -> Self {
        Self::new(LogSink::Null)
    }

    pub fn from_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => Self::new(LogSink::File(path)),
            None => Self::null(),
        }
    }

    pub fn from_env() -> Self {
        Self::from_path(std::env::var_os(LOG_ENV).map(PathBuf::from))
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    pub fn log(&self, message: impl Display) {
        let path = match &self.sink {
            LogSink::File(path) => path,
            LogSink::Null => return,
        };

        let line = ensure_newline(&message.to_string());
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(line.as_bytes()));

        if let Err(e) = written {
            tracing::warn!("failed to write log line to {}: {}", path.display(), e);
        }
    }
}
