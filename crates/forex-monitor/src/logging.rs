//! Logging setup.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

/// Logging initialisation errors.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to create log directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid log file path: {0}")]
    InvalidPath(String),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Subscriber options.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Default directive when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
    /// Daily-rolling log file; the date is appended to the file name
    pub file: Option<PathBuf>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Split `logs/forex.log` into the directory and file prefix for the appender.
fn file_target(path: &Path) -> Result<(PathBuf, String), LoggingError> {
    let prefix = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LoggingError::InvalidPath(path.display().to_string()))?
        .to_string();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((dir, prefix))
}

/// Setup logging with the given options.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
pub fn setup_logging(options: &LogOptions) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&options.level));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(if options.json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().pretty().boxed()
    });

    let mut guard = None;
    if let Some(path) = &options.file {
        let (dir, prefix) = file_target(path)?;
        std::fs::create_dir_all(&dir)?;
        let appender = tracing_appender::rolling::daily(dir, prefix);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_target() {
        let (dir, prefix) = file_target(Path::new("logs/forex.log")).unwrap();
        assert_eq!(dir, PathBuf::from("logs"));
        assert_eq!(prefix, "forex.log");

        let (dir, prefix) = file_target(Path::new("forex.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(prefix, "forex.log");

        assert!(file_target(Path::new("/")).is_err());
    }
}
