//! Dual-sink tracing setup.
//!
//! A durable file sink (no ANSI colours) and a live console sink, each with
//! its own minimum severity. The console sink writes to stderr unless
//! configured otherwise, so `ask` and `tools` output on stdout stays clean.
//! `RUST_LOG` overrides the console filter when set.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::{ConsoleStream, LogConfig};
use crate::error::LoggingError;

/// Install the global subscriber. Call once, early in `main`.
pub fn init(config: &LogConfig) -> Result<(), LoggingError> {
    let file_level = parse_level(&config.file_level)?;
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.console_level))
        .map_err(|_| LoggingError::InvalidLevel(config.console_level.clone()))?;

    let file = open_log_file(&config.file)?;

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(file_level);

    let console_layer = fmt::layer()
        .with_writer(console_writer(config.console_stream))
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

/// Parse a severity name ("trace", "debug", "info", "warn", "error", "off").
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| LoggingError::InvalidLevel(level.to_string()))
}

fn console_writer(stream: ConsoleStream) -> BoxMakeWriter {
    match stream {
        ConsoleStream::Stdout => BoxMakeWriter::new(std::io::stdout),
        ConsoleStream::Stderr => BoxMakeWriter::new(std::io::stderr),
    }
}

fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::OpenFile {
            path: path.display().to_string(),
            source,
        })
}
