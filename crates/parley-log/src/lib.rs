// ABOUTME: Shared logging setup for parley binaries
// ABOUTME: init() logs to stderr; init_file() keeps interactive output clean

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Standard logging to stderr. Default: INFO level, RUST_LOG override.
/// Used for one-shot commands where stderr is free.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

/// File-based logging for the interactive chat mode, where stderr carries the
/// live status line. Logs to ~/.config/parley/parley.log. Default: INFO
/// level, RUST_LOG override. If setup fails, prints a warning to stderr and
/// continues without logging.
pub fn init_file() {
    if let Err(e) = init_file_inner() {
        eprintln!("Warning: failed to set up file logging: {e}");
    }
}

/// Path the file logger writes to, when a config directory exists.
pub fn log_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("parley").join("parley.log"))
}

fn init_file_inner() -> Result<(), Box<dyn std::error::Error>> {
    let path = log_path().ok_or("could not determine config directory")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_ansi(false)
        .init();

    Ok(())
}
