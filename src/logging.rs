//! `tracing` subscriber setup.
//!
//! Headless modes log to stderr. The TUI owns the terminal, so it logs to a
//! file instead, or nowhere when no file location can be found.

use crate::cli::Cli;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Stderr,
    File(PathBuf),
    Off,
}

pub fn default_log_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("graphcare-cli").join("graphcare-cli.log")
}

pub fn resolve_sink(log_file: Option<&Path>, headless: bool, cache_dir: Option<&Path>) -> LogSink {
    match (log_file, headless, cache_dir) {
        (Some(p), _, _) => LogSink::File(p.to_path_buf()),
        (None, true, _) => LogSink::Stderr,
        (None, false, Some(dir)) => LogSink::File(default_log_path(dir)),
        (None, false, None) => LogSink::Off,
    }
}

pub fn init(args: &Cli) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .with_context(|| format!("invalid log filter {:?}", args.log_level))?;

    let cache_dir = dirs::cache_dir();
    match resolve_sink(args.log_file.as_deref(), args.is_headless(), cache_dir.as_deref()) {
        LogSink::Stderr => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("install log subscriber")?,
        LogSink::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create log directory {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
                .context("install log subscriber")?;
        }
        LogSink::Off => {}
    }
    Ok(())
}
