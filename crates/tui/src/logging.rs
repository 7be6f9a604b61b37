use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// Where log lines go. The TUI owns the terminal, so it logs to a file.
#[derive(Debug, Clone)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

pub fn init_tracing(filter: Option<&str>, target: LogTarget) -> Result<()> {
    let env_filter = build_filter(filter)?;

    match target {
        LogTarget::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact()
                .try_init();
        }
        LogTarget::File(path) => {
            let file = open_log(&path)?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .compact()
                .try_init();
        }
    }
    Ok(())
}

fn build_filter(filter: Option<&str>) -> Result<EnvFilter> {
    let directive: Directive = filter
        .unwrap_or("info")
        .parse()
        .with_context(|| format!("invalid log filter '{}'", filter.unwrap_or_default()))?;
    Ok(EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy())
}

fn open_log(path: &PathBuf) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}
