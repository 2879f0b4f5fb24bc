//! Tracing subscriber setup.

use std::fs::File;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Install the global subscriber.
///
/// Filter comes from `RUST_LOG`, defaulting to `info`. With `log_file` the
/// file is truncated and receives plain (non-ANSI) lines; otherwise logs go
/// to stderr so stdout stays free for the run summary.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            Registry::default()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .context("failed to install tracing subscriber")?;
        }
        None => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr);
            Registry::default()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .context("failed to install tracing subscriber")?;
        }
    }

    Ok(())
}
