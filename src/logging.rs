use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};

use crate::config::Config;

/// Install the global subscriber. The terminal belongs to the UI, so events
/// go to the configured file, or nowhere.
pub fn init(config: &Config) -> Result<()> {
    let Some(path) = &config.log_path else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_max_level(config.log_level)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {}", e))?;
    tracing::info!(path = %path.display(), level = %config.log_level, "logging started");
    Ok(())
}
