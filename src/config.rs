use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::Level;

pub const DEFAULT_TICK_MS: u64 = 16;
const MIN_TICK_MS: u64 = 5;
const MAX_TICK_MS: u64 = 100;

/// Runtime settings, read from `CALCADE_*` environment variables.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Log file; `None` keeps logging off.
    pub log_path: Option<PathBuf>,
    pub log_level: Level,
    pub tick_rate: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: Level::INFO,
            tick_rate: Duration::from_millis(DEFAULT_TICK_MS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Invalid values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let log_path = lookup("CALCADE_LOG")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let log_level = lookup("CALCADE_LOG_LEVEL")
            .and_then(|v| Level::from_str(v.trim()).ok())
            .unwrap_or(defaults.log_level);
        let tick_rate = lookup("CALCADE_TICK_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|ms| Duration::from_millis(ms.clamp(MIN_TICK_MS, MAX_TICK_MS)))
            .unwrap_or(defaults.tick_rate);
        Self {
            log_path,
            log_level,
            tick_rate,
        }
    }
}
