//! Defines all configuration structures for the score tracker.
//!
//! These structs are designed to be deserialized from a configuration file
//! (e.g., a TOML file) using `serde`, layered under `SCOREWATCH__*` environment
//! variables. This allows the tracker's polling cadence, time zone, and data
//! source to be defined externally from the application code.

use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Minutes in one day; `daily_cutoff` must stay strictly below this.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

const MS_PER_MINUTE: u64 = 60_000;

/// The tracker's polling and scheduling settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// The timezone used for every cutoff and "tomorrow" calculation.
    /// Uses the string names from the IANA Time Zone Database
    /// (e.g., "America/New_York").
    #[serde(default = "default_timezone")]
    pub timezone: Tz,

    /// Base polling interval while games are in progress, in minutes.
    #[serde(default = "default_interval")]
    pub interval: u32,

    /// Ceiling for the backoff, in minutes.
    #[serde(default = "default_max_interval")]
    pub max_interval: u32,

    /// Minutes after local midnight at which the next tournament day is polled.
    #[serde(default = "default_daily_cutoff")]
    pub daily_cutoff: u32,

    /// Withhold game notifications on the tracker's very first cycle.
    #[serde(default)]
    pub ignore_initial: bool,

    /// Freeze "now" at this instant instead of reading the wall clock.
    #[serde(default)]
    pub fixed_now: Option<DateTime<Utc>>,
}

impl TrackerConfig {
    pub fn new(timezone: Tz, interval: u32, max_interval: u32, daily_cutoff: u32) -> Self {
        Self {
            timezone,
            interval,
            max_interval,
            daily_cutoff,
            ignore_initial: false,
            fixed_now: None,
        }
    }

    pub fn with_ignore_initial(mut self, ignore_initial: bool) -> Self {
        self.ignore_initial = ignore_initial;
        self
    }

    pub fn with_fixed_now(mut self, now: DateTime<Utc>) -> Self {
        self.fixed_now = Some(now);
        self
    }

    /// Checks the invariants the scheduler relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.max_interval < self.interval {
            return Err(ConfigError::MaxBelowInterval {
                interval: self.interval,
                max_interval: self.max_interval,
            });
        }
        if self.daily_cutoff >= MINUTES_PER_DAY {
            return Err(ConfigError::CutoffOutOfRange(self.daily_cutoff));
        }
        Ok(())
    }

    pub fn interval_ms(&self) -> u64 {
        u64::from(self.interval) * MS_PER_MINUTE
    }

    pub fn max_interval_ms(&self) -> u64 {
        u64::from(self.max_interval) * MS_PER_MINUTE
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new(
            default_timezone(),
            default_interval(),
            default_max_interval(),
            default_daily_cutoff(),
        )
    }
}

/// Where the unattended watcher fetches the bracket page from.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The top-level configuration for the `scorewatch` binary.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub tracker: TrackerConfig,
    pub source: SourceConfig,
}

impl WatchConfig {
    /// Loads the optional TOML file at `path`, then applies `SCOREWATCH__*`
    /// environment overrides (e.g. `SCOREWATCH__TRACKER__INTERVAL=10`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("SCOREWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let watch: WatchConfig = settings.try_deserialize()?;
        watch.tracker.validate()?;
        Ok(watch)
    }
}

// --- Default value functions for serde ---

fn default_timezone() -> Tz {
    Tz::America__New_York
}

fn default_interval() -> u32 {
    15
}

fn default_max_interval() -> u32 {
    60
}

fn default_daily_cutoff() -> u32 {
    180
}

fn default_user_agent() -> String {
    concat!("scorewatch/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout_secs() -> u64 {
    30
}
