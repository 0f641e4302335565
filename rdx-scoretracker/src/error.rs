//! Error types surfaced by the tracker.

use thiserror::Error;

/// Rejected tracker configuration. A tracker is never built from a config
/// that fails validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("polling interval must be at least one minute")]
    ZeroInterval,

    #[error("max_interval ({max_interval} min) is shorter than interval ({interval} min)")]
    MaxBelowInterval { interval: u32, max_interval: u32 },

    #[error("daily_cutoff must be within [0, 1440) minutes past midnight, got {0}")]
    CutoffOutOfRange(u32),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A cycle was started while another one was still running, typically
    /// from inside a notification handler.
    #[error("a parse cycle is already in progress")]
    CycleInProgress,

    #[error("failed to fetch bracket document: {0:#}")]
    Fetch(anyhow::Error),
}

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;
