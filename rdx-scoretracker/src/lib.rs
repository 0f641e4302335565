//! # Scoretracker
//!
//! Follows a multi-day single-elimination tournament by repeatedly parsing the
//! published bracket page, announcing games as their results appear, and
//! deciding how long to wait before looking again.
//!
//! ## Core Concepts
//!
//! - **Cycle**: one pass of extract → diff → schedule. Each call to
//!   [`ScoreTracker::parse`](engine::ScoreTracker::parse) runs exactly one.
//! - **Adaptive polling**: while games are in progress the delay grows 1.5x per
//!   cycle up to a ceiling; before tip-off the tracker sleeps until the first
//!   scheduled game; once the day's slate is done it sleeps until the next
//!   daily cutoff in the configured time zone.
//! - **Notifications**: new or changed games are delivered to synchronous
//!   handlers and on a broadcast stream, always before the cycle's delay.
//! - **Injectable clock**: every "now" comes from a [`Clock`](time::Clock), so
//!   a [`FixedClock`](time::FixedClock) makes scheduling fully deterministic.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use scoretracker::prelude::*;
//! use scoretracker::source::HttpSource;
//! use scoretracker::config::SourceConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Create a tracker; invalid settings fail here.
//!     let tracker = ScoreTracker::new(TrackerConfig::default())?;
//!
//!     // 2. Register handlers before the first cycle.
//!     tracker.on_game(|game| println!("{game}"));
//!     tracker.on_schedule(|delay_ms| println!("next parse in {delay_ms} ms"));
//!
//!     // 3. Poll the bracket page until stop() is called.
//!     let source = HttpSource::new(&SourceConfig {
//!         url: "https://example.com/bracket".to_string(),
//!         user_agent: "scorewatch".to_string(),
//!         timeout_secs: 30,
//!     })?;
//!     tracker.run(source).await?;
//!
//!     Ok(())
//! }
//! ```

pub const TRACKER_NAME: &str = "Score Tracker";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");


// Declare all the modules in the crate.
pub mod common;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod extract;
pub mod source;
pub mod time;

/// A prelude module for easy importing of the most common tracker types.
pub mod prelude {
    pub use crate::common::{GameId, GameStatus, ListenerId, RawGame, Side};
    pub use crate::components::scheduler::ScheduleReason;
    pub use crate::config::TrackerConfig;
    pub use crate::engine::{ScoreTracker, TrackerStatus};
    pub use crate::error::{ConfigError, TrackerError};
    pub use crate::events::{CycleReport, TrackerEvent};
    pub use crate::extract::{BracketPageExtractor, Extractor};
    pub use crate::source::DocumentSource;
    pub use crate::time::{Clock, FixedClock, SystemClock};
}
