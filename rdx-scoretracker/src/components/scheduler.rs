//! Computes how long to wait before the next parse cycle.
//!
//! The decision runs in priority order:
//! 1. no games on the page: sleep until the next daily cutoff;
//! 2. every game final: sleep until the next daily cutoff;
//! 3. any game in progress: back off from the base interval by 1.5x per
//!    consecutive cycle, pinned at the ceiling;
//! 4. otherwise wait for the earliest scheduled tip-off, or poll at the base
//!    interval when no future tip-off is known.

use super::store::Backoff;
use crate::common::{GameStatus, RawGame};
use crate::config::TrackerConfig;
use crate::time::{millis_until, next_cutoff};
use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use std::fmt;

/// Why a delay was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleReason {
    NoGames,
    SlateComplete,
    InProgress { backoff_level: u32 },
    AwaitingTipOff { earliest: DateTime<Tz> },
    /// A scheduled tip-off has passed but the page still shows no game underway.
    OverdueTipOff,
    NoStartTimes,
}

impl fmt::Display for ScheduleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoGames => f.write_str("no games"),
            Self::SlateComplete => f.write_str("all games final"),
            Self::InProgress { backoff_level } => {
                write!(f, "games in progress (backoff level {backoff_level})")
            }
            Self::AwaitingTipOff { earliest } => {
                write!(f, "waiting for tip-off at {}", earliest.format("%F %R %Z"))
            }
            Self::OverdueTipOff => f.write_str("tip-off overdue"),
            Self::NoStartTimes => f.write_str("no published start times"),
        }
    }
}

/// The outcome of one scheduling decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub delay_ms: u64,
    pub wake_at: DateTime<Tz>,
    pub reason: ScheduleReason,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    interval_ms: u64,
    max_interval_ms: u64,
    daily_cutoff: u32,
}

impl Scheduler {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            interval_ms: config.interval_ms(),
            max_interval_ms: config.max_interval_ms(),
            daily_cutoff: config.daily_cutoff,
        }
    }

    /// Picks the delay for the cycle that just observed `games` at `now`,
    /// advancing or resetting `backoff`.
    pub fn next_delay(&self, games: &[RawGame], now: &DateTime<Tz>, backoff: &mut Backoff) -> Schedule {
        let (delay_ms, reason) = if games.is_empty() {
            backoff.reset();
            (self.until_cutoff(now), ScheduleReason::NoGames)
        } else if games.iter().all(|g| g.status == GameStatus::Final) {
            backoff.reset();
            (self.until_cutoff(now), ScheduleReason::SlateComplete)
        } else if games.iter().any(|g| g.status == GameStatus::InProgress) {
            let delay_ms = self.back_off(backoff);
            (
                delay_ms,
                ScheduleReason::InProgress {
                    backoff_level: backoff.level,
                },
            )
        } else {
            backoff.reset();
            self.before_tip_off(games, now)
        };

        Schedule {
            delay_ms,
            wake_at: *now + Duration::milliseconds(delay_ms as i64),
            reason,
        }
    }

    fn until_cutoff(&self, now: &DateTime<Tz>) -> u64 {
        millis_until(now, &next_cutoff(now, self.daily_cutoff))
    }

    fn back_off(&self, backoff: &mut Backoff) -> u64 {
        let grown = if backoff.level == 0 {
            self.interval_ms
        } else {
            backoff.last_delay_ms.saturating_mul(3) / 2
        };
        let delay_ms = grown.min(self.max_interval_ms).max(1);
        backoff.level += 1;
        backoff.last_delay_ms = delay_ms;
        delay_ms
    }

    fn before_tip_off(&self, games: &[RawGame], now: &DateTime<Tz>) -> (u64, ScheduleReason) {
        let earliest = games
            .iter()
            .filter(|g| g.status == GameStatus::NotStarted)
            .filter_map(|g| g.scheduled_start)
            .min();

        match earliest {
            Some(earliest) if earliest > *now => (
                millis_until(now, &earliest),
                ScheduleReason::AwaitingTipOff { earliest },
            ),
            Some(_) => (self.interval_ms, ScheduleReason::OverdueTipOff),
            None => (self.interval_ms, ScheduleReason::NoStartTimes),
        }
    }
}
