//! Defines all public event types broadcast by the score tracker.
//!
//! Within one cycle every `Game` event is sent before the single `ScheduleSet`
//! event that closes the cycle.

use crate::common::RawGame;
use crate::components::scheduler::ScheduleReason;
use chrono::DateTime;
use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// A game that is new or changed since the previous cycle.
    Game(RawGame),
    /// Fired once at the end of every cycle with the delay until the next one.
    ScheduleSet {
        delay_ms: u64,
        wake_at: DateTime<Tz>,
        reason: ScheduleReason,
    },
    /// Fired when `stop()` cancels the pending wake-up.
    Stopped,
}

/// What a single cycle produced. Returned by `ScoreTracker::parse`.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Games that were announced this cycle, in page order.
    pub emitted: Vec<RawGame>,
    /// Games found on the page, announced or not.
    pub observed: usize,
    pub delay_ms: u64,
    pub wake_at: DateTime<Tz>,
    pub reason: ScheduleReason,
    /// Whether announcements were withheld this cycle.
    pub suppressed: bool,
}
