//! Contains common, primitive types and a prelude for easy importing.
//!
//! This module defines the game records produced by an extractor and consumed by
//! the tracker, plus the key type used to identify registered listeners. Using
//! distinct types improves type safety and code clarity.

use chrono::DateTime;
use chrono_tz::Tz;
use slotmap::new_key_type;
use std::fmt;

/// A prelude module for convenient importing of the most common tracker types.
///
/// # Example
/// ```
/// use scoretracker::common::prelude::*;
/// ```
pub mod prelude {
    pub use super::{GameId, GameStatus, ListenerId, RawGame, Side};
    pub use crate::config::TrackerConfig;
    pub use crate::engine::ScoreTracker;
}

new_key_type! {
    /// Uniquely and safely identifies a registered notification handler.
    ///
    /// This key is returned when a handler is added to the tracker. It is
    /// guaranteed to be unique and will not be reused, preventing stale ID bugs.
    pub struct ListenerId;
}

/// Stable identifier of a single game on the bracket page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameId(pub String);

impl GameId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Where a game stands according to the bracket page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    NotStarted,
    InProgress,
    Final,
}

/// One team's entry in a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Side {
    /// Every spelling the page uses for this team, in source order.
    /// Never empty; the first entry is the display name.
    pub name_variants: Vec<String>,
    pub seed: u32,
    pub is_winner: bool,
}

impl Side {
    pub fn new(name: impl Into<String>, seed: u32) -> Self {
        Self {
            name_variants: vec![name.into()],
            seed,
            is_winner: false,
        }
    }

    /// The canonical display name.
    pub fn name(&self) -> &str {
        self.name_variants
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn winner(mut self) -> Self {
        self.is_winner = true;
        self
    }
}

/// A single game as read off one snapshot of the bracket page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawGame {
    pub id: GameId,
    pub region: String,
    pub home: Side,
    pub visitor: Side,
    pub status: GameStatus,
    /// Scheduled tip-off, when the page publishes one.
    pub scheduled_start: Option<DateTime<Tz>>,
}

impl RawGame {
    /// The side marked as the winner, if any.
    pub fn winner(&self) -> Option<&Side> {
        if self.home.is_winner {
            Some(&self.home)
        } else if self.visitor.is_winner {
            Some(&self.visitor)
        } else {
            None
        }
    }
}

impl fmt::Display for RawGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] ({}) {} vs ({}) {} - {:?}",
            self.region,
            self.visitor.seed,
            self.visitor.name(),
            self.home.seed,
            self.home.name(),
            self.status
        )
    }
}
