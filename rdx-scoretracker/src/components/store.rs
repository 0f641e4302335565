//! The tracker's memory between cycles.

use crate::common::{GameId, GameStatus, RawGame};
use std::collections::HashMap;

/// The parts of a game whose change is worth a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub status: GameStatus,
    pub home_winner: bool,
    pub visitor_winner: bool,
    pub home_seed: u32,
    pub visitor_seed: u32,
    pub home_name: String,
    pub visitor_name: String,
}

impl From<&RawGame> for GameSnapshot {
    fn from(game: &RawGame) -> Self {
        Self {
            status: game.status,
            home_winner: game.home.is_winner,
            visitor_winner: game.visitor.is_winner,
            home_seed: game.home.seed,
            visitor_seed: game.visitor.seed,
            home_name: game.home.name().to_string(),
            visitor_name: game.visitor.name().to_string(),
        }
    }
}

/// Consecutive in-progress cycles and the delay they last produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Backoff {
    pub level: u32,
    pub last_delay_ms: u64,
}

impl Backoff {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Everything a tracker remembers from one cycle to the next.
///
/// Owned by exactly one tracker and only mutated while a cycle runs.
#[derive(Debug, Default)]
pub struct TrackerState {
    seen_games: HashMap<GameId, GameSnapshot>,
    pub backoff: Backoff,
    pub current_interval: Option<u64>,
    pub has_emitted_baseline: bool,
    pub cycles: u64,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, id: &GameId) -> Option<&GameSnapshot> {
        self.seen_games.get(id)
    }

    /// Records the latest snapshot of `game`, returning the one it replaced.
    pub fn record(&mut self, game: &RawGame) -> Option<GameSnapshot> {
        self.seen_games
            .insert(game.id.clone(), GameSnapshot::from(game))
    }

    pub fn seen_count(&self) -> usize {
        self.seen_games.len()
    }

    /// Every game seen so far, ordered by id.
    pub fn snapshots(&self) -> Vec<(GameId, GameSnapshot)> {
        let mut seen: Vec<_> = self
            .seen_games
            .iter()
            .map(|(id, snapshot)| (id.clone(), snapshot.clone()))
            .collect();
        seen.sort_by(|a, b| a.0.cmp(&b.0));
        seen
    }
}
