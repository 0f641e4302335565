//! Contains the building blocks of a parse cycle.
//!
//! This module provides the state store that remembers previous cycles, the
//! differ that picks which games to announce, and the scheduler that decides
//! when the next cycle should run. The `ScoreTracker` owns one of each and
//! drives them in that order.

pub mod differ;
pub mod scheduler;
pub mod store;
