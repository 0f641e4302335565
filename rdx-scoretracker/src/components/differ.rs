//! Decides which games of a fresh snapshot deserve a notification.

use super::store::{GameSnapshot, TrackerState};
use crate::common::{GameId, RawGame};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Compares `games` against what `state` has seen and returns, in page order,
/// the games that are new or changed.
///
/// Every game is recorded in `state` whether or not it is returned, so the
/// next cycle diffs against the latest page. With `suppress` set nothing is
/// returned. A repeated id within one batch is ignored after its first
/// occurrence.
pub fn observe(state: &mut TrackerState, games: &[RawGame], suppress: bool) -> Vec<RawGame> {
    let mut this_cycle: HashSet<&GameId> = HashSet::with_capacity(games.len());
    let mut emitted = Vec::new();

    for game in games {
        if !this_cycle.insert(&game.id) {
            warn!(game_id = %game.id, "Duplicate game id in one snapshot; keeping the first.");
            continue;
        }

        let changed = match state.record(game) {
            None => true,
            Some(previous) => previous != GameSnapshot::from(game),
        };

        if changed && !suppress {
            debug!(game_id = %game.id, "{}", game);
            emitted.push(game.clone());
        }
    }

    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{GameStatus, Side};

    fn game(id: &str, status: GameStatus) -> RawGame {
        RawGame {
            id: GameId::from(id),
            region: "MIDWEST".to_string(),
            home: Side::new("Duke", 2),
            visitor: Side::new("Albany", 15),
            status,
            scheduled_start: None,
        }
    }

    fn ids(games: &[RawGame]) -> Vec<&str> {
        games.iter().map(|g| g.id.as_str()).collect()
    }

    #[test]
    fn new_games_are_emitted_in_page_order() {
        let mut state = TrackerState::new();
        let games = vec![game("b", GameStatus::Final), game("a", GameStatus::Final)];
        assert_eq!(ids(&observe(&mut state, &games, false)), vec!["b", "a"]);
    }

    #[test]
    fn unchanged_games_are_not_emitted_twice() {
        let mut state = TrackerState::new();
        let games = vec![game("a", GameStatus::Final), game("b", GameStatus::InProgress)];
        assert_eq!(observe(&mut state, &games, false).len(), 2);
        assert!(observe(&mut state, &games, false).is_empty());
    }

    #[test]
    fn status_and_winner_changes_are_emitted() {
        let mut state = TrackerState::new();
        observe(&mut state, &[game("a", GameStatus::InProgress)], false);

        let mut finished = game("a", GameStatus::Final);
        finished.home = finished.home.winner();
        let emitted = observe(&mut state, &[finished.clone()], false);
        assert_eq!(emitted, vec![finished]);
    }

    #[test]
    fn suppressed_cycles_still_record_state() {
        let mut state = TrackerState::new();
        let games = vec![game("a", GameStatus::Final)];
        assert!(observe(&mut state, &games, true).is_empty());
        assert_eq!(state.seen_count(), 1);
        assert!(observe(&mut state, &games, false).is_empty());
    }

    #[test]
    fn duplicate_ids_keep_the_first_occurrence() {
        let mut state = TrackerState::new();
        let games = vec![game("a", GameStatus::InProgress), game("a", GameStatus::Final)];
        let emitted = observe(&mut state, &games, false);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].status, GameStatus::InProgress);
        assert_eq!(
            state.snapshot(&GameId::from("a")).map(|s| s.status),
            Some(GameStatus::InProgress)
        );
    }
}
