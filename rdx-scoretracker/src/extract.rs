//! Turns a bracket page into game records.
//!
//! The tracker only depends on the [`Extractor`] contract. [`BracketPageExtractor`]
//! is the recipe for the published bracket layout:
//!
//! ```html
//! <section class="region" data-region="MIDWEST">
//!   <div class="game" data-game-id="330810150" data-status="final">
//!     <time datetime="2013-03-22T12:15:00-04:00">12:15 PM ET</time>
//!     <div class="team visitor"><span class="seed">15</span><a title="Albany">Albany</a></div>
//!     <div class="team home winner"><span class="seed">2</span><a title="Duke">Duke</a></div>
//!   </div>
//! </section>
//! ```

use crate::common::{GameId, GameStatus, RawGame, Side};
use chrono::DateTime;
use chrono_tz::Tz;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Reads the games out of one document snapshot, in page order.
///
/// Implementations never fail: a page they cannot make sense of yields no games.
pub trait Extractor: Send + Sync {
    fn extract(&self, document: &str) -> Vec<RawGame>;
}

impl<F> Extractor for F
where
    F: Fn(&str) -> Vec<RawGame> + Send + Sync,
{
    fn extract(&self, document: &str) -> Vec<RawGame> {
        self(document)
    }
}

struct Selectors {
    game: Selector,
    team: Selector,
    seed: Selector,
    link: Selector,
    name: Selector,
    start: Selector,
}

impl Selectors {
    fn compile() -> Option<Self> {
        Some(Self {
            game: Selector::parse(".game").ok()?,
            team: Selector::parse(".team").ok()?,
            seed: Selector::parse(".seed").ok()?,
            link: Selector::parse("a").ok()?,
            name: Selector::parse(".name").ok()?,
            start: Selector::parse("time[datetime]").ok()?,
        })
    }
}

/// Extracts games from the bracket page layout shown in the module docs.
#[derive(Debug, Clone)]
pub struct BracketPageExtractor {
    timezone: Tz,
}

impl BracketPageExtractor {
    /// Scheduled starts are converted into `timezone`.
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    fn read_game(&self, node: ElementRef<'_>, selectors: &Selectors) -> Option<RawGame> {
        let Some(id) = node
            .value()
            .attr("data-game-id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
        else {
            warn!("Skipping game node without a data-game-id.");
            return None;
        };

        let teams: Vec<ElementRef<'_>> = node.select(&selectors.team).collect();
        let (visitor, home) = match pick_sides(&teams) {
            Some(sides) => sides,
            None => {
                warn!(game_id = id, teams = teams.len(), "Skipping game without two teams.");
                return None;
            }
        };
        let home = read_side(home, selectors, id)?;
        let visitor = read_side(visitor, selectors, id)?;

        let status = node
            .value()
            .attr("data-status")
            .and_then(parse_status)
            .unwrap_or(if home.is_winner || visitor.is_winner {
                GameStatus::Final
            } else {
                GameStatus::NotStarted
            });

        let scheduled_start = node
            .select(&selectors.start)
            .next()
            .and_then(|el| el.value().attr("datetime"))
            .and_then(|raw| match DateTime::parse_from_rfc3339(raw.trim()) {
                Ok(start) => Some(start.with_timezone(&self.timezone)),
                Err(e) => {
                    warn!(game_id = id, "Ignoring unreadable start time {:?}: {}", raw, e);
                    None
                }
            });

        Some(RawGame {
            id: GameId::from(id),
            region: region_of(node),
            home,
            visitor,
            status,
            scheduled_start,
        })
    }
}

impl Extractor for BracketPageExtractor {
    fn extract(&self, document: &str) -> Vec<RawGame> {
        let Some(selectors) = Selectors::compile() else {
            warn!("Bracket selectors failed to compile; no games extracted.");
            return Vec::new();
        };

        let html = Html::parse_document(document);
        let mut ids = HashSet::new();
        let games: Vec<RawGame> = html
            .select(&selectors.game)
            .filter_map(|node| self.read_game(node, &selectors))
            .filter(|game| ids.insert(game.id.clone()))
            .collect();

        debug!("Extracted {} games from the bracket page.", games.len());
        games
    }
}

fn has_class(el: &ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

/// Returns `(visitor, home)`. Explicit `.home` / `.visitor` markers win;
/// otherwise the page lists the visitor first.
fn pick_sides<'a>(teams: &[ElementRef<'a>]) -> Option<(ElementRef<'a>, ElementRef<'a>)> {
    let home = teams.iter().find(|t| has_class(t, "home"));
    let visitor = teams.iter().find(|t| has_class(t, "visitor"));
    match (visitor, home) {
        (Some(visitor), Some(home)) => Some((*visitor, *home)),
        _ if teams.len() == 2 => Some((teams[0], teams[1])),
        _ => None,
    }
}

fn read_side(team: ElementRef<'_>, selectors: &Selectors, game_id: &str) -> Option<Side> {
    let seed_text: String = team
        .select(&selectors.seed)
        .next()
        .map(|el| el.text().collect())
        .unwrap_or_default();
    let seed = match seed_text.trim().parse::<u32>() {
        Ok(seed) if seed > 0 => seed,
        _ => {
            warn!(game_id, "Skipping game with unreadable seed {:?}.", seed_text.trim());
            return None;
        }
    };

    let mut name_variants: Vec<String> = Vec::new();
    let mut push = |variant: &str| {
        let variant = variant.split_whitespace().collect::<Vec<_>>().join(" ");
        if !variant.is_empty() && !name_variants.contains(&variant) {
            name_variants.push(variant);
        }
    };
    if let Some(link) = team.select(&selectors.link).next() {
        push(&link.text().collect::<String>());
        if let Some(title) = link.value().attr("title") {
            push(title);
        }
    }
    for name in team.select(&selectors.name) {
        push(&name.text().collect::<String>());
    }

    if name_variants.is_empty() {
        warn!(game_id, "Skipping game with an unnamed team.");
        return None;
    }

    Some(Side {
        name_variants,
        seed,
        is_winner: has_class(&team, "winner"),
    })
}

fn parse_status(raw: &str) -> Option<GameStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "final" | "post" | "complete" => Some(GameStatus::Final),
        "in-progress" | "in" | "live" => Some(GameStatus::InProgress),
        "scheduled" | "pre" => Some(GameStatus::NotStarted),
        _ => None,
    }
}

/// A game's own `data-region` wins over the enclosing `.region` container.
fn region_of(game: ElementRef<'_>) -> String {
    game.value()
        .attr("data-region")
        .or_else(|| {
            game.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| has_class(el, "region"))
                .and_then(|el| el.value().attr("data-region"))
        })
        .map(|region| region.trim().to_string())
        .unwrap_or_default()
}
