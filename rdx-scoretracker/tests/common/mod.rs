//! Shared helpers: bracket pages built in code and a scripted document source.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone};
use chrono_tz::Tz;
use scoretracker::prelude::*;
use std::collections::VecDeque;
use std::sync::Mutex;

pub const NEW_YORK: Tz = Tz::America__New_York;
pub const INTERVAL: u32 = 15;
pub const MAX_INTERVAL: u32 = 60;
pub const DAILY_CUTOFF: u32 = 180;

pub fn config() -> TrackerConfig {
    TrackerConfig::new(NEW_YORK, INTERVAL, MAX_INTERVAL, DAILY_CUTOFF)
}

/// A clock frozen at `hour:minute` New York time on `date`.
pub fn clock_at(date: (i32, u32, u32), hour: u32, minute: u32) -> FixedClock {
    let local = NaiveDate::from_ymd_opt(date.0, date.1, date.2)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap();
    FixedClock::at_local(NEW_YORK, local).unwrap()
}

pub fn local(date: (i32, u32, u32), hour: u32, minute: u32) -> chrono::DateTime<Tz> {
    NEW_YORK
        .with_ymd_and_hms(date.0, date.1, date.2, hour, minute, 0)
        .unwrap()
}

pub fn tracker_at(config: TrackerConfig, clock: FixedClock) -> ScoreTracker {
    ScoreTracker::new(config).unwrap().with_clock(clock)
}

// --- Bracket page builder ---

pub struct Team {
    text: String,
    title: Option<String>,
    seed: u32,
    winner: bool,
}

pub fn team(name: &str, seed: u32) -> Team {
    Team {
        text: name.to_string(),
        title: Some(name.to_string()),
        seed,
        winner: false,
    }
}

impl Team {
    pub fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn winner(mut self) -> Self {
        self.winner = true;
        self
    }

    fn html(&self, side: &str) -> String {
        let title = self
            .title
            .as_deref()
            .map(|t| format!(" title=\"{t}\""))
            .unwrap_or_default();
        let winner = if self.winner { " winner" } else { "" };
        format!(
            "<div class=\"team {side}{winner}\"><span class=\"seed\">{}</span><a href=\"#\"{title}>{}</a></div>",
            self.seed, self.text
        )
    }
}

pub struct Game {
    id: String,
    status: &'static str,
    start: Option<chrono::DateTime<Tz>>,
    visitor: Team,
    home: Team,
}

pub fn game(id: &str, status: &'static str, visitor: Team, home: Team) -> Game {
    Game {
        id: id.to_string(),
        status,
        start: None,
        visitor,
        home,
    }
}

impl Game {
    pub fn starting(mut self, start: chrono::DateTime<Tz>) -> Self {
        self.start = Some(start);
        self
    }

    fn html(&self) -> String {
        let start = self
            .start
            .map(|s| format!("<time datetime=\"{}\">{}</time>", s.to_rfc3339(), s.format("%-I:%M %p")))
            .unwrap_or_default();
        format!(
            "<div class=\"game\" data-game-id=\"{}\" data-status=\"{}\">{start}{}{}</div>",
            self.id,
            self.status,
            self.visitor.html("visitor"),
            self.home.html("home")
        )
    }
}

pub fn page(regions: Vec<(&str, Vec<Game>)>) -> String {
    let mut html = String::from("<!DOCTYPE html><html><head><title>Bracket</title></head><body><div id=\"bracket\">");
    for (region, games) in regions {
        html.push_str(&format!("<section class=\"region\" data-region=\"{region}\"><h3>{region}</h3>"));
        for game in games {
            html.push_str(&game.html());
        }
        html.push_str("</section>");
    }
    html.push_str("</div></body></html>");
    html
}

// --- Scenario pages ---

/// Sixteen finished first-round games across the four regions.
pub fn round_one_complete() -> String {
    let regions = ["SOUTH", "WEST", "EAST", "MIDWEST"];
    page(
        regions
            .iter()
            .enumerate()
            .map(|(r, region)| {
                let games = (0..4)
                    .map(|g| {
                        let id = format!("33081{r}{g}00");
                        let seed = g as u32 + 1;
                        game(
                            &id,
                            "final",
                            team(&format!("{region} Underdog {g}"), 17 - seed),
                            team(&format!("{region} Favorite {g}"), seed).winner(),
                        )
                    })
                    .collect::<Vec<_>>();
                (*region, games)
            })
            .map(|(region, mut games)| {
                if region == "MIDWEST" {
                    games[1] = game(
                        "330810150",
                        "final",
                        team("Albany", 15),
                        team("Duke", 2).winner(),
                    );
                }
                (region, games)
            })
            .collect(),
    )
}

/// Eight finished second-round games.
pub fn round_two_complete() -> String {
    page(vec![
        (
            "WEST",
            vec![
                game("330822250", "final", team("Wichita State", 9).winner(), team("Gonzaga", 1)),
                game("330822251", "final", team("Wisconsin", 4), team("Ole Miss", 12).winner()),
            ],
        ),
        (
            "SOUTH",
            vec![
                game("330822252", "final", team("Florida Gulf Coast", 15).winner(), team("San Diego State", 7)),
                game("330822253", "final", team("Michigan", 4).winner(), team("VCU", 5)),
            ],
        ),
        (
            "EAST",
            vec![
                game("330822254", "final", team("Marquette", 3).winner(), team("Butler", 6)),
                game("330822255", "final", team("Miami", 2).winner(), team("Illinois", 7)),
            ],
        ),
        (
            "MIDWEST",
            vec![
                game("330822256", "final", team("Louisville", 1).winner(), team("Colorado State", 8)),
                game("330822257", "final", team("Duke", 2).winner(), team("Creighton", 7)),
            ],
        ),
    ])
}

/// A second-round day with games still being played.
pub fn in_progress() -> String {
    page(vec![
        (
            "WEST",
            vec![
                game("400546970", "final", team("Arizona", 1).winner(), team("Gonzaga", 8)),
                game("400546971", "in-progress", team("Baylor", 6), team("Creighton", 3)),
            ],
        ),
        (
            "SOUTH",
            vec![game("400546972", "scheduled", team("Stanford", 10), team("Kansas", 2))],
        ),
    ])
}

/// A slate that has not tipped off, with the first game at 19:00 on `date`.
pub fn no_started_games(date: (i32, u32, u32)) -> String {
    page(vec![(
        "EAST",
        vec![
            game("400546980", "scheduled", team("Virginia Tech", 6), team("Wisconsin", 2))
                .starting(local(date, 21, 30)),
            game("400546981", "scheduled", team("Memphis", 8), team("Virginia", 1))
                .starting(local(date, 19, 0)),
        ],
    )])
}

/// The first round of 2014 starting at 12:15 on `date`.
pub fn first_round_start(date: (i32, u32, u32)) -> String {
    page(vec![(
        "MIDWEST",
        vec![
            game("400546990", "scheduled", team("Kentucky", 8), team("Kansas State", 9))
                .starting(local(date, 21, 40)),
            game("400546991", "scheduled", team("Ohio State", 6), team("Dayton", 11))
                .starting(local(date, 12, 15)),
            game("400546992", "scheduled", team("Wichita State", 1), team("Cal Poly", 16))
                .starting(local(date, 19, 10)),
        ],
    )])
}

pub fn no_games() -> String {
    "<!DOCTYPE html><html><body><div id=\"bracket\"><p>No games scheduled.</p></div></body></html>"
        .to_string()
}

pub fn play_in_complete() -> String {
    page(vec![
        (
            "SOUTH",
            vec![game("400785391", "final", team("Robert Morris", 16).winner(), team("North Florida", 16))],
        ),
        (
            "EAST",
            vec![game("400785392", "final", team("Dayton", 11).winner(), team("Boise State", 11))],
        ),
    ])
}

pub fn final_four() -> String {
    page(vec![(
        "FINAL FOUR",
        vec![game(
            "400785557",
            "final",
            team("Michigan St", 7).titled("Michigan State"),
            team("Duke", 1).winner(),
        )],
    )])
}

// --- Document sources ---

/// Serves a fixed script of fetch results; the last entry repeats forever.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<String, String>>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<String, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }

    pub fn repeating(document: String) -> Self {
        Self::new(vec![Ok(document)])
    }
}

#[async_trait]
impl DocumentSource for ScriptedSource {
    async fn fetch(&self) -> Result<String> {
        let mut script = self.script.lock().unwrap();
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        match next {
            Some(Ok(document)) => Ok(document),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(String::new()),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}
