use anyhow::Result;
use colored::Colorize;
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use scoretracker::prelude::*;
use scoretracker::source::FileSource;
use scoretracker::{TRACKER_NAME, VERSION as LIB_VERSION};
use std::borrow::Cow;
use std::env;
use std::path::Path;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Colors the command word and its file argument as the line is typed.
#[derive(Completer, Helper, Hinter, Validator)]
struct CommandHighlighter;

impl Highlighter for CommandHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        match line.split_once(' ') {
            Some((command, argument)) => {
                Cow::Owned(format!("{} {}", command.yellow().bold(), argument.underline()))
            }
            None => Cow::Owned(line.yellow().bold().to_string()),
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    println!("{}", "scoreshell :: bracket score tracker".cyan().bold());

    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!("{}", "-----------------------------------------------------------------".dimmed());
    println!("{}", version_string);
    println!(
        "{}",
        "    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.".dimmed()
    );
    println!("{}", "-----------------------------------------------------------------".dimmed());
}

/// Spawns a task that prints every event the tracker announces.
fn spawn_event_listener(tracker: &ScoreTracker) {
    let mut events = tracker.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                TrackerEvent::Game(game) => {
                    let line = match game.winner() {
                        Some(winner) => format!("{} => {}", game, winner.name().green().bold()),
                        None => game.to_string(),
                    };
                    println!("<-- [GAME] {}", line);
                }
                TrackerEvent::ScheduleSet { delay_ms, wake_at, reason } => println!(
                    "<-- [SCHEDULE] {} => next parse in {} at {}",
                    reason,
                    format_delay(delay_ms).cyan(),
                    wake_at.format("%a %F %R %Z")
                ),
                TrackerEvent::Stopped => println!("<-- [SYSTEM] tracker stopped"),
            }
        }
    });
}

fn format_delay(delay_ms: u64) -> String {
    let seconds = delay_ms / 1000;
    format!("{}h{:02}m{:02}s", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}

async fn feed(tracker: &ScoreTracker, path: &str, baseline: bool) {
    let document = match tokio::fs::read_to_string(Path::new(path)).await {
        Ok(document) => document,
        Err(e) => {
            println!("Error: could not read '{}': {}", path, e);
            return;
        }
    };
    let result = if baseline {
        tracker.parse_baseline(&document)
    } else {
        tracker.parse(&document)
    };
    match result {
        Ok(report) => println!(
            "--> {} games on the page, {} announced{}.",
            report.observed,
            report.emitted.len(),
            if report.suppressed { " (baseline)" } else { "" }
        ),
        Err(e) => println!("Error: {}", e),
    }
}

fn print_status(tracker: &ScoreTracker) {
    match tracker.status() {
        Ok(status) => {
            println!("Cycles:           {}", status.cycles);
            println!("Games seen:       {}", status.seen.len());
            println!("Backoff level:    {}", status.backoff_level);
            match status.current_interval {
                Some(ms) => println!("Current interval: {} ({} ms)", format_delay(ms), ms),
                None => println!("Current interval: -"),
            }
            println!("Watching:         {}", if status.running { "yes" } else { "no" });
            if let Some(wake_at) = status.next_wake_at {
                println!("Next wake-up:     {}", wake_at.format("%a %F %T %Z"));
            }
        }
        Err(e) => println!("Error: {}", e),
    }
}

fn print_games(tracker: &ScoreTracker) {
    match tracker.status() {
        Ok(status) if status.seen.is_empty() => println!("No games seen yet."),
        Ok(status) => {
            for (id, game) in status.seen {
                let visitor = if game.visitor_winner {
                    game.visitor_name.green().bold()
                } else {
                    game.visitor_name.normal()
                };
                let home = if game.home_winner {
                    game.home_name.green().bold()
                } else {
                    game.home_name.normal()
                };
                println!(
                    "  {:<12} ({}) {} vs ({}) {}  {:?}",
                    id, game.visitor_seed, visitor, game.home_seed, home, game.status
                );
            }
        }
        Err(e) => println!("Error: {}", e),
    }
}

fn tracker_config() -> Result<TrackerConfig> {
    let mut config = TrackerConfig::default();
    if let Ok(interval) = env::var("SCORESHELL_INTERVAL") {
        config.interval = interval.parse()?;
    }
    if let Ok(max_interval) = env::var("SCORESHELL_MAX_INTERVAL") {
        config.max_interval = max_interval.parse()?;
    }
    if let Ok(timezone) = env::var("SCORESHELL_TIMEZONE") {
        config.timezone = timezone.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let tracker = ScoreTracker::new(tracker_config()?)?;
    spawn_event_listener(&tracker);

    let mut watcher: Option<JoinHandle<()>> = None;

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CommandHighlighter));

    println!("{} is ready. Type 'help' for commands or 'exit' to quit.", TRACKER_NAME.cyan());

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        let readline = rl.readline(&prompt);
        match readline {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let args = line.split_whitespace().collect::<Vec<_>>();

                if let Some(command) = args.first() {
                    match *command {
                        "parse" | "baseline" => match args.get(1) {
                            Some(path) => feed(&tracker, path, *command == "baseline").await,
                            None => println!("Usage: {} <FILE>", command),
                        },
                        "watch" => {
                            if tracker.is_running() {
                                println!("Error: already watching. Use 'stop' first.");
                            } else if let Some(path) = args.get(1) {
                                let runner = tracker.clone();
                                let source = FileSource::new(*path);
                                info!("Watching {}", path);
                                watcher = Some(tokio::spawn(async move {
                                    if let Err(e) = runner.run(source).await {
                                        eprintln!("\nWatcher stopped with an error: {}", e);
                                    }
                                }));
                                println!("--> Watching '{}'. Use 'stop' to end.", path);
                            } else {
                                println!("Usage: watch <FILE>");
                            }
                        }
                        "stop" => {
                            tracker.stop();
                            if let Some(handle) = watcher.take() {
                                handle.await.ok();
                            }
                            println!("--> Stopped.");
                        }
                        "status" => print_status(&tracker),
                        "games" => print_games(&tracker),
                        "help" => {
                            println!("Available commands:");
                            println!("  parse <FILE>      - Runs one cycle over a saved bracket page.");
                            println!("  baseline <FILE>   - Runs one cycle without announcing games.");
                            println!("  watch <FILE>      - Re-reads the page on the tracker's own schedule.");
                            println!("  stop              - Cancels the pending wake-up.");
                            println!("  status            - Shows cycles, backoff and the next wake-up.");
                            println!("  games             - Lists every game seen so far.");
                            println!("  exit              - Quits the shell.");
                        }
                        "exit" => break,
                        _ => println!("Unknown command: '{}'. Type 'help'.", line),
                    }
                }
            }
            Err(_) => {
                println!("Exiting scoreshell...");
                break;
            }
        }
    }

    tracker.stop();
    Ok(())
}
