//! The tracker that drives every parse cycle.

use crate::common::{GameId, ListenerId, RawGame};
use crate::components::differ;
use crate::components::scheduler::{Schedule, Scheduler};
use crate::components::store::{GameSnapshot, TrackerState};
use crate::config::TrackerConfig;
use crate::error::{ConfigError, Result, TrackerError};
use crate::events::{CycleReport, TrackerEvent};
use crate::extract::{BracketPageExtractor, Extractor};
use crate::source::DocumentSource;
use crate::time::{Clock, FixedClock, SystemClock};
use chrono::DateTime;
use chrono_tz::Tz;
use slotmap::SlotMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

type GameHandler = Arc<dyn Fn(&RawGame) + Send + Sync>;
type ScheduleHandler = Arc<dyn Fn(u64) + Send + Sync>;

enum Listener {
    Game(GameHandler),
    Schedule(ScheduleHandler),
}

/// A point-in-time view of a tracker, for display.
#[derive(Debug, Clone)]
pub struct TrackerStatus {
    pub cycles: u64,
    pub backoff_level: u32,
    pub current_interval: Option<u64>,
    pub running: bool,
    pub next_wake_at: Option<DateTime<Tz>>,
    pub seen: Vec<(GameId, GameSnapshot)>,
}

/// The bracket score tracker.
///
/// Each call to [`parse`](Self::parse) runs one complete cycle: extract the
/// games from the document, announce the new or changed ones, then compute and
/// announce the delay until the next cycle. Cycles never overlap. The tracker is
/// a cheap handle and can be cloned into notification handlers or tasks.
#[derive(Clone)]
pub struct ScoreTracker {
    config: Arc<TrackerConfig>,
    scheduler: Arc<Scheduler>,
    clock: Arc<dyn Clock>,
    extractor: Arc<dyn Extractor>,

    state: Arc<Mutex<TrackerState>>,
    current_interval: Arc<AtomicU64>,

    event_sender: broadcast::Sender<TrackerEvent>,
    listeners: Arc<Mutex<SlotMap<ListenerId, Listener>>>,

    // --- Unattended mode ---
    running: Arc<AtomicBool>,
    shutdown_sender: broadcast::Sender<()>,
    next_wake: Arc<Mutex<Option<DateTime<Tz>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScoreTracker {
    /// Creates a tracker from a validated configuration.
    ///
    /// Uses the wall clock unless `config.fixed_now` is set, and the bracket
    /// page extractor for the configured time zone.
    pub fn new(config: TrackerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        const CHANNEL_CAPACITY: usize = 256;
        let (event_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (shutdown_sender, _) = broadcast::channel(1);

        let clock: Arc<dyn Clock> = match config.fixed_now {
            Some(now) => Arc::new(FixedClock::new(now)),
            None => Arc::new(SystemClock),
        };

        Ok(Self {
            scheduler: Arc::new(Scheduler::new(&config)),
            extractor: Arc::new(BracketPageExtractor::new(config.timezone)),
            config: Arc::new(config),
            clock,
            state: Arc::new(Mutex::new(TrackerState::new())),
            current_interval: Arc::new(AtomicU64::new(0)),
            event_sender,
            listeners: Arc::new(Mutex::new(SlotMap::with_key())),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_sender,
            next_wake: Arc::new(Mutex::new(None)),
        })
    }

    /// Replaces the source of "now".
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replaces the document-to-games recipe.
    pub fn with_extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    // --- Parse cycles ---

    /// Runs one cycle over `document`, announcing new or changed games.
    ///
    /// On a tracker configured with `ignore_initial`, the very first cycle
    /// records the games without announcing them.
    pub fn parse(&self, document: &str) -> Result<CycleReport> {
        self.observe_games(self.extractor.extract(document), false)
    }

    /// Runs one cycle over `document` that records every game as the baseline
    /// but announces none of them. The delay is still computed and announced.
    pub fn parse_baseline(&self, document: &str) -> Result<CycleReport> {
        self.observe_games(self.extractor.extract(document), true)
    }

    /// Runs one cycle over games that were already extracted.
    ///
    /// Returns [`TrackerError::CycleInProgress`] when called while another cycle
    /// is still running, e.g. from inside a notification handler.
    pub fn observe_games(&self, games: Vec<RawGame>, suppress: bool) -> Result<CycleReport> {
        let mut state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(TrackerError::CycleInProgress),
            Err(TryLockError::Poisoned(poisoned)) => {
                warn!("A notification handler panicked during the previous cycle.");
                poisoned.into_inner()
            }
        };

        let suppressed = suppress || (self.config.ignore_initial && !state.has_emitted_baseline);
        let emitted = differ::observe(&mut state, &games, suppressed);
        state.has_emitted_baseline = true;

        let now = self.clock.now_in(&self.config.timezone);
        let schedule = self.scheduler.next_delay(&games, &now, &mut state.backoff);
        state.current_interval = Some(schedule.delay_ms);
        state.cycles += 1;
        self.current_interval
            .store(schedule.delay_ms, Ordering::SeqCst);

        // The state lock stays held while handlers run so that a handler
        // cannot start a nested cycle.
        self.announce(&emitted, &schedule);

        info!(
            observed = games.len(),
            emitted = emitted.len(),
            delay_ms = schedule.delay_ms,
            "Cycle #{} complete: {}. Next parse at {}.",
            state.cycles,
            schedule.reason,
            schedule.wake_at.format("%F %T %Z")
        );

        Ok(CycleReport {
            emitted,
            observed: games.len(),
            delay_ms: schedule.delay_ms,
            wake_at: schedule.wake_at,
            reason: schedule.reason,
            suppressed,
        })
    }

    /// Delivers one cycle's notifications: every game first, then the delay.
    fn announce(&self, emitted: &[RawGame], schedule: &Schedule) {
        // Handlers are cloned out so they can register or remove listeners.
        let (game_handlers, schedule_handlers) = {
            let listeners = lock(&self.listeners);
            let mut games = Vec::new();
            let mut schedules = Vec::new();
            for listener in listeners.values() {
                match listener {
                    Listener::Game(handler) => games.push(handler.clone()),
                    Listener::Schedule(handler) => schedules.push(handler.clone()),
                }
            }
            (games, schedules)
        };

        for game in emitted {
            for handler in &game_handlers {
                handler(game);
            }
            self.event_sender.send(TrackerEvent::Game(game.clone())).ok();
        }

        for handler in &schedule_handlers {
            handler(schedule.delay_ms);
        }
        self.event_sender
            .send(TrackerEvent::ScheduleSet {
                delay_ms: schedule.delay_ms,
                wake_at: schedule.wake_at,
                reason: schedule.reason,
            })
            .ok();
    }

    // --- Unattended mode ---

    /// Polls `source` until [`stop`](Self::stop) is called, sleeping between
    /// cycles for whatever delay the previous cycle computed.
    ///
    /// A failed fetch is logged and retried after the base interval; it does
    /// not count as a cycle.
    pub async fn run(&self, source: impl DocumentSource) -> anyhow::Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            anyhow::bail!("tracker is already running");
        }
        let mut shutdown_rx = self.shutdown_sender.subscribe();
        info!("ScoreTracker watching {}", source.describe());

        loop {
            let delay_ms = match source.fetch().await {
                Ok(document) => match self.parse(&document) {
                    Ok(report) => report.delay_ms,
                    Err(e) => {
                        warn!("Skipping cycle: {}", e);
                        self.config.interval_ms()
                    }
                },
                Err(e) => {
                    warn!(
                        "{:#}. Retrying in {} ms.",
                        TrackerError::Fetch(e),
                        self.config.interval_ms()
                    );
                    self.config.interval_ms()
                }
            };

            // A handler may have called stop() during the cycle.
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let wake_at = self.clock.now_in(&self.config.timezone)
                + chrono::Duration::milliseconds(delay_ms as i64);
            *lock(&self.next_wake) = Some(wake_at);
            debug!("Sleeping {} ms until {}", delay_ms, wake_at);

            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
            }
            lock(&self.next_wake).take();
        }

        self.running.store(false, Ordering::SeqCst);
        lock(&self.next_wake).take();
        info!("ScoreTracker has stopped.");
        Ok(())
    }

    /// Cancels the pending wake-up and stops the unattended loop.
    ///
    /// Safe to call at any time, including from a notification handler, and
    /// any number of times. Seen games and the backoff level are kept, and
    /// [`parse`](Self::parse) keeps working.
    pub fn stop(&self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        let pending = lock(&self.next_wake).take();
        if !was_running && pending.is_none() {
            debug!("stop() called with no pending wake-up.");
            return;
        }
        self.shutdown_sender.send(()).ok();
        self.event_sender.send(TrackerEvent::Stopped).ok();
        info!("ScoreTracker stop requested.");
    }

    /// Whether an unattended loop is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// When the unattended loop will next wake, if it is sleeping.
    pub fn next_wake_at(&self) -> Option<DateTime<Tz>> {
        *lock(&self.next_wake)
    }

    // --- Observation ---

    /// The delay computed by the most recent cycle, in milliseconds.
    pub fn current_interval(&self) -> Option<u64> {
        match self.current_interval.load(Ordering::SeqCst) {
            0 => None,
            ms => Some(ms),
        }
    }

    /// A snapshot of the tracker's memory. Fails while a cycle is running.
    pub fn status(&self) -> Result<TrackerStatus> {
        let state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(TrackerError::CycleInProgress),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        Ok(TrackerStatus {
            cycles: state.cycles,
            backoff_level: state.backoff.level,
            current_interval: state.current_interval,
            running: self.is_running(),
            next_wake_at: self.next_wake_at(),
            seen: state.snapshots(),
        })
    }

    // --- Notification handlers ---

    /// Registers a handler called once per announced game, inside the cycle.
    pub fn on_game(&self, handler: impl Fn(&RawGame) + Send + Sync + 'static) -> ListenerId {
        lock(&self.listeners).insert(Listener::Game(Arc::new(handler)))
    }

    /// Registers a handler called with the delay in milliseconds at the end of
    /// every cycle, after all game handlers.
    pub fn on_schedule(&self, handler: impl Fn(u64) + Send + Sync + 'static) -> ListenerId {
        lock(&self.listeners).insert(Listener::Schedule(Arc::new(handler)))
    }

    /// Removes a handler. Returns `true` if it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        lock(&self.listeners).remove(id).is_some()
    }

    /// Subscribes to the `TrackerEvent` stream.
    pub fn subscribe_events(&self) -> broadcast::Receiver<TrackerEvent> {
        self.event_sender.subscribe()
    }
}
