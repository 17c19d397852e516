//! Progression Engine — the simulated driver.
//!
//! A cooperative tick loop that advances exactly one task at a time through
//! its status lifecycle while the session is in simulating mode. Each tick
//! is a synchronous read-modify-write against the store; the only
//! asynchronous side effect — fetching a flavor log line from the log-text
//! provider — is spawned off the tick path and its result is applied as a
//! single atomic mutation, gated by the session generation and the active
//! task pointer so late results are discarded rather than queued.
//!
//! A tick that fires while the previous one is still executing is skipped,
//! not queued (`MissedTickBehavior::Skip`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand_core::{OsRng, RngCore};
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::providers::LogTextProvider;
use crate::session::{Mode, Session};
use crate::store::{LogEntry, Severity, TaskStatus, TaskStore};

/// Progress a freshly activated task starts at — small but positive, so the
/// board shows movement the moment a task leaves the pending column.
pub const PROGRESS_SEED: u8 = 5;

/// Per-tick progress increment range, inclusive.
pub const INCREMENT_MIN: u8 = 5;
pub const INCREMENT_MAX: u8 = 19;

// ─── Increment source ────────────────────────────────────────────────────────

/// Seam for the per-tick progress increment. Production draws from OS
/// randomness; tests pin the increment for deterministic schedules.
pub trait IncrementSource: Send + Sync {
    fn next_increment(&self) -> u8;
}

/// Uniform draw from the inclusive increment range.
pub struct OsIncrement;

impl IncrementSource for OsIncrement {
    fn next_increment(&self) -> u8 {
        let span = u32::from(INCREMENT_MAX - INCREMENT_MIN) + 1;
        INCREMENT_MIN + (OsRng.next_u32() % span) as u8
    }
}

/// Fixed increment on every tick.
pub struct FixedIncrement(pub u8);

impl IncrementSource for FixedIncrement {
    fn next_increment(&self) -> u8 {
        self.0
    }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct ProgressionEngine {
    store: Arc<TaskStore>,
    session: Arc<Session>,
    log_text: Arc<dyn LogTextProvider>,
    increments: Arc<dyn IncrementSource>,
    tick_interval: Duration,
    /// At-most-one-outstanding flavor-line request. The engine drives one
    /// task at a time, so a single flag covers the per-task discipline.
    fetch_in_flight: Arc<AtomicBool>,
    /// Latch for the terminal "all tasks completed" emission.
    completion_logged: AtomicBool,
}

impl ProgressionEngine {
    pub fn new(
        store: Arc<TaskStore>,
        session: Arc<Session>,
        log_text: Arc<dyn LogTextProvider>,
        increments: Arc<dyn IncrementSource>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            store,
            session,
            log_text,
            increments,
            tick_interval,
            fetch_in_flight: Arc::new(AtomicBool::new(false)),
            completion_logged: AtomicBool::new(false),
        }
    }

    /// Run until the session leaves simulating mode or the board drains.
    ///
    /// `generation` is the session generation captured when simulation
    /// started; any mode switch bumps it and the loop exits on next wake.
    pub async fn run(self: Arc<Self>, generation: u64) {
        self.prime().await;

        let start = tokio::time::Instant::now() + self.tick_interval;
        let mut interval = tokio::time::interval_at(start, self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            if !self.tick(generation).await {
                break;
            }
        }
        debug!("progression engine stopped");
    }

    /// Activate the first pending task immediately, before the interval
    /// starts ticking. Progress advancement is left to the ticks.
    pub async fn prime(&self) {
        match self.store.first_in_progress().await {
            // Re-driving a board that already has an in_progress task
            // (e.g. populated by a previous feed snapshot).
            Some(id) => self.session.set_active_task(Some(id)).await,
            None => {
                self.activate_next().await;
            }
        }
    }

    /// One advancement step. Returns `false` when the engine should stop:
    /// the session moved on, or no pending or in_progress task remains.
    pub async fn tick(&self, generation: u64) -> bool {
        if self.session.generation() != generation
            || self.session.mode().await != Mode::Simulating
        {
            return false;
        }

        match self.store.first_in_progress().await {
            Some(id) => self.advance(&id).await,
            None => {
                if self.activate_next().await.is_none() {
                    return self.finish().await;
                }
            }
        }

        // A tick with an active in_progress task also requests one flavor
        // line, off the tick path.
        if let Some(id) = self.session.active_task().await {
            self.spawn_flavor_fetch(id, generation);
        }
        true
    }

    /// pending → in_progress for the first pending task, seeding progress.
    async fn activate_next(&self) -> Option<String> {
        let id = self.store.first_pending().await?;
        let task = self
            .store
            .mutate(&id, |t| {
                t.status = TaskStatus::InProgress;
                t.progress = PROGRESS_SEED;
            })
            .await?;
        self.session.set_active_task(Some(id.clone())).await;
        self.store
            .log(Severity::Info, format!("Started: {}", task.title))
            .await;
        Some(id)
    }

    /// Advance the active task by one bounded increment, clamped to 100.
    /// Completion clears the active pointer in the same logical step.
    async fn advance(&self, id: &str) {
        let increment = self.increments.next_increment();
        let updated = self
            .store
            .mutate(id, |t| {
                t.progress = t.progress.saturating_add(increment).min(100);
                if t.progress == 100 {
                    t.status = TaskStatus::Completed;
                }
            })
            .await;

        match updated {
            Some(t) if t.status == TaskStatus::Completed => {
                self.session.set_active_task(None).await;
                self.store
                    .log(Severity::Success, format!("Completed: {}", t.title))
                    .await;
            }
            Some(_) => {}
            // The task vanished under us (wholesale replacement) — drop the
            // pointer and let the next tick recompute.
            None => self.session.set_active_task(None).await,
        }
    }

    /// Terminal condition: nothing left to drive. Emits the completion log
    /// exactly once and hands the session back to idle.
    async fn finish(&self) -> bool {
        if !self.completion_logged.swap(true, Ordering::SeqCst) {
            self.store
                .log(Severity::Success, "All tasks completed")
                .await;
        }
        self.session.set_active_task(None).await;
        self.session.set_mode(Mode::Idle).await;
        false
    }

    // ── Flavor log lines ─────────────────────────────────────────────────────

    fn spawn_flavor_fetch(&self, task_id: String, generation: u64) {
        // At most one outstanding request; a tick that fires while the
        // previous fetch is still in flight simply skips the request.
        if self.fetch_in_flight.swap(true, Ordering::SeqCst) {
            return;
        }
        let store = Arc::clone(&self.store);
        let session = Arc::clone(&self.session);
        let log_text = Arc::clone(&self.log_text);
        let in_flight = Arc::clone(&self.fetch_in_flight);
        tokio::spawn(async move {
            let Some(task) = store.task(&task_id).await else {
                in_flight.store(false, Ordering::SeqCst);
                return;
            };
            let (line, severity) = log_text.flavor_line(&task.title, task.progress).await;
            in_flight.store(false, Ordering::SeqCst);
            apply_flavor_line(&store, &session, &task_id, generation, line, severity).await;
        });
    }

    /// Test seam for the stale-result gate.
    #[cfg(test)]
    pub(crate) async fn apply_flavor_result(
        &self,
        task_id: &str,
        generation: u64,
        line: String,
        severity: Severity,
    ) {
        apply_flavor_line(&self.store, &self.session, task_id, generation, line, severity).await;
    }
}

/// Apply a completed flavor-line fetch as one atomic mutation.
///
/// Gated on "still this session generation" and "still the active task":
/// results that arrive after a mode switch or task change are discarded,
/// not queued.
async fn apply_flavor_line(
    store: &TaskStore,
    session: &Session,
    task_id: &str,
    generation: u64,
    line: String,
    severity: Severity,
) {
    if session.generation() != generation {
        debug!(task_id, "discarding stale flavor line (generation changed)");
        return;
    }
    if session.active_task().await.as_deref() != Some(task_id) {
        debug!(task_id, "discarding stale flavor line (task no longer active)");
        return;
    }
    let Some(task) = store.task(task_id).await else {
        return;
    };
    let entry = LogEntry::new(line.clone(), severity);
    store.mutate(task_id, move |t| t.log.push(entry)).await;
    store
        .append_global_log(LogEntry::new(format!("[{}] {line}", task.title), severity))
        .await;
}
