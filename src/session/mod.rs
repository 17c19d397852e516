//! Session Controller — top-level mode and driver coordination.
//!
//! The progression engine and the feed adapter are mutually exclusive
//! drivers: switching from one to the other always passes through quiescing
//! the former. Quiescing is implemented with a session generation counter —
//! every mode switch bumps it, and any asynchronous result stamped with an
//! older generation is discarded at application time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::BoardConfig;
use crate::engine::{IncrementSource, ProgressionEngine};
use crate::error::BoardError;
use crate::feed::FeedAdapter;
use crate::notify::BoardEvent;
use crate::providers::{demo_board, LogTextProvider, PlanGenerator};
use crate::store::{Severity, Task, TaskStore};

// ─── Session state ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Idle,
    Planning,
    Simulating,
    Live,
}

/// Explicit session state, owned by the controller and passed to both
/// drivers. All mutation funnels through these operations — there is no
/// ambient shared state.
pub struct Session {
    mode: RwLock<Mode>,
    /// Bumped on every mode switch; stale async results compare against it.
    generation: AtomicU64,
    /// The engine's active task. The feed is not bound by this pointer and
    /// may report several in_progress tasks; the store tolerates that.
    active_task: Mutex<Option<String>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            mode: RwLock::new(Mode::Idle),
            generation: AtomicU64::new(0),
            active_task: Mutex::new(None),
        }
    }

    pub async fn mode(&self) -> Mode {
        *self.mode.read().await
    }

    /// Switch modes and bump the generation. Returns the new generation for
    /// stamping work started under the new mode.
    pub async fn set_mode(&self, mode: Mode) -> u64 {
        *self.mode.write().await = mode;
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn active_task(&self) -> Option<String> {
        self.active_task.lock().await.clone()
    }

    pub async fn set_active_task(&self, id: Option<String>) {
        *self.active_task.lock().await = id;
    }
}

// ─── Controller ──────────────────────────────────────────────────────────────

pub struct SessionController {
    store: Arc<TaskStore>,
    session: Arc<Session>,
    feed: Arc<FeedAdapter>,
    plan: Arc<dyn PlanGenerator>,
    log_text: Arc<dyn LogTextProvider>,
    increments: Arc<dyn IncrementSource>,
    tick_interval: Duration,
    engine_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    pub fn new(
        config: &BoardConfig,
        plan: Arc<dyn PlanGenerator>,
        log_text: Arc<dyn LogTextProvider>,
        increments: Arc<dyn IncrementSource>,
    ) -> Arc<Self> {
        let store = Arc::new(TaskStore::new());
        let session = Arc::new(Session::new());
        let feed = Arc::new(FeedAdapter::new(Arc::clone(&store), Arc::clone(&session)));
        Arc::new(Self {
            store,
            session,
            feed,
            plan,
            log_text,
            increments,
            tick_interval: Duration::from_millis(config.tick_ms),
            engine_task: Mutex::new(None),
        })
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<BoardEvent> {
        self.store.subscribe()
    }

    // ── Operations ───────────────────────────────────────────────────────────

    /// Generate a plan for the goal and populate the board with it.
    ///
    /// The board is populated but not yet driven — the mode returns to idle
    /// and driving starts via [`start_simulation`] or [`start_connect`].
    /// Returns the number of tasks planned.
    ///
    /// [`start_simulation`]: Self::start_simulation
    /// [`start_connect`]: Self::start_connect
    pub async fn start_plan(&self, goal: &str) -> Result<usize, BoardError> {
        self.quiesce().await;
        self.session.set_mode(Mode::Planning).await;
        self.store
            .log(Severity::Info, format!("Planning tasks for: {goal}"))
            .await;

        match self.plan.generate(goal).await {
            Ok(seeds) => {
                let tasks: Vec<Task> = seeds.into_iter().map(Task::from_seed).collect();
                let count = tasks.len();
                self.store.replace_all(tasks, goal).await;
                self.session.set_active_task(None).await;
                self.session.set_mode(Mode::Idle).await;
                self.store
                    .log(
                        Severity::Success,
                        format!("Plan ready — {count} tasks. Ready to execute."),
                    )
                    .await;
                info!(count, "plan ingested");
                Ok(count)
            }
            Err(e) => {
                self.store
                    .log(Severity::Error, format!("Planning failed: {e}"))
                    .await;
                self.session.set_mode(Mode::Idle).await;
                Err(e)
            }
        }
    }

    /// Connect to a live agent feed. Any running simulation is quiesced
    /// first; on connect failure the session is left idle and it is up to
    /// the caller to try again.
    pub async fn start_connect(&self, address: &str) -> Result<(), BoardError> {
        self.quiesce().await;
        Arc::clone(&self.feed).open(address).await
    }

    /// Populate the board with the fixed demo dataset and start simulating.
    pub async fn load_demo(&self) {
        self.quiesce().await;
        let (tasks, goal) = demo_board();
        self.store.replace_all(tasks, goal).await;
        self.session.set_active_task(None).await;
        self.store.log(Severity::Info, "Demo data loaded").await;
        self.start_simulation().await;
    }

    /// Start the progression engine over the current board contents.
    /// No-op when nothing is pending or in progress.
    pub async fn start_simulation(&self) {
        if !self.store.has_open_tasks().await {
            return;
        }
        let generation = self.session.set_mode(Mode::Simulating).await;
        let engine = Arc::new(ProgressionEngine::new(
            Arc::clone(&self.store),
            Arc::clone(&self.session),
            Arc::clone(&self.log_text),
            Arc::clone(&self.increments),
            self.tick_interval,
        ));
        let handle = tokio::spawn(engine.run(generation));
        *self.engine_task.lock().await = Some(handle);
        info!("simulation started");
    }

    /// Halt whichever driver is active and return to idle.
    pub async fn stop(&self) {
        match self.session.mode().await {
            Mode::Live => self.feed.close().await,
            Mode::Simulating => {
                self.halt_engine().await;
                self.store.log(Severity::Info, "Simulation stopped").await;
            }
            _ => {
                self.session.set_mode(Mode::Idle).await;
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────────────

    /// Quiesce the currently active driver, if any, without user-facing
    /// logs. Every driver switch funnels through here.
    async fn quiesce(&self) {
        match self.session.mode().await {
            Mode::Live => self.feed.close().await,
            Mode::Simulating => self.halt_engine().await,
            _ => {}
        }
    }

    async fn halt_engine(&self) {
        // Abort first so a mid-flight tick cannot repopulate the pointer;
        // the mode switch then bumps the generation, which discards any
        // flavor-line result the dead engine still had in flight.
        if let Some(handle) = self.engine_task.lock().await.take() {
            handle.abort();
        }
        self.session.set_mode(Mode::Idle).await;
        self.session.set_active_task(None).await;
    }
}
