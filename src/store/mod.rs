//! Task Store — the ordered task collection and the global log ring.
//!
//! Pure data plus mutation operations, no I/O. Every mutation entry point is
//! a critical section: the lock is taken and released inside a synchronous
//! block, never held across an await point, so readers always observe a
//! fully applied state. Each mutation fires one change notification.

pub mod model;

use std::collections::VecDeque;

use tokio::sync::RwLock;

use crate::notify::{BoardEvent, ChangeNotifier};
pub use model::{new_task_id, LogEntry, Priority, Severity, Task, TaskSeed, TaskStatus};

/// Bounded capacity of the global log. Oldest entries are evicted silently
/// on overflow — a resource bound, not an error condition.
pub const GLOBAL_LOG_CAPACITY: usize = 100;

struct BoardState {
    tasks: Vec<Task>,
    goal: String,
    global_log: VecDeque<LogEntry>,
}

/// A fully materialized, consistent view of the store at one instant.
#[derive(Debug, Clone)]
pub struct BoardSnapshot {
    pub tasks: Vec<Task>,
    pub goal: String,
    pub global_log: Vec<LogEntry>,
}

pub struct TaskStore {
    state: RwLock<BoardState>,
    notifier: ChangeNotifier,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(BoardState {
                tasks: Vec::new(),
                goal: String::new(),
                global_log: VecDeque::with_capacity(GLOBAL_LOG_CAPACITY),
            }),
            notifier: ChangeNotifier::new(),
        }
    }

    /// Subscribe to change notifications (one event per mutation).
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<BoardEvent> {
        self.notifier.subscribe()
    }

    // ── Mutations ────────────────────────────────────────────────────────────

    /// Atomically replace the entire task collection and the current goal.
    ///
    /// The engine-side active-task pointer is owned by the session and is NOT
    /// touched here — callers must recompute it from the new collection.
    pub async fn replace_all(&self, tasks: Vec<Task>, goal: impl Into<String>) {
        {
            let mut state = self.state.write().await;
            state.tasks = tasks;
            state.goal = goal.into();
        }
        self.notifier.notify(BoardEvent::TasksReplaced);
    }

    /// Apply a pure transformation to exactly one task. No-op if the id is
    /// absent. Returns a clone of the task after the transform.
    pub async fn mutate(&self, task_id: &str, f: impl FnOnce(&mut Task)) -> Option<Task> {
        let updated = {
            let mut state = self.state.write().await;
            let task = state.tasks.iter_mut().find(|t| t.id == task_id)?;
            f(task);
            task.clone()
        };
        self.notifier.notify(BoardEvent::TaskUpdated {
            id: task_id.to_string(),
        });
        Some(updated)
    }

    /// Push into the bounded global log FIFO, evicting the oldest entry
    /// beyond capacity.
    pub async fn append_global_log(&self, entry: LogEntry) {
        {
            let mut state = self.state.write().await;
            state.global_log.push_back(entry);
            while state.global_log.len() > GLOBAL_LOG_CAPACITY {
                state.global_log.pop_front();
            }
        }
        self.notifier.notify(BoardEvent::GlobalLogAppended);
    }

    /// Convenience: build and append a global log entry.
    pub async fn log(&self, severity: Severity, message: impl Into<String>) {
        self.append_global_log(LogEntry::new(message, severity)).await;
    }

    pub async fn set_goal(&self, goal: impl Into<String>) {
        {
            let mut state = self.state.write().await;
            state.goal = goal.into();
        }
        self.notifier.notify(BoardEvent::GoalChanged);
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    pub async fn snapshot(&self) -> BoardSnapshot {
        let state = self.state.read().await;
        BoardSnapshot {
            tasks: state.tasks.clone(),
            goal: state.goal.clone(),
            global_log: state.global_log.iter().cloned().collect(),
        }
    }

    pub async fn task(&self, task_id: &str) -> Option<Task> {
        let state = self.state.read().await;
        state.tasks.iter().find(|t| t.id == task_id).cloned()
    }

    pub async fn goal(&self) -> String {
        self.state.read().await.goal.clone()
    }

    /// First pending task in stable collection order.
    pub async fn first_pending(&self) -> Option<String> {
        let state = self.state.read().await;
        state
            .tasks
            .iter()
            .find(|t| t.status == TaskStatus::Pending)
            .map(|t| t.id.clone())
    }

    /// First in_progress task in stable collection order. The feed may
    /// report several; by convention the first is the active one.
    pub async fn first_in_progress(&self) -> Option<String> {
        let state = self.state.read().await;
        state
            .tasks
            .iter()
            .find(|t| t.status == TaskStatus::InProgress)
            .map(|t| t.id.clone())
    }

    /// True while any task is still pending or in progress.
    pub async fn has_open_tasks(&self) -> bool {
        let state = self.state.read().await;
        state
            .tasks
            .iter()
            .any(|t| matches!(t.status, TaskStatus::Pending | TaskStatus::InProgress))
    }

    pub async fn global_log_len(&self) -> usize {
        self.state.read().await.global_log.len()
    }

    pub async fn last_global_entry(&self) -> Option<LogEntry> {
        self.state.read().await.global_log.back().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            title: format!("Task {id}"),
            description: String::new(),
            priority: Priority::Medium,
            status,
            progress: 0,
            log: Vec::new(),
            files_changed: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_replace_all_swaps_tasks_and_goal() {
        let store = TaskStore::new();
        store
            .replace_all(vec![task("a", TaskStatus::Pending)], "old goal")
            .await;
        store
            .replace_all(vec![task("b", TaskStatus::Pending)], "new goal")
            .await;

        let snap = store.snapshot().await;
        assert_eq!(snap.tasks.len(), 1);
        assert_eq!(snap.tasks[0].id, "b");
        assert_eq!(snap.goal, "new goal");
    }

    #[tokio::test]
    async fn test_mutate_absent_id_is_noop() {
        let store = TaskStore::new();
        store
            .replace_all(vec![task("a", TaskStatus::Pending)], "")
            .await;
        let result = store.mutate("nope", |t| t.progress = 50).await;
        assert!(result.is_none());
        assert_eq!(store.task("a").await.unwrap().progress, 0);
    }

    #[tokio::test]
    async fn test_mutate_returns_updated_clone() {
        let store = TaskStore::new();
        store
            .replace_all(vec![task("a", TaskStatus::Pending)], "")
            .await;
        let updated = store
            .mutate("a", |t| {
                t.status = TaskStatus::InProgress;
                t.progress = 5;
            })
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert_eq!(updated.progress, 5);
    }

    #[tokio::test]
    async fn test_global_log_evicts_oldest_beyond_capacity() {
        let store = TaskStore::new();
        for i in 0..=GLOBAL_LOG_CAPACITY {
            store.log(Severity::Info, format!("entry {i}")).await;
        }
        let snap = store.snapshot().await;
        assert_eq!(snap.global_log.len(), GLOBAL_LOG_CAPACITY);
        // entry 0 evicted, newest present
        assert_eq!(snap.global_log[0].message, "entry 1");
        assert_eq!(
            snap.global_log.last().unwrap().message,
            format!("entry {GLOBAL_LOG_CAPACITY}")
        );
    }

    #[tokio::test]
    async fn test_global_log_preserves_append_order() {
        let store = TaskStore::new();
        store.log(Severity::Info, "first").await;
        store.log(Severity::Warning, "second").await;
        store.log(Severity::Error, "third").await;
        let snap = store.snapshot().await;
        let messages: Vec<&str> = snap.global_log.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_first_pending_uses_collection_order() {
        let store = TaskStore::new();
        store
            .replace_all(
                vec![
                    task("done", TaskStatus::Completed),
                    task("p1", TaskStatus::Pending),
                    task("p2", TaskStatus::Pending),
                ],
                "",
            )
            .await;
        assert_eq!(store.first_pending().await.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_mutation_fires_notification() {
        let store = TaskStore::new();
        let mut rx = store.subscribe();
        store
            .replace_all(vec![task("a", TaskStatus::Pending)], "")
            .await;
        assert_eq!(rx.recv().await.unwrap(), BoardEvent::TasksReplaced);

        store.mutate("a", |t| t.progress = 1).await;
        assert_eq!(
            rx.recv().await.unwrap(),
            BoardEvent::TaskUpdated { id: "a".into() }
        );
    }
}
