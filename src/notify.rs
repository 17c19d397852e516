use serde::Serialize;
use tokio::sync::broadcast;

/// A single store mutation, announced to passive readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BoardEvent {
    TasksReplaced,
    TaskUpdated { id: String },
    GlobalLogAppended,
    GoalChanged,
}

/// Broadcasts board change events to every subscribed renderer.
///
/// The board and terminal panes are passive readers: they subscribe here and
/// re-read the store on each event. Senders never block on slow readers.
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<BoardEvent>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Announce one mutation. Ignore errors — no subscribers is fine.
    pub fn notify(&self, event: BoardEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.tx.subscribe()
    }
}
