//! Feed Adapter — the live driver.
//!
//! Manages at most one WebSocket connection to an external agent process.
//! Inbound socket activity is normalized into a single tagged [`FeedEvent`]
//! and dispatched through one handler; the handler gates every effect on the
//! session generation captured at connect time, so events from a torn-down
//! connection are discarded on arrival.
//!
//! There is no automatic reconnection, in either failure class. An initial
//! connect failure is terminal for that attempt; a drop after connect emits
//! a warning with the close code and returns the session to idle. The caller
//! re-invokes `open` to try again.

pub mod payload;

use std::sync::Arc;

use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::BoardError;
use crate::session::{Mode, Session};
use crate::store::{Severity, TaskStore};
use payload::FeedPayload;

/// Close code reported when the peer vanishes without a close frame.
const CLOSE_ABNORMAL: u16 = 1006;
/// Close code reported for a close frame that carried no status.
const CLOSE_NO_STATUS: u16 = 1005;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Everything the socket can tell us, as one enumerated event type.
#[derive(Debug)]
pub enum FeedEvent {
    Opened,
    Message(String),
    Error(String),
    Closed { code: u16 },
}

struct Connection {
    sink: WsSink,
    reader: JoinHandle<()>,
}

pub struct FeedAdapter {
    store: Arc<TaskStore>,
    session: Arc<Session>,
    conn: Mutex<Option<Connection>>,
}

impl FeedAdapter {
    pub fn new(store: Arc<TaskStore>, session: Arc<Session>) -> Self {
        Self {
            store,
            session,
            conn: Mutex::new(None),
        }
    }

    /// Establish the feed connection. At most one connection at a time: an
    /// already-open connection is closed first.
    ///
    /// On success the session goes live (quiescing the progression engine via
    /// the generation bump) and a success log is emitted. On failure the mode
    /// stays idle, an error log plus a remediation hint are emitted, and no
    /// retry is attempted.
    pub async fn open(self: Arc<Self>, address: &str) -> Result<(), BoardError> {
        if self.conn.lock().await.is_some() {
            self.close().await;
        }

        info!(address, "feed: connecting");
        let ws = match connect_async(address).await {
            Ok((ws, _resp)) => ws,
            Err(e) => {
                warn!(address, err = %e, "feed: connect failed");
                self.store
                    .log(Severity::Error, format!("Failed to connect to agent feed: {e}"))
                    .await;
                self.store
                    .log(
                        Severity::Info,
                        "Check that the agent process is running and the feed address is correct",
                    )
                    .await;
                return Err(BoardError::Connect(e.to_string()));
            }
        };

        let generation = self.session.set_mode(Mode::Live).await;
        self.session.set_active_task(None).await;

        let (sink, mut stream) = ws.split();
        // Hold the reader until the connection handle is stored and the
        // success log is emitted, so events can never outrun the open.
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<()>();
        let adapter = Arc::clone(&self);
        let reader = tokio::spawn(async move {
            let _ = ready_rx.await;
            let mut close_code = CLOSE_ABNORMAL;
            while let Some(item) = stream.next().await {
                match item {
                    Ok(Message::Text(text)) => {
                        adapter
                            .handle_event(FeedEvent::Message(text), generation)
                            .await;
                    }
                    Ok(Message::Close(frame)) => {
                        close_code = frame
                            .map(|f| u16::from(f.code))
                            .unwrap_or(CLOSE_NO_STATUS);
                        break;
                    }
                    Ok(_) => {} // ping/pong/binary — not part of the protocol
                    Err(e) => {
                        // Not terminal in itself; the close below drives the
                        // mode transition.
                        adapter
                            .handle_event(FeedEvent::Error(e.to_string()), generation)
                            .await;
                        break;
                    }
                }
            }
            adapter
                .handle_event(FeedEvent::Closed { code: close_code }, generation)
                .await;
        });

        *self.conn.lock().await = Some(Connection { sink, reader });
        self.handle_event(FeedEvent::Opened, generation).await;
        let _ = ready_tx.send(());
        Ok(())
    }

    /// Explicit teardown: close the connection if open, emit an info log,
    /// and return the session to idle regardless of current state.
    pub async fn close(&self) {
        let conn = self.conn.lock().await.take();
        // Bump the generation first so anything still in flight from the old
        // connection is discarded on arrival.
        self.session.set_mode(Mode::Idle).await;
        self.session.set_active_task(None).await;
        if let Some(mut conn) = conn {
            let _ = conn.sink.send(Message::Close(None)).await;
            conn.reader.abort();
            self.store
                .log(Severity::Info, "Disconnected from agent feed")
                .await;
            info!("feed: closed");
        }
    }

    /// Single dispatch point for every connection event.
    pub(crate) async fn handle_event(&self, event: FeedEvent, generation: u64) {
        match event {
            FeedEvent::Opened => {
                self.store
                    .log(Severity::Success, "Connected to agent feed")
                    .await;
            }
            FeedEvent::Message(text) => {
                if self.session.generation() != generation
                    || self.session.mode().await != Mode::Live
                {
                    debug!("feed: dropping message from stale connection");
                    return;
                }
                self.apply_message(&text).await;
            }
            FeedEvent::Error(e) => {
                if self.session.generation() != generation {
                    return;
                }
                self.store
                    .log(Severity::Error, format!("Feed error: {e}"))
                    .await;
            }
            FeedEvent::Closed { code } => {
                if self.session.generation() != generation
                    || self.session.mode().await != Mode::Live
                {
                    return;
                }
                warn!(code, "feed: connection closed");
                self.store
                    .log(
                        Severity::Warning,
                        format!("Feed connection closed (code {code})"),
                    )
                    .await;
                self.conn.lock().await.take();
                self.session.set_active_task(None).await;
                self.session.set_mode(Mode::Idle).await;
            }
        }
    }

    /// Translate one inbound message into store mutations. Malformed or
    /// unrecognized payloads are dropped without touching the store and
    /// without closing the connection.
    async fn apply_message(&self, text: &str) {
        let payload: FeedPayload = match serde_json::from_str(text) {
            Ok(p) => p,
            Err(e) => {
                debug!(err = %e, "feed: dropping unparseable payload");
                return;
            }
        };

        if let Some(mut tasks) = payload.tasks {
            for t in &mut tasks {
                // The feed is authoritative but not trusted on ranges.
                t.progress = t.progress.min(100);
            }
            let goal = self.store.goal().await;
            self.store.replace_all(tasks, goal).await;
            // Recompute the active pointer from the new collection: the
            // (at most one, by convention) in_progress task.
            let active = self.store.first_in_progress().await;
            self.session.set_active_task(active).await;
        }

        if let Some(log) = payload.log {
            self.store.append_global_log(log.into()).await;
        }

        if let Some(logs) = payload.logs {
            for log in logs {
                self.store.append_global_log(log.into()).await;
            }
        }

        if let Some(goal) = payload.project_goal {
            self.store.set_goal(goal).await;
        }
    }
}
