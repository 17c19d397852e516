use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generate a new task ID (UUID v4).
pub fn new_task_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

// ─── Enums ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// The finite set of states a task can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Review,
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Error,
    Warning,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Info
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{s}")
    }
}

// ─── LogEntry ────────────────────────────────────────────────────────────────

/// One immutable log line. Appended, never mutated in place.
///
/// Feed-supplied entries may omit the timestamp and may tag severity as
/// `type` — both are tolerated on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default = "now")]
    pub ts: DateTime<Utc>,
    pub message: String,
    #[serde(default, alias = "type")]
    pub severity: Severity,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            ts: Utc::now(),
            message: message.into(),
            severity,
        }
    }
}

// ─── Task ────────────────────────────────────────────────────────────────────

/// A unit of work tracked through the fixed status lifecycle.
///
/// Deserialization is lenient by design: the feed is authoritative but may
/// send partial task objects, so everything beyond `id` and `title` falls
/// back to a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default, alias = "logs")]
    pub log: Vec<LogEntry>,
    #[serde(default, alias = "filesChanged", skip_serializing_if = "Vec::is_empty")]
    pub files_changed: Vec<String>,
}

/// A task skeleton as produced by the plan generator. The store assigns the
/// identifier and initializes status, progress, and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSeed {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
}

impl Task {
    pub fn from_seed(seed: TaskSeed) -> Self {
        Self {
            id: new_task_id(),
            title: seed.title,
            description: seed.description,
            priority: seed.priority,
            status: TaskStatus::Pending,
            progress: 0,
            log: Vec::new(),
            files_changed: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        let s = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(s, "\"in_progress\"");
    }

    #[test]
    fn test_partial_task_deserializes_with_defaults() {
        let t: Task = serde_json::from_str(r#"{"id":"t1","title":"Build"}"#).unwrap();
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.priority, Priority::Medium);
        assert_eq!(t.progress, 0);
        assert!(t.log.is_empty());
    }

    #[test]
    fn test_feed_aliases_accepted() {
        let t: Task = serde_json::from_str(
            r#"{"id":"t1","title":"Build","filesChanged":["src/a.rs"],
                "logs":[{"message":"hi","type":"warning"}]}"#,
        )
        .unwrap();
        assert_eq!(t.files_changed, vec!["src/a.rs"]);
        assert_eq!(t.log[0].severity, Severity::Warning);
    }

    #[test]
    fn test_from_seed_initializes_pending() {
        let task = Task::from_seed(TaskSeed {
            title: "Write docs".into(),
            description: "user guide".into(),
            priority: Priority::High,
        });
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.progress, 0);
        assert!(!task.id.is_empty());
    }
}
