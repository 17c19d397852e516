use serde::Deserialize;

use crate::store::{LogEntry, Severity, Task};

/// One inbound feed message. Every key is optional; a message may carry any
/// combination of them. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct FeedPayload {
    /// Full task-list snapshot — wholesale replacement.
    pub tasks: Option<Vec<Task>>,
    /// Single log line for the global log.
    pub log: Option<FeedLog>,
    /// Batch of log lines, appended in array order.
    pub logs: Option<Vec<FeedLog>>,
    /// New goal text.
    #[serde(rename = "projectGoal")]
    pub project_goal: Option<String>,
}

/// Log object as the feed sends it: `{message, type}`.
#[derive(Debug, Deserialize)]
pub struct FeedLog {
    pub message: String,
    #[serde(rename = "type", default)]
    pub severity: Severity,
}

impl From<FeedLog> for LogEntry {
    fn from(l: FeedLog) -> Self {
        LogEntry::new(l.message, l.severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskStatus;

    #[test]
    fn test_tasks_snapshot_parses() {
        let p: FeedPayload = serde_json::from_str(
            r#"{"tasks":[{"id":"a","title":"A","status":"in_progress","progress":40}]}"#,
        )
        .unwrap();
        let tasks = p.tasks.unwrap();
        assert_eq!(tasks[0].status, TaskStatus::InProgress);
        assert_eq!(tasks[0].progress, 40);
    }

    #[test]
    fn test_log_and_goal_parse() {
        let p: FeedPayload = serde_json::from_str(
            r#"{"log":{"message":"hello","type":"success"},"projectGoal":"ship it"}"#,
        )
        .unwrap();
        assert_eq!(p.log.unwrap().severity, Severity::Success);
        assert_eq!(p.project_goal.as_deref(), Some("ship it"));
    }

    #[test]
    fn test_review_status_accepted() {
        // The engine never produces `review`, but the feed may report it.
        let p: FeedPayload = serde_json::from_str(
            r#"{"tasks":[{"id":"a","title":"A","status":"review","progress":90}]}"#,
        )
        .unwrap();
        assert_eq!(p.tasks.unwrap()[0].status, TaskStatus::Review);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let p: FeedPayload =
            serde_json::from_str(r#"{"heartbeat":123,"nested":{"x":1}}"#).unwrap();
        assert!(p.tasks.is_none());
        assert!(p.log.is_none());
        assert!(p.logs.is_none());
        assert!(p.project_goal.is_none());
    }

    #[test]
    fn test_malformed_log_is_an_error() {
        // missing `message` — the whole payload is rejected and the caller
        // drops it without touching the store
        assert!(serde_json::from_str::<FeedPayload>(r#"{"log":{"type":"info"}}"#).is_err());
    }
}
