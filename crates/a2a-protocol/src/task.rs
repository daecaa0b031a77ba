//! Task lifecycle types.
//!
//! A task tracks the processing of one inbound message. Tasks are
//! immutable snapshots: every state transition produces a new value
//! with merged metadata, and the owner swaps it into its map.

use crate::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Task state - 5-state model
///
/// State transitions:
/// - working -> completed, failed, canceled, rejected
/// - any -> canceled (an explicit cancel overwrites terminal states)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Work in progress, the only non-terminal state
    #[default]
    Working,
    /// Dispatch succeeded, result is in metadata
    Completed,
    /// Handler or transport failure, error is in metadata
    Failed,
    /// Canceled by an explicit cancel call
    Canceled,
    /// No registered agent advertises the requested skill
    Rejected,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Working => "working",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
            TaskState::Rejected => "rejected",
        }
    }

    /// Whether the state machine treats this state as terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Working)
    }
}

/// State plus the moment it was entered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    pub timestamp: DateTime<Utc>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            timestamp: Utc::now(),
        }
    }
}

/// One tracked unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl Task {
    /// Fresh task in `Working` with the given ids.
    pub fn new(id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            context_id: context_id.into(),
            status: TaskStatus::new(TaskState::Working),
            history: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// New snapshot in `state`, carrying history and metadata forward.
    pub fn with_state(&self, state: TaskState) -> Self {
        let mut next = self.clone();
        next.status = TaskStatus::new(state);
        next
    }

    /// New snapshot in `state` with `extra` merged over the prior
    /// metadata (new keys win).
    pub fn with_state_and_metadata(
        &self,
        state: TaskState,
        extra: BTreeMap<String, Value>,
    ) -> Self {
        let mut next = self.with_state(state);
        next.metadata.extend(extra);
        next
    }

    /// New snapshot with `message` appended to the history.
    pub fn with_history(&self, message: Message) -> Self {
        let mut next = self.clone();
        next.history.push(message);
        next
    }

    pub fn result(&self) -> Option<&Value> {
        self.metadata.get("result")
    }

    pub fn error(&self) -> Option<&Value> {
        self.metadata.get("error")
    }
}

/// Status-update event emitted at the head of a streaming response.
///
/// `is_final` deliberately covers only completed/failed/canceled:
/// `rejected` is terminal for the state machine but is not flagged
/// final here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    pub task_id: String,
    pub context_id: String,
    pub status: TaskStatus,
    pub is_final: bool,
}

impl TaskStatusUpdateEvent {
    pub fn for_task(task: &Task) -> Self {
        let is_final = matches!(
            task.status.state,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled
        );
        Self {
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            status: task.status.clone(),
            is_final,
        }
    }
}

/// One element of a streaming response: a status update followed by
/// the result (or error) message. The sequence is always finite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum StreamEvent {
    StatusUpdate(TaskStatusUpdateEvent),
    Message(Message),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn working_is_the_only_non_terminal_state() {
        assert!(!TaskState::Working.is_terminal());
        for state in [
            TaskState::Completed,
            TaskState::Failed,
            TaskState::Canceled,
            TaskState::Rejected,
        ] {
            assert!(state.is_terminal(), "{} should be terminal", state.as_str());
        }
    }

    #[test]
    fn transition_merges_metadata() {
        let mut task = Task::new("t-1", "c-1");
        task.metadata.insert("seed".into(), json!("kept"));

        let mut extra = BTreeMap::new();
        extra.insert("result".into(), json!("42"));
        let done = task.with_state_and_metadata(TaskState::Completed, extra);

        assert_eq!(done.status.state, TaskState::Completed);
        assert_eq!(done.metadata.get("seed"), Some(&json!("kept")));
        assert_eq!(done.result(), Some(&json!("42")));
        // the prior snapshot is untouched
        assert_eq!(task.status.state, TaskState::Working);
    }

    #[test]
    fn rejected_status_update_is_not_final() {
        let task = Task::new("t-2", "c-2").with_state(TaskState::Rejected);
        let event = TaskStatusUpdateEvent::for_task(&task);
        assert!(task.status.state.is_terminal());
        assert!(!event.is_final);
    }

    #[test]
    fn completed_failed_canceled_are_final() {
        for state in [TaskState::Completed, TaskState::Failed, TaskState::Canceled] {
            let task = Task::new("t", "c").with_state(state);
            assert!(TaskStatusUpdateEvent::for_task(&task).is_final);
        }
    }

    #[test]
    fn state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TaskState::Rejected).unwrap(), "\"rejected\"");
    }
}
