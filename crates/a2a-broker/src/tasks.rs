//! Task lifecycle manager.
//!
//! Owns the task map and drives the per-message state machine:
//! `Working` on creation, then exactly one of `Completed`, `Failed`,
//! `Rejected` out of dispatch, or `Canceled` on an explicit cancel.
//! Snapshots are immutable; transitions swap a new value into the map,
//! and nothing is ever deleted.

use crate::error::TaskError;
use crate::registry::{CapabilityRegistry, HandlerRef};
use crate::transport::AgentTransport;
use a2a_protocol::{
    Message, MessageSendParams, Part, Role, SendMessageRequest, StreamEvent, Task, TaskState,
    TaskStatusUpdateEvent,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

pub struct TaskManager {
    tasks: DashMap<String, Task>,
    registry: Arc<CapabilityRegistry>,
    transport: Arc<dyn AgentTransport>,
}

impl TaskManager {
    pub fn new(registry: Arc<CapabilityRegistry>, transport: Arc<dyn AgentTransport>) -> Self {
        Self {
            tasks: DashMap::new(),
            registry,
            transport,
        }
    }

    /// Existing task for `task_id`, or a fresh `Working` task under
    /// that id (or a generated one).
    pub fn create_or_get(&self, task_id: Option<&str>, context_id: Option<&str>) -> Task {
        let id = task_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.tasks
            .entry(id.clone())
            .or_insert_with(|| {
                let context = context_id
                    .map(str::to_string)
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                Task::new(id, context)
            })
            .clone()
    }

    /// Read-only lookup; absence is an outcome, not a failure.
    pub fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.get(task_id).map(|t| t.clone())
    }

    /// Unconditional transition to `Canceled`. A terminal task is
    /// overwritten too; its metadata survives the merge.
    pub fn cancel(&self, task_id: &str) -> Result<Task, TaskError> {
        match self.tasks.entry(task_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let canceled = entry.get().with_state(TaskState::Canceled);
                entry.insert(canceled.clone());
                info!(task = %task_id, "task canceled");
                Ok(canceled)
            }
            Entry::Vacant(_) => Err(TaskError::NotFound(task_id.to_string())),
        }
    }

    /// Find `skill_id` across the registry (first agent in
    /// registration order wins) and run it. The returned snapshot has
    /// already been swapped into the map.
    pub async fn dispatch(&self, task: Task, skill_id: &str, input: &str) -> Task {
        let Some((agent, skill)) = self.registry.find_skill(skill_id) else {
            debug!(skill = %skill_id, "no registered agent advertises skill");
            return self.transition(
                &task,
                TaskState::Rejected,
                "error",
                json!(format!("Skill not found: {skill_id}")),
            );
        };

        debug!(skill = %skill_id, agent = %agent.name, "dispatching skill");
        let outcome = match &skill.handler {
            HandlerRef::Local(handler) => handler
                .invoke(input)
                .await
                .map_err(|err| err.to_string()),
            HandlerRef::Remote(url) => self.dispatch_remote(&task, skill_id, input, url).await,
        };

        match outcome {
            Ok(output) => {
                info!(skill = %skill_id, task = %task.id, "skill completed");
                self.transition(&task, TaskState::Completed, "result", json!(output))
            }
            Err(message) => {
                error!(skill = %skill_id, task = %task.id, error = %message, "skill failed");
                self.transition(&task, TaskState::Failed, "error", json!(message))
            }
        }
    }

    async fn dispatch_remote(
        &self,
        task: &Task,
        skill_id: &str,
        input: &str,
        url: &str,
    ) -> Result<String, String> {
        let message = Message::builder(Role::User)
            .context_id(skill_id)
            .task_id(task.id.clone())
            .part(Part::text(input))
            .build();
        let request = SendMessageRequest::new(MessageSendParams::new(message));

        let response = self
            .transport
            .send_message(url, request)
            .await
            .map_err(|err| err.to_string())?;

        match response.result {
            Some(result) => Ok(result.first_text().to_string()),
            None => Err(response
                .error
                .unwrap_or_else(|| "empty response from agent".to_string())),
        }
    }

    /// Validate the inbound payload, create or fetch its task, and
    /// dispatch the skill named by the message's context id.
    pub async fn process_message(&self, params: &MessageSendParams) -> Result<Task, TaskError> {
        let message = params
            .message
            .as_ref()
            .ok_or_else(|| TaskError::InvalidMessage("missing message body".into()))?;

        let skill_id = message.context_id.clone().unwrap_or_default();
        let task = self
            .create_or_get(message.task_id.as_deref(), message.context_id.as_deref())
            .with_history(message.clone());
        let input = message.first_text().to_string();

        Ok(self.dispatch(task, &skill_id, &input).await)
    }

    /// Streaming variant: always exactly two events. Errors become an
    /// unstored `Failed` task's status update plus an error message.
    pub async fn stream_message(&self, params: &MessageSendParams) -> Vec<StreamEvent> {
        match self.process_message(params).await {
            Ok(task) => vec![
                StreamEvent::StatusUpdate(TaskStatusUpdateEvent::for_task(&task)),
                StreamEvent::Message(Self::response_message(&task)),
            ],
            Err(err) => {
                error!(error = %err, "streaming message processing failed");
                let mut metadata = BTreeMap::new();
                metadata.insert(
                    "error".to_string(),
                    json!(format!("Failed to process streaming request: {err}")),
                );
                let error_task = Task::new(
                    Uuid::new_v4().to_string(),
                    Uuid::new_v4().to_string(),
                )
                .with_state_and_metadata(TaskState::Failed, metadata);

                vec![
                    StreamEvent::StatusUpdate(TaskStatusUpdateEvent::for_task(&error_task)),
                    StreamEvent::Message(
                        Message::builder(Role::Agent)
                            .context_id(error_task.context_id.clone())
                            .task_id(error_task.id.clone())
                            .part(Part::text(format!("Error: {err}")))
                            .build(),
                    ),
                ]
            }
        }
    }

    /// Agent-role message rendering a task's outcome back to the
    /// caller.
    pub fn response_message(task: &Task) -> Message {
        let text = if let Some(error) = task.error() {
            format!("Error: {}", value_text(error))
        } else if let Some(result) = task.result() {
            value_text(result)
        } else {
            "Task completed".to_string()
        };

        Message::builder(Role::Agent)
            .context_id(task.context_id.clone())
            .task_id(task.id.clone())
            .part(Part::text(text))
            .build()
    }

    fn transition(&self, task: &Task, state: TaskState, key: &str, value: Value) -> Task {
        let mut extra = BTreeMap::new();
        extra.insert(key.to_string(), value);
        let next = task.with_state_and_metadata(state, extra);
        self.tasks.insert(next.id.clone(), next.clone());
        next
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
