//! Broker facade.
//!
//! Wires the registry, match engine, task manager, and transport
//! together and exposes the inbound protocol operations. Request-level
//! failures come back as typed unsuccessful responses, never as
//! errors, so a misbehaving peer or store cannot crash a caller.

use crate::error::TaskError;
use crate::matching::MatchEngine;
use crate::registry::{AgentDescriptor, AgentRecord, CapabilityRegistry, SkillMeta};
use crate::store::AgentStore;
use crate::tasks::TaskManager;
use crate::transport::AgentTransport;
use a2a_protocol::{
    AgentCard, BestAgentResponse, CapabilityDiscoveryResponse, Message, MessageSendParams, Part,
    Role, SendMessageRequest, SendMessageResponse, SkillInvocationRequest, SkillInvocationResponse,
    SkillQuery, StreamEvent, Task,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

pub struct Broker {
    registry: Arc<CapabilityRegistry>,
    engine: MatchEngine,
    tasks: TaskManager,
    transport: Arc<dyn AgentTransport>,
    store: Arc<dyn AgentStore>,
}

impl Broker {
    pub fn new(store: Arc<dyn AgentStore>, transport: Arc<dyn AgentTransport>) -> Self {
        let registry = Arc::new(CapabilityRegistry::new(store.clone()));
        let engine = MatchEngine::new(store.clone());
        let tasks = TaskManager::new(registry.clone(), transport.clone());
        Self {
            registry,
            engine,
            tasks,
            transport,
            store,
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    /// Register the application's agents at startup.
    pub async fn register_agents(
        &self,
        descriptors: Vec<AgentDescriptor>,
    ) -> Result<Vec<AgentRecord>, crate::error::RegistryError> {
        self.registry.register_all(descriptors).await
    }

    /// Inbound send-message. Processing failures become an error
    /// envelope under the request's id.
    pub async fn send_message(&self, request: SendMessageRequest) -> SendMessageResponse {
        match self.tasks.process_message(&request.params).await {
            Ok(task) => SendMessageResponse {
                id: request.id,
                result: Some(TaskManager::response_message(&task)),
                error: None,
            },
            Err(err) => {
                error!(error = %err, "send-message processing failed");
                SendMessageResponse {
                    id: request.id,
                    result: None,
                    error: Some("Error processing request".into()),
                }
            }
        }
    }

    /// Inbound send-streaming-message: status update then message,
    /// both on the error path too.
    pub async fn send_streaming_message(&self, request: SendMessageRequest) -> Vec<StreamEvent> {
        self.tasks.stream_message(&request.params).await
    }

    pub fn get_task(&self, task_id: &str) -> Result<Task, TaskError> {
        self.tasks
            .get(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))
    }

    pub fn cancel_task(&self, task_id: &str) -> Result<Task, TaskError> {
        self.tasks.cancel(task_id)
    }

    /// Capability discovery over a query.
    pub async fn discover_capabilities(&self, query: &SkillQuery) -> CapabilityDiscoveryResponse {
        match self.engine.find_agents(query).await {
            Ok(agents) => CapabilityDiscoveryResponse::found(agents),
            Err(err) => {
                error!(error = %err, "capability discovery failed");
                CapabilityDiscoveryResponse::failure("Failed to discover capabilities")
            }
        }
    }

    /// Discovery with no criteria: every active agent's document.
    pub async fn discover_all_capabilities(&self) -> CapabilityDiscoveryResponse {
        match self.engine.discover_all_skills().await {
            Ok(agents) => CapabilityDiscoveryResponse::found(agents),
            Err(err) => {
                error!(error = %err, "capability discovery failed");
                CapabilityDiscoveryResponse::failure("Failed to discover capabilities")
            }
        }
    }

    pub async fn find_best_agent(&self, query: &SkillQuery) -> BestAgentResponse {
        match self.engine.find_best_agent(query).await {
            Ok(Some(agent)) => BestAgentResponse {
                success: true,
                agent: Some(agent),
                error_message: None,
            },
            Ok(None) => BestAgentResponse {
                success: false,
                agent: None,
                error_message: Some("No matching agent found".into()),
            },
            Err(err) => {
                error!(error = %err, "best-agent lookup failed");
                BestAgentResponse {
                    success: false,
                    agent: None,
                    error_message: Some("Failed to discover capabilities".into()),
                }
            }
        }
    }

    /// Invoke a skill on a named agent over the transport. Unknown
    /// agents and transport failures both come back unsuccessful.
    pub async fn invoke_skill(&self, request: SkillInvocationRequest) -> SkillInvocationResponse {
        info!(skill = %request.skill_id, agent = %request.agent_name, "invoking skill on agent");

        let agent = match self.store.find(&request.agent_name).await {
            Ok(Some(agent)) => agent,
            Ok(None) => {
                return SkillInvocationResponse::failure(format!(
                    "Agent not found: {}",
                    request.agent_name
                ));
            }
            Err(err) => {
                error!(error = %err, "agent lookup failed");
                return SkillInvocationResponse::failure("Skill invocation failed");
            }
        };

        let message_request = Self::invocation_request(&request, &agent.url);
        info!(agent = %agent.name, url = %agent.url, "sending message to agent");

        match self.transport.send_message(&agent.url, message_request).await {
            Ok(response) => {
                let task_id = response
                    .result
                    .as_ref()
                    .and_then(|message| message.task_id.clone());
                SkillInvocationResponse {
                    success: true,
                    result: response.result,
                    task_id,
                    error_message: None,
                }
            }
            Err(err) => {
                error!(error = %err, agent = %agent.name, "skill invocation failed");
                SkillInvocationResponse::failure("Skill invocation failed")
            }
        }
    }

    /// Card describing this broker's agents to peers: first registered
    /// agent as the face, every agent's skills pooled.
    pub fn agent_card(&self) -> AgentCard {
        let agents = self.registry.all();
        let Some(primary) = agents.first() else {
            return AgentCard::default();
        };

        let skills = agents
            .iter()
            .flat_map(|agent| agent.skills.iter().map(SkillMeta::to_agent_skill))
            .collect();

        AgentCard {
            name: primary.name.clone(),
            version: primary.version.clone(),
            description: primary.description.clone(),
            url: primary.url.clone(),
            skills,
            ..AgentCard::default()
        }
    }

    fn invocation_request(request: &SkillInvocationRequest, agent_url: &str) -> SendMessageRequest {
        let mut parts: Vec<Part> = request
            .input
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(Part::text)
            .collect();
        if parts.is_empty() {
            parts.push(Part::text(""));
        }

        let context_id = request
            .context_id
            .clone()
            .unwrap_or_else(|| request.skill_id.clone());

        let mut builder = Message::builder(Role::User)
            .message_id(Uuid::new_v4().to_string())
            .context_id(context_id)
            .task_id(Uuid::new_v4().to_string())
            .parts(parts)
            .metadata("skillId", json!(request.skill_id))
            .metadata("agentName", json!(request.agent_name))
            .metadata("agentUrl", json!(agent_url));
        for (key, value) in &request.metadata {
            builder = builder.metadata(key.clone(), value.clone());
        }

        SendMessageRequest::new(MessageSendParams::new(builder.build()))
    }
}
