//! Response envelopes for discovery and invocation, plus the agent
//! card served to peers.

use crate::message::Message;
use crate::skill::{AgentSkill, AgentSkillDocument};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ask a named agent to run a skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInvocationRequest {
    pub agent_name: String,
    pub skill_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInvocationResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SkillInvocationResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            task_id: None,
            error_message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDiscoveryResponse {
    pub success: bool,
    #[serde(default)]
    pub agent_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<AgentSkillDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CapabilityDiscoveryResponse {
    pub fn found(agents: Vec<AgentSkillDocument>) -> Self {
        Self {
            success: true,
            agent_count: agents.len(),
            agents,
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            agent_count: 0,
            agents: Vec::new(),
            error_message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestAgentResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentSkillDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Self-description served at the card endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub version: String,
    pub description: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<AgentSkill>,
    #[serde(default)]
    pub default_input_modes: Vec<String>,
    #[serde(default)]
    pub default_output_modes: Vec<String>,
    pub capabilities: AgentCapabilities,
    pub provider: AgentProvider,
}

impl Default for AgentCard {
    fn default() -> Self {
        Self {
            name: "A2A Agent".into(),
            version: "1.0".into(),
            description: "A2A Protocol Agent".into(),
            url: "http://localhost:8080".into(),
            skills: Vec::new(),
            default_input_modes: vec!["text".into()],
            default_output_modes: vec!["text".into()],
            capabilities: AgentCapabilities::default(),
            provider: AgentProvider::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub push_notifications: bool,
    pub state_transition_history: bool,
}

impl Default for AgentCapabilities {
    fn default() -> Self {
        Self {
            streaming: true,
            push_notifications: false,
            state_transition_history: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProvider {
    pub organization: String,
    pub url: String,
}

impl Default for AgentProvider {
    fn default() -> Self {
        Self {
            organization: "A2A System".into(),
            url: "http://localhost:8080".into(),
        }
    }
}
