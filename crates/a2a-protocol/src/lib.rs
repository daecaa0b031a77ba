//! Wire types for the A2A (agent-to-agent) protocol surface.
//!
//! Pure data: messages and their parts, task lifecycle types, skill
//! documents and capability queries, and the response envelopes the
//! broker renders for discovery and invocation. No I/O lives here.

pub mod discovery;
pub mod message;
pub mod skill;
pub mod task;

pub use discovery::{
    AgentCapabilities, AgentCard, AgentProvider, BestAgentResponse, CapabilityDiscoveryResponse,
    SkillInvocationRequest, SkillInvocationResponse,
};
pub use message::{
    Message, MessageSendConfiguration, MessageSendParams, Part, Role, SendMessageRequest,
    SendMessageResponse,
};
pub use skill::{AgentSkill, AgentSkillDocument, SkillQuery};
pub use task::{StreamEvent, Task, TaskState, TaskStatus, TaskStatusUpdateEvent};
