//! Capability broker for A2A agents.
//!
//! Three concerns live here, each behind its own module:
//!
//! - [`registry`] tracks which agents exist and which skills they
//!   advertise, mirroring every change to an [`store::AgentStore`].
//! - [`matching`] scores stored skill documents against a
//!   [`a2a_protocol::SkillQuery`] and ranks agents by confidence.
//! - [`tasks`] owns the per-message task lifecycle and dispatches
//!   skill invocations locally or over the [`transport`].
//!
//! [`broker::Broker`] wires the three together behind the inbound
//! protocol operations.

pub mod broker;
pub mod error;
pub mod matching;
pub mod registry;
pub mod store;
pub mod tasks;
pub mod transport;

pub use broker::Broker;
pub use error::{HandlerError, RegistryError, StoreError, TaskError, TransportError};
pub use matching::{MatchEngine, MatchResult, MIN_CONFIDENCE};
pub use registry::{AgentDescriptor, AgentRecord, CapabilityRegistry, HandlerRef, SkillMeta};
pub use store::{AgentStore, MemoryStore, StoreFilter, StoredAgent};
pub use tasks::TaskManager;
pub use transport::{AgentTransport, HttpTransport};
