//! Capability registry: agent metadata and skill handlers.
//!
//! The registry holds the live agent map and mirrors every mutation to
//! the external store. Registration is driven by an explicit list of
//! [`AgentDescriptor`]s supplied by the embedding application; the
//! registry does no discovery of its own.

use crate::error::{HandlerError, RegistryError};
use crate::store::{AgentStore, StoredAgent};
use a2a_protocol::{AgentSkill, AgentSkillDocument};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// A skill invocation capability: any component that can turn an input
/// string into an output string, possibly asynchronously.
#[async_trait]
pub trait SkillHandler: Send + Sync {
    async fn invoke(&self, input: &str) -> Result<String, HandlerError>;
}

#[async_trait]
impl<F, Fut> SkillHandler for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<String, HandlerError>> + Send,
{
    async fn invoke(&self, input: &str) -> Result<String, HandlerError> {
        self(input.to_string()).await
    }
}

/// How a skill is reached: a local callable or a remote agent URL.
#[derive(Clone)]
pub enum HandlerRef {
    Local(Arc<dyn SkillHandler>),
    Remote(String),
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerRef::Local(_) => f.write_str("Local(..)"),
            HandlerRef::Remote(url) => write!(f, "Remote({url})"),
        }
    }
}

/// One advertised skill plus its handler binding.
#[derive(Debug, Clone)]
pub struct SkillMeta {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub examples: Vec<String>,
    pub input_modes: Vec<String>,
    pub output_modes: Vec<String>,
    pub handler: HandlerRef,
}

impl SkillMeta {
    pub fn to_agent_skill(&self) -> AgentSkill {
        AgentSkill {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Registered agent metadata. `skills` keeps declaration order; the
/// first agent in registration order advertising a skill id wins
/// dispatch ties.
#[derive(Debug, Clone)]
pub struct AgentRecord {
    pub name: String,
    pub version: String,
    pub description: String,
    pub url: String,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub active: bool,
    pub skills: Vec<SkillMeta>,
}

impl AgentRecord {
    pub fn skill(&self, skill_id: &str) -> Option<&SkillMeta> {
        self.skills.iter().find(|s| s.id == skill_id)
    }

    pub fn to_document(&self) -> AgentSkillDocument {
        AgentSkillDocument::new(
            self.name.clone(),
            self.skills.iter().map(SkillMeta::to_agent_skill).collect(),
        )
    }
}

/// Registration input supplied by the embedding application.
#[derive(Debug, Clone)]
pub struct AgentDescriptor {
    pub name: String,
    pub version: String,
    pub description: String,
    pub url: String,
    pub skills: Vec<SkillMeta>,
}

impl AgentDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            url: url.into(),
            skills: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn skill(mut self, skill: SkillMeta) -> Self {
        self.skills.push(skill);
        self
    }
}

/// In-memory agent map mirrored to the external store.
pub struct CapabilityRegistry {
    agents: RwLock<IndexMap<String, AgentRecord>>,
    store: Arc<dyn AgentStore>,
}

impl CapabilityRegistry {
    pub fn new(store: Arc<dyn AgentStore>) -> Self {
        Self {
            agents: RwLock::new(IndexMap::new()),
            store,
        }
    }

    /// Insert or replace the entry keyed by the descriptor's name and
    /// persist its skill document. A prior record keeps its original
    /// `registered_at`; the heartbeat is refreshed either way.
    pub async fn register(&self, descriptor: AgentDescriptor) -> Result<AgentRecord, RegistryError> {
        let now = Utc::now();
        let registered_at = match self.store.find(&descriptor.name).await? {
            Some(existing) => existing.registered_at,
            None => now,
        };

        let record = AgentRecord {
            name: descriptor.name,
            version: descriptor.version,
            description: descriptor.description,
            url: descriptor.url,
            registered_at,
            last_heartbeat: now,
            active: true,
            skills: descriptor.skills,
        };

        let document = serde_json::to_string(&record.to_document())?;
        debug!(agent = %record.name, document, "serialized agent skill document");

        self.store
            .save(StoredAgent {
                name: record.name.clone(),
                version: record.version.clone(),
                description: record.description.clone(),
                url: record.url.clone(),
                registered_at: record.registered_at,
                last_heartbeat: record.last_heartbeat,
                active: record.active,
                skill_document: document,
            })
            .await?;

        info!(agent = %record.name, skills = record.skills.len(), "registered agent");
        self.agents
            .write()
            .insert(record.name.clone(), record.clone());
        Ok(record)
    }

    /// Register a batch of descriptors in order.
    pub async fn register_all(
        &self,
        descriptors: Vec<AgentDescriptor>,
    ) -> Result<Vec<AgentRecord>, RegistryError> {
        let mut records = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            records.push(self.register(descriptor).await?);
        }
        Ok(records)
    }

    /// Remove the entry and its stored record. Idempotent.
    pub async fn deregister(&self, name: &str) -> Result<(), RegistryError> {
        self.agents.write().shift_remove(name);
        self.store.delete_by_name(name).await?;
        info!(agent = %name, "deregistered agent");
        Ok(())
    }

    /// Deregister every known agent, e.g. on shutdown.
    pub async fn deregister_all(&self) -> Result<(), RegistryError> {
        let names: Vec<String> = self.agents.read().keys().cloned().collect();
        for name in names {
            self.deregister(&name).await?;
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<AgentRecord> {
        self.agents.read().get(name).cloned()
    }

    /// All records in registration order.
    pub fn all(&self) -> Vec<AgentRecord> {
        self.agents.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }

    /// First agent in registration order advertising `skill_id`,
    /// together with the skill. This iteration-order tie-break is the
    /// documented resolution for cross-agent id collisions.
    pub fn find_skill(&self, skill_id: &str) -> Option<(AgentRecord, SkillMeta)> {
        let agents = self.agents.read();
        for record in agents.values() {
            if let Some(skill) = record.skill(skill_id) {
                return Some((record.clone(), skill.clone()));
            }
        }
        None
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::store::MemoryStore;

    fn registry() -> CapabilityRegistry {
        CapabilityRegistry::new(Arc::new(MemoryStore::new()))
    }

    fn descriptor(name: &str) -> AgentDescriptor {
        AgentDescriptor::new(name, "1.0", format!("http://{name}.local"))
            .description(format!("{name} agent"))
            .skill(echo_skill("echo", &["text"]))
    }

    #[tokio::test]
    async fn register_persists_skill_document() {
        let store = Arc::new(MemoryStore::new());
        let registry = CapabilityRegistry::new(store.clone());
        registry.register(descriptor("alpha")).await.unwrap();

        let stored = store.find("alpha").await.unwrap().unwrap();
        let doc = stored.parse_document().unwrap();
        assert_eq!(doc.agent_name, "alpha");
        assert_eq!(doc.skills[0].id, "echo");
        assert_eq!(doc.skills[0].tags, vec!["text"]);
    }

    #[tokio::test]
    async fn reregistration_preserves_registered_at() {
        let registry = registry();
        let first = registry.register(descriptor("alpha")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = registry.register(descriptor("alpha")).await.unwrap();

        assert_eq!(second.registered_at, first.registered_at);
        assert!(second.last_heartbeat > first.last_heartbeat);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn deregister_is_idempotent() {
        let registry = registry();
        registry.register(descriptor("alpha")).await.unwrap();
        registry.deregister("alpha").await.unwrap();
        registry.deregister("alpha").await.unwrap();
        assert!(registry.lookup("alpha").is_none());
    }

    #[tokio::test]
    async fn deregister_all_clears_map_and_store() {
        let store = Arc::new(MemoryStore::new());
        let registry = CapabilityRegistry::new(store.clone());
        registry.register(descriptor("alpha")).await.unwrap();
        registry.register(descriptor("beta")).await.unwrap();

        registry.deregister_all().await.unwrap();
        assert!(registry.is_empty());
        assert!(store.find("alpha").await.unwrap().is_none());
        assert!(store.find("beta").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_skill_prefers_registration_order() {
        let registry = registry();
        registry
            .register(
                AgentDescriptor::new("first", "1.0", "http://first.local")
                    .skill(echo_skill("shared", &[])),
            )
            .await
            .unwrap();
        registry
            .register(
                AgentDescriptor::new("second", "1.0", "http://second.local")
                    .skill(echo_skill("shared", &[])),
            )
            .await
            .unwrap();

        let (record, skill) = registry.find_skill("shared").unwrap();
        assert_eq!(record.name, "first");
        assert_eq!(skill.id, "shared");
    }
}
