//! Persistence seam for agent records.
//!
//! The broker mirrors every registration to an external store and
//! reads match candidates back out of it. The store is reachable
//! through [`AgentStore`]; [`MemoryStore`] is the in-process
//! implementation used by tests and demos, with the same filter
//! semantics a relational backend would apply.

use crate::error::StoreError;
use a2a_protocol::AgentSkillDocument;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// One persisted agent record. The skills live in `skill_document`,
/// the serialized [`AgentSkillDocument`] JSON, which round-trips
/// through the store unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAgent {
    pub name: String,
    pub version: String,
    pub description: String,
    pub url: String,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub active: bool,
    pub skill_document: String,
}

impl StoredAgent {
    pub fn parse_document(&self) -> Result<AgentSkillDocument, serde_json::Error> {
        serde_json::from_str(&self.skill_document)
    }
}

/// Capability filter pushed down to the store. An empty filter returns
/// all active records.
#[derive(Debug, Clone, Default)]
pub struct StoreFilter {
    pub skill_id: Option<String>,
    pub required_tags: Vec<String>,
    pub match_all_tags: bool,
    pub max_results: Option<usize>,
}

impl StoreFilter {
    pub fn is_empty(&self) -> bool {
        self.skill_id.as_deref().is_none_or(|s| s.trim().is_empty())
            && self.required_tags.is_empty()
    }
}

/// Contract the external persistence mechanism must satisfy.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn find(&self, name: &str) -> Result<Option<StoredAgent>, StoreError>;

    async fn save(&self, record: StoredAgent) -> Result<StoredAgent, StoreError>;

    async fn search(&self, filter: &StoreFilter) -> Result<Vec<StoredAgent>, StoreError>;

    /// Idempotent: deleting an absent record is not an error.
    async fn delete_by_name(&self, name: &str) -> Result<(), StoreError>;
}

/// Insertion-ordered in-memory store. Iteration order is registration
/// order, which is what breaks confidence ties downstream.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<IndexMap<String, StoredAgent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(record: &StoredAgent, filter: &StoreFilter) -> bool {
        let Ok(doc) = record.parse_document() else {
            // Leave unparseable rows in the candidate set; the match
            // engine logs and skips them itself.
            return filter.is_empty();
        };

        if let Some(skill_id) = filter.skill_id.as_deref().filter(|s| !s.trim().is_empty()) {
            if !doc.has_skill(skill_id) {
                return false;
            }
        }

        if !filter.required_tags.is_empty() {
            let has_tag = |tag: &String| {
                doc.skills
                    .iter()
                    .any(|skill| skill.tags.iter().any(|t| t == tag))
            };
            let covered = if filter.match_all_tags {
                filter.required_tags.iter().all(has_tag)
            } else {
                filter.required_tags.iter().any(has_tag)
            };
            if !covered {
                return false;
            }
        }

        true
    }
}

#[async_trait]
impl AgentStore for MemoryStore {
    async fn find(&self, name: &str) -> Result<Option<StoredAgent>, StoreError> {
        Ok(self.records.read().get(name).cloned())
    }

    async fn save(&self, record: StoredAgent) -> Result<StoredAgent, StoreError> {
        self.records
            .write()
            .insert(record.name.clone(), record.clone());
        Ok(record)
    }

    async fn search(&self, filter: &StoreFilter) -> Result<Vec<StoredAgent>, StoreError> {
        let records = self.records.read();
        let mut hits: Vec<StoredAgent> = records
            .values()
            .filter(|r| r.active && Self::matches(r, filter))
            .cloned()
            .collect();

        if let Some(max) = filter.max_results.filter(|m| *m > 0) {
            hits.truncate(max);
        }
        Ok(hits)
    }

    async fn delete_by_name(&self, name: &str) -> Result<(), StoreError> {
        self.records.write().shift_remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_protocol::AgentSkill;

    fn stored(name: &str, skills: Vec<AgentSkill>) -> StoredAgent {
        let doc = AgentSkillDocument::new(name, skills);
        StoredAgent {
            name: name.into(),
            version: "1.0".into(),
            description: format!("{name} agent"),
            url: format!("http://{name}.local"),
            registered_at: Utc::now(),
            last_heartbeat: Utc::now(),
            active: true,
            skill_document: serde_json::to_string(&doc).unwrap(),
        }
    }

    fn skill(id: &str, tags: &[&str]) -> AgentSkill {
        AgentSkill {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn empty_filter_returns_all_active() {
        let store = MemoryStore::new();
        store.save(stored("a", vec![skill("s1", &[])])).await.unwrap();
        let mut inactive = stored("b", vec![skill("s2", &[])]);
        inactive.active = false;
        store.save(inactive).await.unwrap();

        let hits = store.search(&StoreFilter::default()).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "a");
    }

    #[tokio::test]
    async fn skill_id_filter_checks_document() {
        let store = MemoryStore::new();
        store.save(stored("a", vec![skill("echo", &[])])).await.unwrap();
        store.save(stored("b", vec![skill("sum", &[])])).await.unwrap();

        let filter = StoreFilter {
            skill_id: Some("echo".into()),
            ..Default::default()
        };
        let hits = store.search(&filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "a");
    }

    #[tokio::test]
    async fn tag_filter_honors_and_or_semantics() {
        let store = MemoryStore::new();
        store
            .save(stored("a", vec![skill("s1", &["review", "banking"])]))
            .await
            .unwrap();
        store
            .save(stored("b", vec![skill("s2", &["review"])]))
            .await
            .unwrap();

        let mut filter = StoreFilter {
            required_tags: vec!["review".into(), "banking".into()],
            match_all_tags: true,
            ..Default::default()
        };
        let and_hits = store.search(&filter).await.unwrap();
        assert_eq!(and_hits.len(), 1);
        assert_eq!(and_hits[0].name, "a");

        filter.match_all_tags = false;
        let or_hits = store.search(&filter).await.unwrap();
        assert_eq!(or_hits.len(), 2);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.save(stored("a", vec![])).await.unwrap();
        store.delete_by_name("a").await.unwrap();
        store.delete_by_name("a").await.unwrap();
        assert!(store.find("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn max_results_truncates_in_registration_order() {
        let store = MemoryStore::new();
        for name in ["a", "b", "c"] {
            store.save(stored(name, vec![skill("s", &[])])).await.unwrap();
        }
        let filter = StoreFilter {
            max_results: Some(2),
            ..Default::default()
        };
        let hits = store.search(&filter).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "a");
        assert_eq!(hits[1].name, "b");
    }
}
