//! Skill-matching engine.
//!
//! Ranks stored agent records against a capability query. Candidates
//! come from the store (pre-filtered when the query carries an exact
//! criterion); records whose skill document fails to parse are logged
//! and skipped, never fatal for the query.

mod scorer;
mod synonyms;

pub use scorer::{evaluate_skill, SkillScore};
pub use synonyms::semantically_similar;

use crate::error::StoreError;
use crate::store::{AgentStore, StoreFilter};
use a2a_protocol::{AgentSkill, AgentSkillDocument, SkillQuery};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Confidence floor; matches at or below it are discarded.
pub const MIN_CONFIDENCE: f64 = 0.1;

/// One skill ranked against a query. Ephemeral, never persisted.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub skill: AgentSkill,
    pub agent_name: String,
    pub confidence: f64,
    pub reasons: Vec<String>,
}

pub struct MatchEngine {
    store: Arc<dyn AgentStore>,
}

impl MatchEngine {
    pub fn new(store: Arc<dyn AgentStore>) -> Self {
        Self { store }
    }

    /// Parsed candidate documents for a query, in store order.
    async fn candidates(&self, query: &SkillQuery) -> Result<Vec<AgentSkillDocument>, StoreError> {
        // Exact criteria can be pushed down; loose matching needs the
        // whole active set in memory.
        let filter = if query.has_exact_criteria() {
            StoreFilter {
                skill_id: query.skill_id.clone(),
                required_tags: query.required_tags.clone(),
                match_all_tags: query.match_all_tags,
                max_results: None,
            }
        } else {
            StoreFilter::default()
        };

        let records = self.store.search(&filter).await?;
        debug!(candidates = records.len(), "evaluating agents for query");

        let mut documents = Vec::with_capacity(records.len());
        for record in records {
            match record.parse_document() {
                Ok(mut doc) => {
                    doc.agent_name = record.name.clone();
                    doc.url = Some(record.url.clone());
                    documents.push(doc);
                }
                Err(err) => {
                    warn!(agent = %record.name, error = %err, "skill document parsing failed, skipping record");
                }
            }
        }
        Ok(documents)
    }

    /// Rank individual skills against the query: confidence descending,
    /// ties in store order, truncated to the query's `max_results`,
    /// floor of [`MIN_CONFIDENCE`].
    pub async fn match_skills(&self, query: &SkillQuery) -> Result<Vec<MatchResult>, StoreError> {
        let mut results = Vec::new();
        for doc in self.candidates(query).await? {
            for skill in &doc.skills {
                let score = evaluate_skill(skill, query);
                if score.confidence > MIN_CONFIDENCE {
                    results.push(MatchResult {
                        skill: skill.clone(),
                        agent_name: doc.agent_name.clone(),
                        confidence: score.confidence,
                        reasons: score.reasons,
                    });
                }
            }
        }

        // Stable sort keeps store order for equal confidence.
        results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        results.truncate(query.max_results());
        Ok(results)
    }

    /// Rank whole agents: per-agent confidence is
    /// `0.7 * best_skill + 0.3 * avg_skill`, boosted by 1.1 (capped at
    /// 1.0) when more than one skill matched.
    pub async fn find_agents(
        &self,
        query: &SkillQuery,
    ) -> Result<Vec<AgentSkillDocument>, StoreError> {
        let mut agents = Vec::new();

        for mut doc in self.candidates(query).await? {
            let scores: Vec<SkillScore> = doc
                .skills
                .iter()
                .map(|skill| evaluate_skill(skill, query))
                .filter(|score| score.confidence > MIN_CONFIDENCE)
                .collect();

            if scores.is_empty() {
                continue;
            }

            let max = scores.iter().map(|s| s.confidence).fold(0.0_f64, f64::max);
            let avg =
                scores.iter().map(|s| s.confidence).sum::<f64>() / scores.len() as f64;
            let mut confidence = max * 0.7 + avg * 0.3;
            if scores.len() > 1 {
                confidence = (confidence * 1.1).min(1.0);
            }

            debug!(
                agent = %doc.agent_name,
                confidence,
                matched_skills = scores.len(),
                "agent matched query"
            );
            doc.confidence = Some(confidence);
            agents.push(doc);
        }

        agents.sort_by(|a, b| {
            b.confidence
                .unwrap_or(0.0)
                .total_cmp(&a.confidence.unwrap_or(0.0))
        });
        agents.truncate(query.max_results());

        info!(matches = agents.len(), "capability query evaluated");
        if let Some(top) = agents.first() {
            info!(
                agent = %top.agent_name,
                confidence = top.confidence.unwrap_or(0.0),
                "top match"
            );
        }
        Ok(agents)
    }

    /// Head of [`find_agents`].
    pub async fn find_best_agent(
        &self,
        query: &SkillQuery,
    ) -> Result<Option<AgentSkillDocument>, StoreError> {
        Ok(self.find_agents(query).await?.into_iter().next())
    }

    /// Every active agent's skill document, parse failures skipped.
    pub async fn discover_all_skills(&self) -> Result<Vec<AgentSkillDocument>, StoreError> {
        self.candidates(&SkillQuery::default()).await
    }
}
