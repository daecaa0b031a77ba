//! Skill documents and capability queries.

use serde::{Deserialize, Serialize};

/// One advertised skill, as persisted and served in discovery
/// responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// The JSON document stored per agent record:
/// `{ "agentName": ..., "skills": [ { "id", "name", "description", "tags" } ] }`.
///
/// It round-trips through the persistence layer unchanged. Agent name,
/// url, and confidence are filled in from the owning record when the
/// document is served back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkillDocument {
    pub agent_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
}

impl AgentSkillDocument {
    pub fn new(agent_name: impl Into<String>, skills: Vec<AgentSkill>) -> Self {
        Self {
            agent_name: agent_name.into(),
            url: None,
            confidence: None,
            skills,
        }
    }

    /// Id comparison is case-insensitive, matching the scorer's
    /// exact-id stage.
    pub fn has_skill(&self, skill_id: &str) -> bool {
        self.skills.iter().any(|s| s.id.eq_ignore_ascii_case(skill_id))
    }
}

/// A partially-specified capability query.
///
/// Every criterion is optional; an empty query matches everything the
/// store considers active.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    /// true = all required tags must be covered, false = any (default)
    #[serde(default)]
    pub match_all_tags: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
}

impl SkillQuery {
    pub const DEFAULT_MAX_RESULTS: usize = 10;

    pub fn by_skill_id(id: impl Into<String>) -> Self {
        Self {
            skill_id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn by_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn by_tags<I, S>(tags: I, match_all: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_tags: tags.into_iter().map(Into::into).collect(),
            match_all_tags: match_all,
            ..Self::default()
        }
    }

    pub fn max_results(&self) -> usize {
        self.max_results.unwrap_or(Self::DEFAULT_MAX_RESULTS)
    }

    /// An exact criterion lets the store pre-filter candidates.
    pub fn has_exact_criteria(&self) -> bool {
        self.skill_id
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    /// Any keyword or tag long enough to be treated as descriptive
    /// text for the semantic stage.
    pub fn has_descriptive_text(&self) -> bool {
        self.keywords.iter().any(|k| k.len() > 3) || self.required_tags.iter().any(|t| t.len() > 3)
    }

    pub fn has_any_text_criteria(&self) -> bool {
        !self.keywords.is_empty() || !self.required_tags.is_empty() || self.has_exact_criteria()
    }

    /// All non-blank terms of the query: skill id, keywords, tags.
    pub fn all_terms(&self) -> Vec<String> {
        self.skill_id
            .iter()
            .chain(self.keywords.iter())
            .chain(self.required_tags.iter())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}
