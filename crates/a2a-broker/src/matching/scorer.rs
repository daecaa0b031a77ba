//! Pure per-(skill, query) scoring.
//!
//! Five stages feed a running maximum: exact id, tag coverage, keyword
//! hits, semantic term coverage, and a Jaccard fallback that only runs
//! when everything else scored zero. Confidence is a heuristic ranking
//! score in [0, 1], not a probability.

use super::synonyms::{semantic_tag_matches, semantically_similar, text_contains_semantic};
use a2a_protocol::{AgentSkill, SkillQuery};
use std::collections::HashSet;

/// Score plus the reasons that produced it.
#[derive(Debug, Clone)]
pub struct SkillScore {
    pub confidence: f64,
    pub reasons: Vec<String>,
}

/// Evaluate one skill against a query.
pub fn evaluate_skill(skill: &AgentSkill, query: &SkillQuery) -> SkillScore {
    let mut confidence = 0.0_f64;
    let mut reasons = Vec::new();

    // 1. Exact skill id match short-circuits everything else.
    if query
        .skill_id
        .as_deref()
        .is_some_and(|id| !id.is_empty() && id.eq_ignore_ascii_case(&skill.id))
    {
        return SkillScore {
            confidence: 1.0,
            reasons: vec!["exact-id-match".into()],
        };
    }

    // 2. Tag coverage with semantic expansion.
    if !query.required_tags.is_empty() {
        let skill_tags: HashSet<String> =
            skill.tags.iter().map(|t| t.to_lowercase()).collect();
        let tag_score = tag_match_score(&skill_tags, &query.required_tags, query.match_all_tags);
        if tag_score > 0.0 {
            confidence = confidence.max(tag_score);
            reasons.push(format!("tag-match-{tag_score:.2}"));
        }
    }

    // 3. Keyword hits in the searchable text.
    if !query.keywords.is_empty() {
        let keyword_score = keyword_match_score(skill, &query.keywords);
        if keyword_score > 0.0 {
            confidence = confidence.max(keyword_score);
            reasons.push(format!("keyword-match-{keyword_score:.2}"));
        }
    }

    // 4. Semantic coverage of all query terms.
    if query.has_descriptive_text() {
        let semantic_score = semantic_match_score(skill, query);
        if semantic_score > 0.0 {
            confidence = confidence.max(semantic_score);
            reasons.push(format!("semantic-match-{semantic_score:.2}"));
        }
    }

    // 5. Loose text similarity, only when nothing above matched.
    if confidence == 0.0 && query.has_any_text_criteria() {
        let fallback = fallback_text_similarity(skill, query);
        if fallback > 0.2 {
            confidence = fallback;
            reasons.push(format!("text-similarity-{fallback:.2}"));
        }
    }

    SkillScore { confidence, reasons }
}

/// Skill name, description, and tags, space-joined. All text stages
/// search this blob.
pub fn searchable_text(skill: &AgentSkill) -> String {
    let mut text = String::new();
    if !skill.name.is_empty() {
        text.push_str(&skill.name);
        text.push(' ');
    }
    if !skill.description.is_empty() {
        text.push_str(&skill.description);
        text.push(' ');
    }
    for tag in &skill.tags {
        text.push_str(tag);
        text.push(' ');
    }
    text.trim_end().to_string()
}

fn tag_match_score(skill_tags: &HashSet<String>, required: &[String], match_all: bool) -> f64 {
    if skill_tags.is_empty() {
        return 0.0;
    }

    let query_tags: HashSet<String> = required.iter().map(|t| t.to_lowercase()).collect();
    let direct: HashSet<&str> = query_tags
        .iter()
        .filter(|t| skill_tags.contains(*t))
        .map(String::as_str)
        .collect();
    // Tags already covered directly are not counted again.
    let semantic: HashSet<&str> = semantic_tag_matches(skill_tags, &query_tags)
        .into_iter()
        .filter(|t| !direct.contains(t))
        .collect();

    let covered = direct.len() + semantic.len();
    let required_count = query_tags.len();

    if match_all {
        if covered >= required_count {
            0.9
        } else {
            covered as f64 / required_count as f64 * 0.7
        }
    } else if covered > 0 {
        let base = (covered as f64 / required_count as f64).min(0.8);
        if direct.is_empty() {
            // Penalty when every match was only semantic.
            base * 0.8
        } else {
            base
        }
    } else {
        0.0
    }
}

fn keyword_match_score(skill: &AgentSkill, keywords: &[String]) -> f64 {
    let text = searchable_text(skill).to_lowercase();
    let words: HashSet<&str> = text.split_whitespace().collect();

    let mut exact = 0usize;
    let mut semantic = 0usize;

    for keyword in keywords {
        let keyword = keyword.to_lowercase();
        if words.contains(keyword.as_str()) || text.contains(&keyword) {
            exact += 1;
            continue;
        }
        if words.iter().any(|word| semantically_similar(word, &keyword)) {
            semantic += 1;
        }
    }

    if exact + semantic == 0 {
        return 0.0;
    }

    let total = keywords.len() as f64;
    let exact_score = exact as f64 / total * 0.8;
    let semantic_score = semantic as f64 / total * 0.6;
    (exact_score + semantic_score).min(0.85)
}

fn semantic_match_score(skill: &AgentSkill, query: &SkillQuery) -> f64 {
    let text = searchable_text(skill);
    let terms = query.all_terms();
    if terms.is_empty() {
        return 0.0;
    }

    let matched = terms
        .iter()
        .filter(|term| text_contains_semantic(&text, term))
        .count();

    let ratio = matched as f64 / terms.len() as f64;
    if ratio > 0.3 {
        ratio.min(0.75)
    } else {
        0.0
    }
}

fn fallback_text_similarity(skill: &AgentSkill, query: &SkillQuery) -> f64 {
    let text = searchable_text(skill).to_lowercase();
    let terms = query.all_terms();
    if terms.is_empty() {
        return 0.0;
    }

    let skill_words: HashSet<&str> = text.split_whitespace().collect();
    let query_words: HashSet<String> = terms
        .iter()
        .flat_map(|term| term.to_lowercase().split_whitespace().map(str::to_string).collect::<Vec<_>>())
        .collect();

    let intersection = query_words
        .iter()
        .filter(|w| skill_words.contains(w.as_str()))
        .count();
    let union = skill_words.len() + query_words.len() - intersection;
    let jaccard = if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    };

    // 0.1 per substring pair, capped before it can dominate.
    let mut partial = 0.0_f64;
    for query_word in &query_words {
        for skill_word in &skill_words {
            if skill_word.contains(query_word.as_str()) || query_word.contains(skill_word) {
                partial += 0.1;
            }
        }
    }

    (jaccard + partial.min(0.3)).min(0.6)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(id: &str, name: &str, description: &str, tags: &[&str]) -> AgentSkill {
        AgentSkill {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn review_skill() -> AgentSkill {
        skill(
            "code-review",
            "Code Review",
            "Reviews pull requests for quality",
            &["review", "quality"],
        )
    }

    #[test]
    fn exact_id_match_scores_one() {
        let query = SkillQuery::by_skill_id("CODE-REVIEW");
        let score = evaluate_skill(&review_skill(), &query);
        assert_eq!(score.confidence, 1.0);
        assert_eq!(score.reasons, vec!["exact-id-match"]);
    }

    #[test]
    fn empty_skill_id_never_matches_exactly() {
        let mut query = SkillQuery::default();
        query.skill_id = Some(String::new());
        let mut empty_id = review_skill();
        empty_id.id = String::new();
        let score = evaluate_skill(&empty_id, &query);
        assert!(score.confidence < 1.0);
    }

    #[test]
    fn and_mode_all_tags_covered_scores_point_nine() {
        let query = SkillQuery::by_tags(["review", "quality"], true);
        let score = evaluate_skill(&review_skill(), &query);
        assert!((score.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn and_mode_partial_coverage_scales_by_point_seven() {
        // Short tags keep the later stages quiet; 2 of 3 are covered.
        let s = skill("fx-bot", "FX Bot", "", &["ai", "ml"]);
        let query = SkillQuery::by_tags(["ai", "ml", "fx"], true);
        let score = evaluate_skill(&s, &query);
        assert!((score.confidence - 2.0 / 3.0 * 0.7).abs() < 1e-9);
    }

    #[test]
    fn or_mode_caps_at_point_eight() {
        let query = SkillQuery::by_tags(["review"], false);
        let score = evaluate_skill(&review_skill(), &query);
        assert!((score.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn or_mode_semantic_only_matches_are_penalized() {
        // "ml" covers the "ai" tag only through the synonym group, and
        // is too short to wake the semantic description stage.
        let s = skill("mlops", "Model Ops", "", &["ai"]);
        let query = SkillQuery::by_tags(["ml"], false);
        let score = evaluate_skill(&s, &query);
        assert!((score.confidence - 0.8 * 0.8).abs() < 1e-9);
    }

    #[test]
    fn skill_without_tags_scores_zero_on_tag_stage() {
        let bare = skill("s", "Sum", "", &[]);
        let query = SkillQuery::by_tags(["review"], false);
        let score = evaluate_skill(&bare, &query);
        assert_eq!(score.confidence, 0.0);
    }

    #[test]
    fn exact_keyword_hit_scores_point_eight() {
        let query = SkillQuery::by_keywords(["review"]);
        let score = evaluate_skill(&review_skill(), &query);
        assert!(score.confidence >= 0.8 - 1e-9);
        assert!(score
            .reasons
            .iter()
            .any(|r| r.starts_with("keyword-match-")));
    }

    #[test]
    fn synonym_keyword_scores_through_semantic_path() {
        // "audit" appears nowhere in the skill text, but shares a
        // group with the "review" tag.
        let query = SkillQuery::by_keywords(["audit"]);
        let score = evaluate_skill(&review_skill(), &query);
        assert!(score.confidence > 0.1);
        assert!(score
            .reasons
            .iter()
            .any(|r| r.starts_with("keyword-match-") || r.starts_with("semantic-match-")));
    }

    #[test]
    fn keyword_score_caps_at_point_eight_five() {
        let query = SkillQuery::by_keywords(["review", "quality", "code"]);
        let score = evaluate_skill(&review_skill(), &query);
        assert!(score.confidence <= 0.85 + 1e-9);
    }

    #[test]
    fn fallback_only_runs_when_other_stages_scored_zero() {
        // Shares the literal word "requests" with the description;
        // too short a query for the semantic stage to clear 0.3.
        let bare = skill("handler", "Request Handler", "handles requests", &[]);
        let query = SkillQuery::by_keywords(["qqq", "requests"]);
        let score = evaluate_skill(&bare, &query);
        // keyword stage already matched; fallback must not have replaced it
        assert!(score.reasons.iter().all(|r| !r.starts_with("text-similarity-")));
        assert!(score.confidence > 0.0);
    }

    #[test]
    fn fallback_jaccard_caps_at_point_six() {
        // Only a skill id is given, so stages 2-4 never run and the id
        // does not equal the skill's. Word overlap alone carries it.
        let s = skill("proc-1", "data processing service", "", &[]);
        let query = SkillQuery::by_skill_id("data processing");
        let score = evaluate_skill(&s, &query);
        assert!((score.confidence - 0.6).abs() < 1e-9);
        assert_eq!(score.reasons, vec!["text-similarity-0.60"]);
    }

    #[test]
    fn weak_fallback_below_threshold_is_dropped() {
        let s = skill("s-1", "cat dog", "", &[]);
        let query = SkillQuery::by_skill_id("concatenate");
        let score = evaluate_skill(&s, &query);
        assert_eq!(score.confidence, 0.0);
    }

    #[test]
    fn no_criteria_scores_zero() {
        let score = evaluate_skill(&review_skill(), &SkillQuery::default());
        assert_eq!(score.confidence, 0.0);
        assert!(score.reasons.is_empty());
    }
}
