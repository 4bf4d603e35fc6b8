//! Prompt/response protocol shared by every ranking backend.
//!
//! The only identifier exchanged with the model is the 1-based position of a
//! candidate in the numbered listing. The model is asked for a JSON array of
//! those positions, most relevant first.
//!
//! Parsing is loose about surrounding prose and strict about the
//! array itself: the first `[n, n, ...]` run anywhere in the reply is taken
//! and decoded as JSON. Anything else is a [`ScoutError::Parse`], which
//! callers turn into an empty ranking.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::error::{Result, ScoutError};
use crate::models::{Document, ROOT_LABEL};

static INDEX_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[\d,\s]+\]").expect("static regex"));

/// Score given to the top-ranked document.
pub const TOP_SCORE: u32 = 100;
/// Score drop between consecutive ranks.
pub const SCORE_STEP: u32 = 5;

/// Domain framing placed around the query and listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptProfile {
    /// Opening sentence establishing the model's expertise.
    pub persona: String,
    /// Vocabulary the model should consider when matching.
    pub hints: Vec<String>,
}

impl Default for PromptProfile {
    fn default() -> Self {
        Self {
            persona: "You are an expert in Orthodox Christianity, Byzantine music, and liturgical documents."
                .to_string(),
            hints: vec![
                "Saint feast days and names".to_string(),
                "Liturgical seasons (Great Lent, Nativity, Pascha, etc.)".to_string(),
                "Byzantine musical notation terms".to_string(),
                "Service types (Orthros, Vespers, Liturgy, etc.)".to_string(),
                "Church calendar dates".to_string(),
            ],
        }
    }
}

/// Render candidates as `N. "name" in folder "folder"`, one per line.
pub fn numbered_listing(candidates: &[Document]) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let folder = if doc.folder.is_empty() {
                ROOT_LABEL
            } else {
                doc.folder.as_str()
            };
            format!("{}. \"{}\" in folder \"{}\"", i + 1, doc.name, folder)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the ranking prompt for a query and a numbered listing.
pub fn build_prompt(query: &str, listing: &str, profile: &PromptProfile) -> String {
    let hints = profile
        .hints
        .iter()
        .map(|h| format!("- {}", h))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{persona}\n\n\
         User's search query: \"{query}\"\n\n\
         Available PDF documents:\n\
         {listing}\n\n\
         Task: Analyze the user's query and identify which PDFs are most relevant. Consider:\n\
         {hints}\n\n\
         Respond ONLY with a JSON array of document numbers (1-based index) in order of relevance.\n\
         Example: [5, 12, 3, 8]\n\n\
         If no documents match, respond with an empty array: []",
        persona = profile.persona,
        query = query,
        listing = listing,
        hints = hints,
    )
}

/// Pull the first bracketed integer list out of a model reply.
///
/// Entries too large for `u64` are dropped here; only a malformed array is
/// an error.
pub fn parse_indices(reply: &str) -> Result<Vec<u64>> {
    let m = INDEX_ARRAY
        .find(reply)
        .ok_or_else(|| ScoutError::Parse("no index array in reply".to_string()))?;

    let values = serde_json::from_str::<Vec<serde_json::Value>>(m.as_str())
        .map_err(|e| ScoutError::Parse(format!("invalid index array {}: {}", m.as_str(), e)))?;

    Ok(values.iter().filter_map(serde_json::Value::as_u64).collect())
}

/// Map 1-based indices onto candidates and assign descending scores.
///
/// Indices outside `1..=candidates.len()` are dropped, as are repeats of an
/// index already taken. Survivors keep the order the model gave them.
pub fn resolve_ranking(indices: &[u64], candidates: &[Document]) -> Vec<Document> {
    let mut taken = HashSet::new();

    indices
        .iter()
        .filter_map(|&i| {
            let pos = usize::try_from(i).ok()?.checked_sub(1)?;
            let doc = candidates.get(pos)?;
            taken.insert(pos).then_some(doc)
        })
        .enumerate()
        .map(|(rank, doc)| {
            let mut doc = doc.clone();
            doc.relevance_score = Some(score_for_rank(rank));
            doc
        })
        .collect()
}

/// Synthetic score for a 0-based rank: 100, 95, 90, ... floored at 0.
pub fn score_for_rank(rank: usize) -> u32 {
    let step = u32::try_from(rank)
        .unwrap_or(u32::MAX)
        .saturating_mul(SCORE_STEP);
    TOP_SCORE.saturating_sub(step)
}

/// Turn a model reply into a ranking. Unreadable replies rank nothing.
pub fn interpret_reply(reply: &str, candidates: &[Document]) -> Vec<Document> {
    match parse_indices(reply) {
        Ok(indices) => {
            let ranked = resolve_ranking(&indices, candidates);
            if ranked.len() < indices.len() {
                tracing::debug!(
                    returned = indices.len(),
                    kept = ranked.len(),
                    "dropped out-of-range or repeated indices"
                );
            }
            ranked
        }
        Err(e) => {
            let preview: String = reply.chars().take(200).collect();
            tracing::warn!(error = %e, reply = %preview, "could not parse ranking reply");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn docs(n: usize) -> Vec<Document> {
        (1..=n)
            .map(|i| Document {
                id: format!("id{}", i),
                name: format!("doc{}.pdf", i),
                folder: if i == 1 {
                    ROOT_LABEL.to_string()
                } else {
                    "Feasts".to_string()
                },
                full_path: String::new(),
                view_link: String::new(),
                download_link: String::new(),
                size_bytes: 0,
                modified_at: Utc::now(),
                relevance_score: None,
                excerpt: None,
            })
            .collect()
    }

    fn ids(ranked: &[Document]) -> Vec<&str> {
        ranked.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn listing_is_one_based() {
        let listing = numbered_listing(&docs(2));
        assert_eq!(
            listing,
            "1. \"doc1.pdf\" in folder \"Root\"\n2. \"doc2.pdf\" in folder \"Feasts\""
        );
    }

    #[test]
    fn prompt_carries_query_listing_and_hints() {
        let prompt = build_prompt("Pascha matins", "1. \"a\" in folder \"Root\"", &PromptProfile::default());
        assert!(prompt.contains("User's search query: \"Pascha matins\""));
        assert!(prompt.contains("1. \"a\" in folder \"Root\""));
        assert!(prompt.contains("- Service types (Orthros, Vespers, Liturgy, etc.)"));
        assert!(prompt.contains("respond with an empty array: []"));
    }

    #[test]
    fn custom_profile_replaces_domain_vocabulary() {
        let profile = PromptProfile {
            persona: "You are a contracts paralegal.".into(),
            hints: vec!["Counterparty names".into()],
        };
        let prompt = build_prompt("NDA", "", &profile);
        assert!(prompt.starts_with("You are a contracts paralegal."));
        assert!(prompt.contains("- Counterparty names"));
        assert!(!prompt.contains("Byzantine"));
    }

    #[test]
    fn resolves_indices_in_model_order() {
        let candidates = docs(5);
        let ranked = interpret_reply("[3,1]", &candidates);
        assert_eq!(ids(&ranked), vec!["id3", "id1"]);
        assert_eq!(ranked[0].relevance_score, Some(100));
        assert_eq!(ranked[1].relevance_score, Some(95));
    }

    #[test]
    fn out_of_range_indices_are_dropped() {
        let candidates = docs(5);
        let ranked = interpret_reply("[2, 99, 1]", &candidates);
        assert_eq!(ids(&ranked), vec!["id2", "id1"]);
        assert_eq!(ranked[0].relevance_score, Some(100));
        assert_eq!(ranked[1].relevance_score, Some(95));

        let ranked = interpret_reply("[0, 4]", &candidates);
        assert_eq!(ids(&ranked), vec!["id4"]);
    }

    #[test]
    fn index_beyond_u64_drops_only_that_entry() {
        assert_eq!(
            parse_indices("[2, 99999999999999999999, 1]").unwrap(),
            vec![2, 1]
        );

        let ranked = interpret_reply("[2, 99999999999999999999, 1]", &docs(5));
        assert_eq!(ids(&ranked), vec!["id2", "id1"]);
        assert_eq!(ranked[0].relevance_score, Some(100));
        assert_eq!(ranked[1].relevance_score, Some(95));
    }

    #[test]
    fn surrounding_prose_is_ignored() {
        let candidates = docs(5);
        let reply = "Sure! Based on the query, the most relevant are:\n```json\n[5, 2]\n```\nHope this helps.";
        assert_eq!(ids(&interpret_reply(reply, &candidates)), vec!["id5", "id2"]);
    }

    #[test]
    fn prose_without_array_ranks_nothing() {
        let candidates = docs(5);
        assert!(interpret_reply("I could not find anything relevant.", &candidates).is_empty());
        assert!(interpret_reply("[]", &candidates).is_empty());
    }

    #[test]
    fn malformed_array_is_a_parse_error() {
        assert!(matches!(parse_indices("[1,,2]"), Err(ScoutError::Parse(_))));
        assert!(matches!(parse_indices("[1, 2,]"), Err(ScoutError::Parse(_))));
        assert!(interpret_reply("[1,,2]", &docs(3)).is_empty());
    }

    #[test]
    fn first_array_wins() {
        assert_eq!(parse_indices("[4] then [1, 2]").unwrap(), vec![4]);
    }

    #[test]
    fn repeated_indices_keep_first_occurrence() {
        let ranked = interpret_reply("[2, 2, 1]", &docs(3));
        assert_eq!(ids(&ranked), vec!["id2", "id1"]);
        assert_eq!(ranked[1].relevance_score, Some(95));
    }

    #[test]
    fn scores_floor_at_zero() {
        assert_eq!(score_for_rank(0), 100);
        assert_eq!(score_for_rank(19), 5);
        assert_eq!(score_for_rank(20), 0);
        assert_eq!(score_for_rank(500), 0);
    }

    #[test]
    fn ranking_leaves_candidates_untouched() {
        let candidates = docs(3);
        let _ = interpret_reply("[1]", &candidates);
        assert!(candidates.iter().all(|d| d.relevance_score.is_none()));
    }
}
