//! Ranked bookmark search.
//!
//! Three modes, picked by the query text alone:
//! - empty / whitespace query: identity (everything, original order)
//! - `ai:` prefix: delegate ordering to the external ranking collaborator,
//!   falling back to the scored local match when it fails
//! - anything else: scored local match
//!
//! Every call is independent; there is no state carried between queries.

pub mod ai;
pub mod score;

pub use ai::{AiCandidate, AiRanker, HttpAiRanker};
pub use score::score;

use crate::bookmarks::Bookmark;
use std::collections::HashSet;

/// Reserved marker routing a query to the AI ranking collaborator.
pub const AI_QUERY_PREFIX: &str = "ai:";

/// Local-only search. Equivalent to [`search_with_ranker`] without a
/// collaborator: `ai:` queries go straight to the scored fallback.
pub fn search(query: &str, bookmarks: &[Bookmark]) -> Vec<Bookmark> {
    search_with_ranker(query, bookmarks, None)
}

pub fn search_with_ranker(
    query: &str,
    bookmarks: &[Bookmark],
    ranker: Option<&dyn AiRanker>,
) -> Vec<Bookmark> {
    if query.trim().is_empty() {
        return bookmarks.to_vec();
    }

    if let Some(rest) = query.strip_prefix(AI_QUERY_PREFIX) {
        let rest = rest.trim();
        if rest.is_empty() {
            // Bare marker: nothing to rank, and not worth a degenerate
            // external call.
            return bookmarks.to_vec();
        }

        if let Some(ranker) = ranker {
            let candidates: Vec<AiCandidate> = bookmarks.iter().map(Into::into).collect();

            match ranker.rank(rest, &candidates) {
                Ok(ids) => {
                    let ordered = reorder_by_ids(bookmarks, &ids);
                    if !ordered.is_empty() {
                        return ordered;
                    }
                    log::debug!("ai ranking returned no usable ids, using scored match");
                }
                Err(err) => {
                    log::warn!("ai ranking failed, using scored match: {err}");
                }
            }
        }

        // Fallback keeps the original query text, marker included.
        return scored(query, bookmarks);
    }

    scored(query, bookmarks)
}

/// Scored local match: score every candidate once, keep positives, sort by
/// score descending. `sort_by_key` is stable, so ties keep collection order.
fn scored(query: &str, bookmarks: &[Bookmark]) -> Vec<Bookmark> {
    let mut hits: Vec<(u32, &Bookmark)> = bookmarks
        .iter()
        .filter_map(|bookmark| {
            let score = score::score(query, bookmark);
            (score > 0).then_some((score, bookmark))
        })
        .collect();

    hits.sort_by_key(|(score, _)| std::cmp::Reverse(*score));

    hits.into_iter().map(|(_, b)| b.clone()).collect()
}

/// Project the collaborator's ID ordering onto the candidate set.
/// Unknown IDs are ignored, duplicates collapse to their first mention, and
/// candidates the collaborator did not mention are dropped.
fn reorder_by_ids(bookmarks: &[Bookmark], ids: &[u64]) -> Vec<Bookmark> {
    let mut seen = HashSet::new();

    ids.iter()
        .filter(|id| seen.insert(**id))
        .filter_map(|id| bookmarks.iter().find(|b| b.id == *id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    fn bookmark(id: u64, title: &str, category: &str) -> Bookmark {
        Bookmark {
            id,
            user_id: "u1".to_string(),
            url: format!("https://example.com/{id}"),
            title: title.to_string(),
            category: category.to_string(),
            description: None,
            created_at: Utc::now(),
            last_reminded_at: None,
            reminder_dismissed: false,
        }
    }

    /// Scripted collaborator: either a canned ID list or a failure, and a
    /// record of the query it was handed.
    struct StubRanker {
        response: anyhow::Result<Vec<u64>>,
        queries: Mutex<Vec<String>>,
    }

    impl StubRanker {
        fn returning(ids: Vec<u64>) -> Self {
            StubRanker {
                response: Ok(ids),
                queries: Mutex::new(vec![]),
            }
        }

        fn failing() -> Self {
            StubRanker {
                response: Err(anyhow::anyhow!("ranking service unavailable")),
                queries: Mutex::new(vec![]),
            }
        }
    }

    impl AiRanker for StubRanker {
        fn rank(&self, query: &str, _candidates: &[AiCandidate]) -> anyhow::Result<Vec<u64>> {
            self.queries.lock().unwrap().push(query.to_string());
            match &self.response {
                Ok(ids) => Ok(ids.clone()),
                Err(err) => Err(anyhow::anyhow!("{err}")),
            }
        }
    }

    #[test]
    fn empty_query_is_identity() {
        let bookmarks = vec![bookmark(1, "b", "x"), bookmark(2, "a", "y")];

        let results = search("", &bookmarks);
        assert_eq!(results, bookmarks);

        let results = search("   \t ", &bookmarks);
        assert_eq!(results, bookmarks);
    }

    #[test]
    fn results_are_ordered_by_score() {
        // A: title equals the query. B: only the category contains one term.
        let a = bookmark(1, "resume tools", "Career");
        let b = bookmark(2, "Unrelated", "tools");
        let bookmarks = vec![b.clone(), a.clone()];

        let results = search("resume tools", &bookmarks);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, a.id);
        assert_eq!(results[1].id, b.id);

        assert!(score("resume tools", &a) >= 180);
        assert!(score("resume tools", &b) <= 20);
    }

    #[test]
    fn ties_keep_collection_order() {
        let first = bookmark(1, "rust guide", "Dev");
        let second = bookmark(2, "rust guide", "Dev");

        let results = search("rust", &[first, second]);
        assert_eq!(results[0].id, 1);
        assert_eq!(results[1].id, 2);
    }

    #[test]
    fn non_matching_candidates_are_excluded() {
        let bookmarks = vec![bookmark(1, "cooking", "Food"), bookmark(2, "rust", "Dev")];

        let results = search("rust", &bookmarks);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 2);
    }

    #[test]
    fn ai_result_reorders_and_drops() {
        let bookmarks = vec![
            bookmark(1, "a", "x"),
            bookmark(2, "b", "x"),
            bookmark(3, "c", "x"),
        ];
        let ranker = StubRanker::returning(vec![2, 1]);

        let results = search_with_ranker("ai:whatever", &bookmarks, Some(&ranker));
        let ids: Vec<u64> = results.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn ai_unknown_ids_are_ignored() {
        let bookmarks = vec![bookmark(1, "a", "x"), bookmark(2, "b", "x")];
        let ranker = StubRanker::returning(vec![99, 2, 2, 42]);

        let results = search_with_ranker("ai:whatever", &bookmarks, Some(&ranker));
        let ids: Vec<u64> = results.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn ai_empty_ids_falls_back_to_scored_match() {
        let bookmarks = vec![bookmark(1, "rust guide", "Dev"), bookmark(2, "cooking", "Food")];
        let ranker = StubRanker::returning(vec![]);

        let results = search_with_ranker("ai:rust guide", &bookmarks, Some(&ranker));
        let expected = search("ai:rust guide", &bookmarks);
        assert_eq!(results, expected);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 1);
    }

    #[test]
    fn ai_failure_falls_back_to_scored_match() {
        let bookmarks = vec![bookmark(1, "rust guide", "Dev"), bookmark(2, "cooking", "Food")];
        let ranker = StubRanker::failing();

        let results = search_with_ranker("ai:rust guide", &bookmarks, Some(&ranker));
        let expected = search("ai:rust guide", &bookmarks);
        assert_eq!(results, expected);
    }

    #[test]
    fn ai_marker_is_stripped_for_the_collaborator() {
        let bookmarks = vec![bookmark(1, "a", "x")];
        let ranker = StubRanker::returning(vec![1]);

        search_with_ranker("ai:resume tools", &bookmarks, Some(&ranker));

        let queries = ranker.queries.lock().unwrap();
        assert_eq!(queries.as_slice(), ["resume tools"]);
    }

    #[test]
    fn bare_ai_marker_short_circuits() {
        let bookmarks = vec![bookmark(1, "a", "x"), bookmark(2, "b", "y")];
        let ranker = StubRanker::failing();

        // Must not reach the collaborator at all.
        let results = search_with_ranker("ai:", &bookmarks, Some(&ranker));
        assert_eq!(results, bookmarks);
        assert!(ranker.queries.lock().unwrap().is_empty());

        let results = search_with_ranker("ai:   ", &bookmarks, Some(&ranker));
        assert_eq!(results, bookmarks);
    }

    #[test]
    fn ai_query_without_ranker_uses_scored_match() {
        let bookmarks = vec![bookmark(1, "rust guide", "Dev"), bookmark(2, "cooking", "Food")];

        // The unstripped query still matches through its loose "guide" term.
        let results = search("ai:rust guide", &bookmarks);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 1);
    }
}
