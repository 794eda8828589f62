//! Relevance scoring for the local ranked match.
//!
//! One scoring function is shared by the filter and the sort passes so the
//! inclusion rule and the ranking can never drift apart.

use crate::bookmarks::Bookmark;

/// Strip whitespace and the common in-word separators so that
/// "AI Tools", "ai-tools" and "aitools" all collapse to the same key.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '_' | '.'))
        .collect()
}

/// Score one candidate against a query.
///
/// Independent bonuses, all of which can stack:
/// - 100: the corpus (title + url + category + description, lowercased)
///        contains the whole query as a substring
/// -  80: the normalized corpus contains the normalized query
/// -  60: every whitespace-separated term matches (plain or normalized)
/// -  20: at least one term matches
/// -  30: the title alone (plain or normalized) contains the query
///
/// A candidate belongs in the result set iff its score is positive.
pub fn score(query: &str, bookmark: &Bookmark) -> u32 {
    let query = query.to_lowercase();

    let corpus = [
        bookmark.title.as_str(),
        bookmark.url.as_str(),
        bookmark.category.as_str(),
        bookmark.description.as_deref().unwrap_or(""),
    ]
    .join(" ")
    .to_lowercase();

    let norm_corpus = normalize(&corpus);
    let norm_query = normalize(&query);

    let terms: Vec<&str> = query.split_whitespace().collect();
    let term_matches =
        |term: &&str| corpus.contains(*term) || norm_corpus.contains(&normalize(term));

    let mut score = 0;

    if corpus.contains(&query) {
        score += 100;
    }

    if norm_corpus.contains(&norm_query) {
        score += 80;
    }

    if !terms.is_empty() && terms.iter().all(term_matches) {
        score += 60;
    }

    if terms.iter().any(term_matches) {
        score += 20;
    }

    let title = bookmark.title.to_lowercase();
    if title.contains(&query) || normalize(&title).contains(&norm_query) {
        score += 30;
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bookmark(title: &str, url: &str, category: &str, description: Option<&str>) -> Bookmark {
        Bookmark {
            id: 0,
            user_id: "u1".to_string(),
            url: url.to_string(),
            title: title.to_string(),
            category: category.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
            last_reminded_at: None,
            reminder_dismissed: false,
        }
    }

    #[test]
    fn normalize_strips_separators() {
        assert_eq!(normalize("AI Tools"), "AITools");
        assert_eq!(normalize("ai-tools_v2.1"), "aitoolsv21");
        assert_eq!(normalize("  spaced\tout "), "spacedout");
    }

    #[test]
    fn exact_title_match_scores_maximum() {
        let b = bookmark("rust book", "https://doc.rust-lang.org/book", "Dev", None);
        // full query (100) + normalized (80) + all terms (60) + any term (20)
        // + title (30)
        assert_eq!(score("rust book", &b), 290);
    }

    #[test]
    fn category_only_match_is_loose() {
        let b = bookmark("Weekly Meal Planner", "https://mealie.io", "cooking", None);
        // Only one of the two terms appears, and only in the category.
        assert_eq!(score("cooking torch", &b), 20);
    }

    #[test]
    fn normalized_match_bridges_formatting() {
        let b = bookmark("AI Tools", "https://example.com", "Uncategorized", None);

        // "aitools" only matches after separator stripping.
        let s = score("aitools", &b);
        assert!(s >= 80, "expected normalized bonus, got {s}");

        // Same through a hyphenated query.
        let s = score("ai-tools", &b);
        assert!(s >= 80, "expected normalized bonus, got {s}");
    }

    #[test]
    fn description_is_part_of_the_corpus() {
        let b = bookmark(
            "Some site",
            "https://example.org",
            "Reading",
            Some("long-form journalism archive"),
        );
        assert!(score("journalism", &b) > 0);
        assert_eq!(score("gardening", &b), 0);
    }

    #[test]
    fn unrelated_query_scores_zero() {
        let b = bookmark("Rust Book", "https://doc.rust-lang.org", "Dev", None);
        assert_eq!(score("quantum knitting", &b), 0);
    }
}
