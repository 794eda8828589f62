//! Client for the external AI ranking collaborator.
//!
//! The collaborator receives the query plus a flattened candidate list and
//! answers with an ordering of candidate IDs, most relevant first. Anything
//! that goes wrong on this path is recovered by the caller via the local
//! scored match, so errors here are ordinary `Err` values, never panics.

use crate::bookmarks::Bookmark;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct AiCandidate {
    pub id: u64,
    pub title: String,
    pub url: String,
    pub category: String,
    pub description: String,
}

impl From<&Bookmark> for AiCandidate {
    fn from(bookmark: &Bookmark) -> Self {
        AiCandidate {
            id: bookmark.id,
            title: bookmark.title.clone(),
            url: bookmark.url.clone(),
            category: bookmark.category.clone(),
            description: bookmark.description.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RankResponse {
    ids: Vec<u64>,
}

/// Seam for the ranking collaborator so the search engine can be exercised
/// without a network.
pub trait AiRanker: Send + Sync {
    fn rank(&self, query: &str, candidates: &[AiCandidate]) -> anyhow::Result<Vec<u64>>;
}

pub struct HttpAiRanker {
    endpoint: String,
    timeout: Duration,
    basic_auth: Option<(String, Option<String>)>,
}

impl HttpAiRanker {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Self {
        let endpoint = endpoint.strip_suffix('/').unwrap_or(endpoint).to_string();

        HttpAiRanker {
            endpoint,
            timeout: Duration::from_secs(timeout_secs),
            basic_auth: None,
        }
    }

    pub fn with_basic_auth(mut self, username: String, password: Option<String>) -> Self {
        self.basic_auth = Some((username, password));
        self
    }
}

impl AiRanker for HttpAiRanker {
    fn rank(&self, query: &str, candidates: &[AiCandidate]) -> anyhow::Result<Vec<u64>> {
        log::debug!(
            "ranking {} candidates against {:?} via {}",
            candidates.len(),
            query,
            self.endpoint
        );

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;

        let mut request = client.post(&self.endpoint).json(&serde_json::json!({
            "query": query,
            "candidates": candidates,
        }));

        if let Some((username, password)) = self.basic_auth.clone() {
            request = request.basic_auth(username, password);
        }

        let response: RankResponse = request.send()?.error_for_status()?.json()?;

        Ok(response.ids)
    }
}
