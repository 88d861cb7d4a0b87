//! Brute-force cosine top-k lookup over an in-memory embedding list.
//!
//! This is deliberately not a vector index: the [`StoryIndex`] is a flat
//! list rebuilt from scratch each time, scanned linearly on every query.
//! At corpus sizes of a few hundred chunks that is faster than anything
//! with setup cost, and it keeps the `GET /api/pdf-index` wire shape and
//! the in-memory shape identical.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::embedding::{self, cosine_similarity, EmbeddingProvider};

/// The embedding index: one vector per text, positionally aligned.
///
/// Serializes to exactly the `GET /api/pdf-index` response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryIndex {
    pub embeddings: Vec<Vec<f32>>,
    pub texts: Vec<String>,
}

impl StoryIndex {
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Top-k result of a similarity search, positionally aligned across fields.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHits {
    /// Index of each hit within the [`StoryIndex`].
    pub indices: Vec<usize>,
    /// `1 - cosine_similarity` for each hit, so 0 means identical.
    pub distances: Vec<f32>,
    /// The matched texts.
    pub texts: Vec<String>,
}

/// Embed every text with the configured provider and assemble an index.
pub async fn build_index(
    provider: &dyn EmbeddingProvider,
    config: &EmbeddingConfig,
    texts: Vec<String>,
) -> Result<StoryIndex> {
    let mut embeddings = Vec::with_capacity(texts.len());

    for batch in texts.chunks(config.batch_size.max(1)) {
        let mut vecs = embedding::embed_texts(provider, config, batch).await?;
        embeddings.append(&mut vecs);
    }

    Ok(StoryIndex { embeddings, texts })
}

/// Find the `k` entries most similar to `query_vec`.
///
/// Results are sorted by descending similarity (ties broken by ascending
/// index, so ordering is deterministic), with `distances[i]` equal to
/// `1 - similarity[i]`. A `k` larger than the index returns every entry;
/// `k == 0` returns empty hits.
pub fn search_similar(index: &StoryIndex, query_vec: &[f32], k: usize) -> SearchHits {
    let mut scored: Vec<(usize, f32)> = index
        .embeddings
        .iter()
        .enumerate()
        .map(|(i, emb)| (i, cosine_similarity(query_vec, emb)))
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(k);

    SearchHits {
        indices: scored.iter().map(|(i, _)| *i).collect(),
        distances: scored.iter().map(|(_, sim)| 1.0 - sim).collect(),
        texts: scored.iter().map(|(i, _)| index.texts[*i].clone()).collect(),
    }
}

/// Embed a query and run [`search_similar`] in one step.
pub async fn search_similar_text(
    provider: &dyn EmbeddingProvider,
    config: &EmbeddingConfig,
    index: &StoryIndex,
    query: &str,
    k: usize,
) -> Result<SearchHits> {
    let query_vec = embedding::embed_query(provider, config, query).await?;
    Ok(search_similar(index, &query_vec, k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_index() -> StoryIndex {
        StoryIndex {
            embeddings: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            texts: vec!["east".to_string(), "north".to_string(), "northeast".to_string()],
        }
    }

    #[test]
    fn top1_exact_match_has_zero_distance() {
        let index = fixture_index();
        let hits = search_similar(&index, &[1.0, 0.0], 1);
        assert_eq!(hits.indices, vec![0]);
        assert!(hits.distances[0].abs() < 1e-6);
        assert_eq!(hits.texts, vec!["east"]);
    }

    #[test]
    fn results_sorted_by_descending_similarity() {
        let index = fixture_index();
        let hits = search_similar(&index, &[1.0, 0.0], 3);
        assert_eq!(hits.indices, vec![0, 2, 1]);
        for pair in hits.distances.windows(2) {
            assert!(pair[0] <= pair[1], "distances must be non-decreasing");
        }
    }

    #[test]
    fn distance_is_one_minus_similarity() {
        let index = fixture_index();
        let query = [1.0, 0.0];
        let hits = search_similar(&index, &query, 3);
        for (idx, dist) in hits.indices.iter().zip(hits.distances.iter()) {
            let sim = cosine_similarity(&query, &index.embeddings[*idx]);
            assert!((dist - (1.0 - sim)).abs() < 1e-6);
        }
    }

    #[test]
    fn k_larger_than_index_returns_all() {
        let index = fixture_index();
        let hits = search_similar(&index, &[0.5, 0.5], 10);
        assert_eq!(hits.indices.len(), 3);
    }

    #[test]
    fn k_zero_returns_empty() {
        let index = fixture_index();
        let hits = search_similar(&index, &[1.0, 0.0], 0);
        assert!(hits.indices.is_empty());
        assert!(hits.distances.is_empty());
        assert!(hits.texts.is_empty());
    }

    #[test]
    fn empty_index_returns_empty() {
        let index = StoryIndex::default();
        let hits = search_similar(&index, &[1.0, 0.0], 5);
        assert!(hits.indices.is_empty());
    }

    #[test]
    fn ties_break_by_ascending_index() {
        let index = StoryIndex {
            embeddings: vec![vec![2.0, 0.0], vec![1.0, 0.0]],
            texts: vec!["a".to_string(), "b".to_string()],
        };
        // Both are colinear with the query: similarity 1.0 for each.
        let hits = search_similar(&index, &[1.0, 0.0], 2);
        assert_eq!(hits.indices, vec![0, 1]);
    }

    #[test]
    fn index_roundtrips_through_wire_json() {
        let index = fixture_index();
        let json = serde_json::to_string(&index).unwrap();
        assert!(json.contains("\"embeddings\""));
        assert!(json.contains("\"texts\""));
        let back: StoryIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back.texts[2], "northeast");
    }
}
