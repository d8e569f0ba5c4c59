#[cfg(test)]
mod tests;

use tracing::debug;

use crate::documents::Chunk;
use crate::{AssistantError, Result};

/// A chunk returned from a similarity search, with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity in [-1, 1]; higher is more similar.
    pub score: f32,
}

/// Similarity-searchable collection of (chunk, vector) pairs. Any
/// concrete nearest-neighbor implementation satisfies this; the pipeline
/// only ever adds pairs and searches.
pub trait VectorIndex {
    fn add(&mut self, chunk: Chunk, vector: Vec<f32>) -> Result<()>;

    /// The `k` most similar chunks, ordered by similarity descending.
    /// Ties break toward the chunk added earlier (stable). Fewer than `k`
    /// stored chunks returns all of them.
    fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exact in-memory index scanning every stored vector with cosine
/// similarity. Sessions are single-user and indices live only for the
/// session, so a linear scan is the whole story.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    entries: Vec<(Chunk, Vec<f32>)>,
    dimension: Option<usize>,
}

impl InMemoryIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorIndex for InMemoryIndex {
    #[inline]
    fn add(&mut self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        if vector.is_empty() {
            return Err(AssistantError::IndexBuild(
                "Refusing to store an empty embedding vector".to_string(),
            ));
        }
        match self.dimension {
            None => self.dimension = Some(vector.len()),
            Some(dimension) if dimension != vector.len() => {
                return Err(AssistantError::IndexBuild(format!(
                    "Embedding dimension changed mid-build: expected {}, got {}",
                    dimension,
                    vector.len()
                )));
            }
            Some(_) => {}
        }
        self.entries.push((chunk, vector));
        Ok(())
    }

    #[inline]
    fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if let Some(dimension) = self.dimension {
            if vector.len() != dimension {
                return Err(AssistantError::RetrievalMismatch(format!(
                    "Query vector has {} dimensions but the index was built with {}",
                    vector.len(),
                    dimension
                )));
            }
        }

        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|(chunk, stored)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(vector, stored),
            })
            .collect();

        // Stable sort keeps insertion order for equal scores.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);

        debug!("Search returned {} of {} chunks", scored.len(), self.entries.len());
        Ok(scored)
    }

    #[inline]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Cosine similarity of two equal-length vectors; 0 when either has zero
/// magnitude.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}
