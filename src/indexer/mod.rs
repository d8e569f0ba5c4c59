
use tracing::{debug, info};

use crate::documents::{ChunkingConfig, build_documents, chunk_documents};
use crate::embeddings::Embedder;
use crate::index::{InMemoryIndex, ScoredChunk, VectorIndex};
use crate::table::Table;
use crate::{AssistantError, Result};

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 50;

/// A built similarity index together with the identity of the embedder it
/// was built with. Rebuilt from scratch whenever the table changes; never
/// updated incrementally.
pub struct SessionIndex {
    index: Box<dyn VectorIndex>,
    embedder_id: String,
}

impl std::fmt::Debug for SessionIndex {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIndex")
            .field("chunk_count", &self.index.len())
            .field("embedder_id", &self.embedder_id)
            .finish()
    }
}

impl SessionIndex {
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn embedder_id(&self) -> &str {
        &self.embedder_id
    }

    /// Retrieve the `k` chunks most similar to the question, most similar
    /// first. The question is embedded with the caller's embedder, which
    /// must be the same model the index was built with; a different model
    /// is a guarded logic error, not something silently tolerated.
    #[inline]
    pub fn query(&self, embedder: &impl Embedder, question: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if embedder.model_id() != self.embedder_id {
            return Err(AssistantError::RetrievalMismatch(format!(
                "Index was built with embedding model '{}' but the question was embedded with '{}'",
                self.embedder_id,
                embedder.model_id()
            )));
        }

        let mut vectors = embedder
            .embed_batch(std::slice::from_ref(&question.to_string()))
            .map_err(|e| AssistantError::Other(e.context("Failed to embed question")))?;

        let vector = vectors.pop().ok_or_else(|| {
            AssistantError::Other(anyhow::anyhow!(
                "Embedding service returned no vector for the question"
            ))
        })?;

        let results = self.index.search(&vector, k)?;
        debug!(
            "Retrieved {} chunks for question ({} chars)",
            results.len(),
            question.len()
        );
        Ok(results)
    }
}

/// Builds a [`SessionIndex`] from a cleaned table: rows are rendered to
/// documents, split into chunks, embedded in batches, and stored.
pub struct Indexer<E> {
    embedder: E,
    chunking: ChunkingConfig,
    batch_size: usize,
}

impl<E: Embedder> Indexer<E> {
    #[inline]
    pub fn new(embedder: E, chunking: ChunkingConfig, batch_size: u32) -> Self {
        Self {
            embedder,
            chunking,
            batch_size: batch_size.max(1) as usize,
        }
    }

    #[inline]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    #[inline]
    pub fn build(&self, table: &Table) -> Result<SessionIndex> {
        self.build_with_progress(table, |_, _| {})
    }

    /// Build the index, reporting `(completed_batches, total_batches)`
    /// after each embedding batch. Batches are issued sequentially; any
    /// failing batch aborts the whole build and no partial index is
    /// returned.
    #[inline]
    pub fn build_with_progress(
        &self,
        table: &Table,
        mut on_batch: impl FnMut(usize, usize),
    ) -> Result<SessionIndex> {
        let documents = build_documents(table);
        let chunks = chunk_documents(&documents, &self.chunking);

        info!(
            "Indexing {} rows as {} chunks (batch size {})",
            table.row_count(),
            chunks.len(),
            self.batch_size
        );

        let total_batches = chunks.len().div_ceil(self.batch_size);
        let mut index = InMemoryIndex::new();

        for (batch_number, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();

            let vectors = self.embedder.embed_batch(&texts).map_err(|e| {
                AssistantError::IndexBuild(format!(
                    "Embedding batch {} of {} failed: {:#}",
                    batch_number + 1,
                    total_batches,
                    e
                ))
            })?;

            if vectors.len() != batch.len() {
                return Err(AssistantError::IndexBuild(format!(
                    "Embedding batch {} of {} returned {} vectors for {} chunks",
                    batch_number + 1,
                    total_batches,
                    vectors.len(),
                    batch.len()
                )));
            }

            for (chunk, vector) in batch.iter().zip(vectors) {
                index.add(chunk.clone(), vector)?;
            }

            on_batch(batch_number + 1, total_batches);
        }

        info!("Index built: {} chunks stored", index.len());
        Ok(SessionIndex {
            index: Box::new(index),
            embedder_id: self.embedder.model_id().to_string(),
        })
    }
}
