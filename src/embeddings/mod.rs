pub mod azure;

pub use azure::AzureEmbeddingClient;

use anyhow::Result;

/// Source of fixed-dimension embedding vectors. The pipeline builds the
/// index and embeds questions through this seam, so retrieval can verify
/// it is talking to the same model the index was built with.
pub trait Embedder {
    /// Identity of the embedding model/deployment. Indexing records this;
    /// querying with a different identity is a logic error.
    fn model_id(&self) -> &str;

    /// Embed a batch of texts, one vector per input text, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
