//! Vector store for Puls.
//!
//! A [`FlatIndex`] of normalized embeddings kept in lockstep with the chunks they were
//! computed from: row `i` of the index belongs to `chunks[i]`.

mod flat;
mod persist;

pub use flat::{l2_normalize, FlatIndex};
pub use persist::{INDEX_FILE, METADATA_FILE};

use crate::chunking::Chunk;
use crate::error::{PulsError, Result};
use serde::Serialize;
use tracing::{debug, info};

/// A retrieved chunk with its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    /// Similarity score in [-1, 1], higher is better.
    pub score: f32,
}

/// Chunks and their embeddings, searchable by similarity.
#[derive(Debug, Clone)]
pub struct VectorStore {
    model: String,
    index: FlatIndex,
    chunks: Vec<Chunk>,
}

impl VectorStore {
    /// Build a store from chunks and their embeddings, produced by `model`.
    pub fn build(
        model: &str,
        dimension: usize,
        chunks: Vec<Chunk>,
        embeddings: &[Vec<f32>],
    ) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            return Err(PulsError::VectorStore(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let index = FlatIndex::build(dimension, embeddings)?;
        info!("Built vector store with {} vectors of dimension {}", index.len(), dimension);

        Ok(Self {
            model: model.to_string(),
            index,
            chunks,
        })
    }

    /// Embedding model the store was built with.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Fail unless the store was built with `model` at `dimension`.
    pub fn ensure_compatible(&self, model: &str, dimension: usize) -> Result<()> {
        if self.model != model || self.dimension() != dimension {
            return Err(PulsError::IndexMismatch(format!(
                "index built with '{}' ({} dimensions), configured embedding is '{}' ({} dimensions)",
                self.model,
                self.dimension(),
                model,
                dimension
            )));
        }
        Ok(())
    }

    /// The `limit` chunks most similar to `query_embedding`, best first.
    pub fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<RetrievalResult>> {
        let hits = self.index.search(query_embedding, limit)?;
        debug!("Retrieved {} of {} chunks", hits.len(), self.len());

        hits.into_iter()
            .map(|(position, score)| {
                let chunk = self.chunks.get(position).cloned().ok_or_else(|| {
                    PulsError::IndexMismatch(format!("no metadata for index row {}", position))
                })?;
                Ok(RetrievalResult { chunk, score })
            })
            .collect()
    }
}
