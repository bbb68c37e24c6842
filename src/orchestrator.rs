//! Pipeline orchestrator for Puls.
//!
//! Coordinates the build: raw events to processed chunks (`process`), then processed
//! chunks to a saved vector store (`index`).

use crate::chunking::{load_chunks, save_chunks, Chunk};
use crate::config::Settings;
use crate::embedding::{EmbeddingGenerator, MistralEmbedder};
use crate::error::{PulsError, Result};
use crate::events::load_events;
use crate::openai;
use crate::processing::{EventProcessor, ProcessReport};
use crate::vector_store::VectorStore;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// Outcome of an indexing run.
#[derive(Debug, Clone, Serialize)]
pub struct IndexResult {
    pub chunks_indexed: usize,
    pub model: String,
    pub dimension: usize,
    pub path: PathBuf,
}

/// The main orchestrator for the Puls build pipeline.
pub struct Orchestrator {
    settings: Settings,
    processor: EventProcessor,
}

impl Orchestrator {
    pub fn new(settings: Settings) -> Result<Self> {
        let processor = EventProcessor::from_settings(&settings)?;
        Ok(Self {
            settings,
            processor,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Embedding generator for the configured remote model.
    pub fn embedding_generator(&self) -> Result<EmbeddingGenerator> {
        let api_key = openai::api_key()?;
        let embedder = Arc::new(MistralEmbedder::new(&self.settings.embedding, &api_key)?);
        Ok(EmbeddingGenerator::from_settings(embedder, &self.settings.embedding))
    }

    /// Turn the raw events file into the processed corpus.
    #[instrument(skip(self))]
    pub fn process(&self) -> Result<ProcessReport> {
        let raw_path = self.settings.raw_events_path();
        let events = load_events(&raw_path)?;

        let (chunks, report) = self.processor.process(&events);
        save_chunks(&chunks, &self.settings.processed_path())?;

        Ok(report)
    }

    /// Embed the processed corpus and save the vector store. Nothing is written unless
    /// every chunk was embedded.
    #[instrument(skip_all)]
    pub async fn index<F>(&self, embeddings: &EmbeddingGenerator, on_progress: F) -> Result<IndexResult>
    where
        F: FnMut(usize) + Send,
    {
        let chunks = load_chunks(&self.settings.processed_path())?;
        let store = build_store(chunks, embeddings, on_progress).await?;

        let path = self.settings.vector_store_path();
        store.save(&path)?;

        Ok(IndexResult {
            chunks_indexed: store.len(),
            model: store.model().to_string(),
            dimension: store.dimension(),
            path,
        })
    }
}

/// Embed `chunks` and build a store from them.
pub async fn build_store<F>(
    chunks: Vec<Chunk>,
    embeddings: &EmbeddingGenerator,
    on_progress: F,
) -> Result<VectorStore>
where
    F: FnMut(usize) + Send,
{
    if chunks.is_empty() {
        return Err(PulsError::InvalidInput(
            "No chunks to index. Run 'puls process' first.".to_string(),
        ));
    }

    info!("Generating embeddings for {} chunks", chunks.len());
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embeddings.embed_with_progress(&texts, on_progress).await?;

    VectorStore::build(
        embeddings.model(),
        embeddings.embedder().dimensions(),
        chunks,
        &vectors,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::{FlakyEmbedder, KeywordEmbedder};
    use crate::embedding::RetryPolicy;
    use crate::events::{save_events, EventRecord};

    fn settings(dir: &std::path::Path) -> Settings {
        let mut settings = Settings::default();
        settings.events.raw_path = dir.join("raw/events.json").to_string_lossy().into_owned();
        settings.events.processed_path = dir.join("processed/documents.json").to_string_lossy().into_owned();
        settings.vector_store.path = dir.join("vector_store").to_string_lossy().into_owned();
        settings
    }

    fn events() -> Vec<EventRecord> {
        vec![
            EventRecord {
                uid: Some("1".to_string()),
                title: Some("Jazz au Splendid".to_string()),
                description: Some("Un concert de jazz manouche en soirée".to_string()),
                ..Default::default()
            },
            EventRecord {
                uid: Some("2".to_string()),
                title: Some("Trop court".to_string()),
                description: Some("Bref".to_string()),
                ..Default::default()
            },
            EventRecord {
                uid: Some("3".to_string()),
                title: Some("Cirque".to_string()),
                description: Some("Un spectacle de cirque pour toute la famille".to_string()),
                ..Default::default()
            },
        ]
    }

    fn generator(embedder: Arc<dyn crate::embedding::Embedder>) -> EmbeddingGenerator {
        EmbeddingGenerator::new(embedder).with_policy(RetryPolicy::default().without_delays())
    }

    #[tokio::test]
    async fn test_process_then_index() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        save_events(&events(), &settings.raw_events_path()).unwrap();

        let orchestrator = Orchestrator::new(settings.clone()).unwrap();
        let report = orchestrator.process().unwrap();
        assert_eq!(report.kept_events, 2);
        assert_eq!(report.rejected_events, 1);

        let embeddings = generator(Arc::new(KeywordEmbedder::new(&["jazz", "cirque"])));
        let mut progress = Vec::new();
        let result = orchestrator
            .index(&embeddings, |done| progress.push(done))
            .await
            .unwrap();

        assert_eq!(result.chunks_indexed, 2);
        assert_eq!(progress.last(), Some(&2));

        let store = VectorStore::load(&settings.vector_store_path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.chunks()[0].metadata.uid.as_deref(), Some("1"));
        assert_eq!(store.chunks()[1].metadata.uid.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_failed_embedding_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        save_events(&events(), &settings.raw_events_path()).unwrap();

        let orchestrator = Orchestrator::new(settings.clone()).unwrap();
        orchestrator.process().unwrap();

        let failing = FlakyEmbedder::new(
            KeywordEmbedder::new(&["jazz"]),
            vec![PulsError::Embedding("quota exceeded".to_string())],
        );
        let result = orchestrator.index(&generator(Arc::new(failing)), |_| {}).await;

        assert!(result.is_err());
        assert!(!VectorStore::exists(&settings.vector_store_path()));
    }

    #[tokio::test]
    async fn test_empty_corpus_is_rejected() {
        let embeddings = generator(Arc::new(KeywordEmbedder::new(&["jazz"])));
        let result = build_store(Vec::new(), &embeddings, |_| {}).await;
        assert!(matches!(result, Err(PulsError::InvalidInput(_))));
    }
}
