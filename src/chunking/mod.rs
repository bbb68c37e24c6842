//! Chunking of composed event texts into retrievable units.
//!
//! Every chunk carries the full provenance of its source event so that a retrieved
//! chunk can be cited without looking anything else up.

pub mod recursive;

pub use recursive::{split_text, DEFAULT_SEPARATORS};

use crate::error::{PulsError, Result};
use crate::events::{non_blank, EventRecord};
use recursive::char_len;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Provenance of a chunk: the source event plus the chunk's position within it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub uid: Option<String>,
    pub title: String,
    pub date_debut: String,
    pub date_fin: String,
    pub lieu: String,
    pub adresse: String,
    pub ville: String,
    pub tarifs: String,
    pub url: String,
    pub keywords: Vec<String>,
    /// Position of this chunk among its siblings, `0 <= chunk_index < total_chunks`.
    pub chunk_index: usize,
    pub total_chunks: usize,
}

impl ChunkMetadata {
    /// Metadata for the single chunk of `event`; `default_city` fills a missing city.
    pub fn for_event(event: &EventRecord, default_city: &str) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();

        Self {
            uid: event.uid.clone(),
            title: text(&event.title),
            date_debut: text(&event.date_debut),
            date_fin: text(&event.date_fin),
            lieu: text(&event.lieu),
            adresse: text(&event.adresse),
            ville: non_blank(&event.ville).unwrap_or(default_city).to_string(),
            tarifs: text(&event.tarifs),
            url: text(&event.url),
            keywords: event.keywords().to_vec(),
            chunk_index: 0,
            total_chunks: 1,
        }
    }
}

/// A bounded slice of an event's composed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Size limits for chunking, in characters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    max_size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    /// Create a config; the overlap must be smaller than the chunk size.
    pub fn new(max_size: usize, overlap: usize) -> Result<Self> {
        if max_size == 0 {
            return Err(PulsError::InvalidInput("chunk size must be positive".to_string()));
        }
        if overlap >= max_size {
            return Err(PulsError::InvalidInput(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, max_size
            )));
        }
        Ok(Self { max_size, overlap })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_size: 500,
            overlap: 50,
        }
    }
}

/// Split `text` into chunks that all share `metadata` apart from their indices.
pub fn chunk_text(text: &str, metadata: &ChunkMetadata, config: &ChunkingConfig) -> Vec<Chunk> {
    let pieces = if char_len(text) <= config.max_size {
        vec![text.to_string()]
    } else {
        split_text(text, DEFAULT_SEPARATORS, config.max_size, config.overlap)
    };

    let total_chunks = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| Chunk {
            text,
            metadata: ChunkMetadata {
                chunk_index,
                total_chunks,
                ..metadata.clone()
            },
        })
        .collect()
}

/// Save the processed corpus as a JSON array of chunks.
pub fn save_chunks(chunks: &[Chunk], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(chunks)?)?;
    info!("Saved {} chunks to {:?}", chunks.len(), path);
    Ok(())
}

/// Load a processed corpus.
pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let content = std::fs::read_to_string(path)?;
    let chunks: Vec<Chunk> = serde_json::from_str(&content)?;
    info!("Loaded {} chunks from {:?}", chunks.len(), path);
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ChunkMetadata {
        ChunkMetadata::for_event(
            &EventRecord {
                uid: Some("42".to_string()),
                title: Some("Nuit des musées".to_string()),
                url: Some("https://openagenda.com/e/nuit".to_string()),
                keywords: Some(vec!["musée".to_string()]),
                ..Default::default()
            },
            "Lille",
        )
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("Court texte", &metadata(), &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Court texte");
        assert_eq!(chunks[0].metadata.chunk_index, 0);
        assert_eq!(chunks[0].metadata.total_chunks, 1);
    }

    #[test]
    fn test_text_exactly_max_size_is_not_split() {
        let text = "a".repeat(500);
        let chunks = chunk_text(&text, &metadata(), &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn test_long_text_chunks_share_metadata() {
        let text = "Une exposition de photographies contemporaines. ".repeat(40);
        let chunks = chunk_text(&text, &metadata(), &ChunkingConfig::default());

        assert!(chunks.len() >= 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_index, i);
            assert_eq!(chunk.metadata.total_chunks, chunks.len());
            assert_eq!(chunk.metadata.title, "Nuit des musées");
            assert_eq!(chunk.metadata.uid.as_deref(), Some("42"));
            assert!(chunk.text.chars().count() <= 500);
        }
    }

    #[test]
    fn test_rechunking_is_deterministic() {
        let text = "Atelier cirque pour petits et grands.\n".repeat(50);
        let config = ChunkingConfig::new(200, 30).unwrap();
        assert_eq!(
            chunk_text(&text, &metadata(), &config),
            chunk_text(&text, &metadata(), &config)
        );
    }

    #[test]
    fn test_missing_city_uses_default() {
        assert_eq!(metadata().ville, "Lille");
    }

    #[test]
    fn test_invalid_config() {
        assert!(ChunkingConfig::new(0, 0).is_err());
        assert!(ChunkingConfig::new(100, 100).is_err());
        assert!(ChunkingConfig::new(100, 99).is_ok());
    }

    #[test]
    fn test_corpus_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.json");
        let chunks = chunk_text("Concert gratuit", &metadata(), &ChunkingConfig::default());

        save_chunks(&chunks, &path).unwrap();
        assert_eq!(load_chunks(&path).unwrap(), chunks);
    }
}
