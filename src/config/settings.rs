//! Configuration settings for Puls.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub vector_store: VectorStoreSettings,
    pub rag: RagSettings,
    pub events: EventSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.puls".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Language model settings (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of the chat completions API.
    pub api_base: String,
    /// Model used to compose answers.
    pub model: String,
    pub temperature: f32,
    /// Maximum number of generated tokens per answer.
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.mistral.ai/v1".to_string(),
            model: "mistral-large-latest".to_string(),
            temperature: 0.4,
            max_tokens: 1000,
            top_p: 0.9,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Base URL of the embeddings API.
    pub api_base: String,
    /// Embedding model to use. Must be the same at build and query time.
    pub model: String,
    /// Embedding dimensions produced by the model.
    pub dimensions: u32,
    /// Number of texts sent per request.
    pub batch_size: usize,
    /// Total attempts per batch when rate limited.
    pub max_attempts: u32,
    /// Backoff unit in seconds; attempt n waits n times this value.
    pub retry_backoff_secs: u64,
    /// Pause between successful batches, in milliseconds.
    pub pacing_ms: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.mistral.ai/v1".to_string(),
            model: "mistral-embed".to_string(),
            dimensions: 1024,
            batch_size: 10,
            max_attempts: 3,
            retry_backoff_secs: 10,
            pacing_ms: 1500,
        }
    }
}

/// Text chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Events whose cleaned description is shorter than this are dropped.
    pub min_description_chars: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            min_description_chars: 20,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Directory holding the index file and its metadata file.
    pub path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            path: "~/.puls/vector_store".to_string(),
        }
    }
}

/// RAG (Retrieval-Augmented Generation) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Number of past question/answer turns kept in memory.
    pub memory_window: usize,
    /// Rewrite follow-up questions into standalone ones before retrieval.
    pub condense_question: bool,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            memory_window: 5,
            condense_question: false,
        }
    }
}

/// Event corpus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    /// Raw events produced by the ingestion collaborator.
    pub raw_path: String,
    /// Processed chunk corpus.
    pub processed_path: String,
    /// City the agenda covers, used as a default and for validation.
    pub city: String,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            raw_path: "~/.puls/raw/events.json".to_string(),
            processed_path: "~/.puls/processed/documents.json".to_string(),
            city: "Lille".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::PulsError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("puls")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded vector store directory.
    pub fn vector_store_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.path)
    }

    /// Get the expanded raw events path.
    pub fn raw_events_path(&self) -> PathBuf {
        Self::expand_path(&self.events.raw_path)
    }

    /// Get the expanded processed corpus path.
    pub fn processed_path(&self) -> PathBuf {
        Self::expand_path(&self.events.processed_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_pipeline() {
        let settings = Settings::default();
        assert_eq!(settings.chunking.chunk_size, 500);
        assert_eq!(settings.chunking.chunk_overlap, 50);
        assert_eq!(settings.rag.top_k, 5);
        assert_eq!(settings.rag.memory_window, 5);
        assert_eq!(settings.embedding.model, "mistral-embed");
        assert_eq!(settings.embedding.max_attempts, 3);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [rag]
            top_k = 8

            [events]
            city = "Lyon"
            "#,
        )
        .unwrap();

        assert_eq!(settings.rag.top_k, 8);
        assert_eq!(settings.rag.memory_window, 5);
        assert_eq!(settings.events.city, "Lyon");
        assert_eq!(settings.llm.model, "mistral-large-latest");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.chunking.chunk_size = 800;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.chunking.chunk_size, 800);
    }
}
