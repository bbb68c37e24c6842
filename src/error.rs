//! Error types for Puls.

use thiserror::Error;

/// Library-level error type for Puls operations.
#[derive(Error, Debug)]
pub enum PulsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Embedding service rate limit reached: {0}")]
    RateLimited(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// The persisted index and metadata do not belong together. Re-run `puls index`.
    #[error("Corrupted or mismatched vector store: {0}. Rebuild it with 'puls index'.")]
    IndexMismatch(String),

    #[error("RAG error: {0}")]
    Rag(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Chatbot is not initialized")]
    NotInitialized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Metadata encoding error: {0}")]
    MetadataEncode(#[from] rmp_serde::encode::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Puls operations.
pub type Result<T> = std::result::Result<T, PulsError>;
