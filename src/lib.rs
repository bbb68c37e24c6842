//! Puls - Cultural events assistant
//!
//! Retrieval-augmented question answering over a city's cultural agenda.
//!
//! # Overview
//!
//! Puls allows you to:
//! - Clean, filter and chunk raw agenda events
//! - Embed the chunks and persist them in a flat cosine-similarity index
//! - Ask questions in conversation and get answers grounded in the indexed events
//! - Serve conversations over HTTP, one session per conversation
//!
//! # Architecture
//!
//! - `config` - Configuration management and prompt templates
//! - `events` - Raw event records and validation
//! - `processing` - Normalization, event text composition and filtering
//! - `chunking` - Recursive character splitting with overlap
//! - `embedding` - Batched embedding with pacing and rate-limit retries
//! - `vector_store` - Flat index plus metadata, saved as two files
//! - `rag` - Engine, sessions, conversational memory and the chatbot lifecycle
//! - `orchestrator` - Build pipeline coordination
//! - `evaluation` - Keyword-based evaluation of answers
//!
//! # Example
//!
//! ```rust,no_run
//! use puls::config::Settings;
//! use puls::rag::Chatbot;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut chatbot = Chatbot::new(Settings::load()?);
//!     chatbot.initialize()?;
//!
//!     let response = chatbot.ask("Quels concerts ce week-end ?").await?;
//!     println!("{}", response.format_for_display());
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod evaluation;
pub mod events;
pub mod openai;
pub mod orchestrator;
pub mod processing;
pub mod rag;
pub mod vector_store;

pub use error::{PulsError, Result};
