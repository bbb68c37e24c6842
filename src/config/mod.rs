//! Configuration module for Puls.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{CondensePrompts, Prompts, RagPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, EventSettings, GeneralSettings, LlmSettings,
    PromptSettings, RagSettings, Settings, VectorStoreSettings,
};
