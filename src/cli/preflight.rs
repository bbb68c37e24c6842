//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration and build artifacts are available
//! before starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{PulsError, Result};
use crate::openai;
use crate::vector_store::VectorStore;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Processing needs the raw events file.
    Process,
    /// Indexing needs the API key and the processed corpus.
    Index,
    /// Asking, searching and serving need the API key and a built vector store.
    Query,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Process => {
            check_file(&settings.raw_events_path(), "Raw events file")?;
        }
        Operation::Index => {
            openai::api_key()?;
            check_file(&settings.processed_path(), "Processed corpus")
                .map_err(|e| PulsError::Config(format!("{}. Run 'puls process' first.", e)))?;
        }
        Operation::Query => {
            openai::api_key()?;
            if !VectorStore::exists(&settings.vector_store_path()) {
                return Err(PulsError::Config(format!(
                    "No vector store at {:?}. Run 'puls index' first.",
                    settings.vector_store_path()
                )));
            }
        }
    }
    Ok(())
}

fn check_file(path: &std::path::Path, what: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PulsError::Config(format!("{} not found at {:?}", what, path)))
    }
}
