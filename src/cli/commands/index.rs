//! Index command implementation.

use crate::chunking::load_chunks;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the index command.
pub async fn run_index(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'puls doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let embeddings = orchestrator.embedding_generator()?;

    let total = load_chunks(&orchestrator.settings().processed_path())?.len();
    let progress = Output::progress_bar(total as u64, "embedding chunks");

    let result = orchestrator
        .index(&embeddings, |done| progress.set_position(done as u64))
        .await;
    progress.finish_and_clear();

    match result {
        Ok(result) => {
            Output::success(&format!("Indexed {} chunks", result.chunks_indexed));
            Output::kv("Embedding model", &result.model);
            Output::kv("Dimensions", &result.dimension.to_string());
            Output::kv("Saved to", &result.path.display().to_string());
            Output::info("Try it: puls search \"concert ce week-end\"");
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Indexing failed, nothing was saved: {}", e));
            Err(e.into())
        }
    }
}
