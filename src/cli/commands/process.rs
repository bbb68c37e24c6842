//! Process command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the process command.
pub fn run_process(input: Option<String>, mut settings: Settings) -> Result<()> {
    if let Some(input) = input {
        settings.events.raw_path = input;
    }

    if let Err(e) = preflight::check(Operation::Process, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    Output::info(&format!("Processing {}", settings.raw_events_path().display()));
    let orchestrator = Orchestrator::new(settings)?;
    let report = orchestrator.process()?;

    Output::success(&format!(
        "{} chunks from {} events",
        report.chunks, report.kept_events
    ));
    Output::kv("Raw events", &report.total_events.to_string());
    Output::kv("Rejected (insufficient data)", &report.rejected_events.to_string());
    Output::kv("Split into several chunks", &report.split_events.to_string());
    Output::kv(
        "Saved to",
        &orchestrator.settings().processed_path().display().to_string(),
    );
    Output::info("Next: puls index");

    Ok(())
}
