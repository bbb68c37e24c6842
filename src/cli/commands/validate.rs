//! Validate command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::events::{load_events, validate_events};
use anyhow::Result;
use std::path::Path;

/// Run the validate command.
pub fn run_validate(input: Option<String>, settings: Settings) -> Result<()> {
    let path = input
        .map(|p| Settings::expand_path(&p))
        .unwrap_or_else(|| settings.raw_events_path());

    let events = load_events(&path)?;
    let report = validate_events(&events, &settings.events.city);

    Output::header(&format!("Validation of {}", display(&path)));
    Output::kv("Events", &report.total.to_string());
    Output::kv("Missing required fields", &report.missing_fields.len().to_string());
    Output::kv("Unparseable start dates", &report.invalid_dates.len().to_string());
    Output::kv(
        &format!("Outside {}", report.expected_city),
        &report.out_of_city.len().to_string(),
    );

    for (uid, field) in report.missing_fields.iter().take(10) {
        Output::list_item(&format!("{}: missing {}", uid, field));
    }
    if report.missing_fields.len() > 10 {
        Output::list_item(&format!("... and {} more", report.missing_fields.len() - 10));
    }

    println!();
    if report.is_valid() {
        Output::success("Raw data looks good.");
        Ok(())
    } else {
        Output::error("Raw data failed validation.");
        anyhow::bail!("validation failed for {}", display(&path))
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
