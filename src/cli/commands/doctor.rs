//! Doctor command - verify configuration and build artifacts.

use crate::cli::Output;
use crate::config::Settings;
use crate::openai::API_KEY_ENV;
use crate::vector_store::VectorStore;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Puls Doctor");
    println!();

    let sections = [
        ("API Configuration", vec![check_api_key(std::env::var(API_KEY_ENV).ok())]),
        ("Pipeline", check_pipeline(settings)),
        ("Configuration", vec![check_config_file()]),
    ];

    let mut errors = 0;
    let mut warnings = 0;
    for (title, checks) in &sections {
        println!("{}", style(title).bold());
        for check in checks {
            check.print();
            match check.status {
                CheckStatus::Error => errors += 1,
                CheckStatus::Warning => warnings += 1,
                CheckStatus::Ok => {}
            }
        }
        println!();
    }

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Puls.",
            errors
        ));
        anyhow::bail!("{} doctor check(s) failed", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Puls is ready to use.");
    }

    Ok(())
}

fn check_api_key(value: Option<String>) -> CheckResult {
    match value {
        Some(key) if key.chars().count() > 8 => {
            let head: String = key.chars().take(4).collect();
            let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            CheckResult::ok(API_KEY_ENV, &format!("configured ({}...{})", head, tail))
        }
        Some(key) if key.is_empty() => CheckResult::error(
            API_KEY_ENV,
            "empty",
            &format!("Set with: export {}='...'", API_KEY_ENV),
        ),
        Some(_) => CheckResult::warning(API_KEY_ENV, "set but suspiciously short", "Check the key"),
        None => CheckResult::error(
            API_KEY_ENV,
            "not set",
            &format!("Set with: export {}='...'", API_KEY_ENV),
        ),
    }
}

/// Data directory and the artifact of each pipeline stage.
fn check_pipeline(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok("Data directory", &data_dir.display().to_string()));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    results.push(check_file(
        "Raw events",
        &settings.raw_events_path(),
        "Export events from the agenda API to this path",
    ));
    results.push(check_file(
        "Processed corpus",
        &settings.processed_path(),
        "Create with: puls process",
    ));
    results.push(check_store(settings));

    results
}

fn check_file(name: &str, path: &Path, hint: &str) -> CheckResult {
    match std::fs::metadata(path) {
        Ok(meta) => CheckResult::ok(
            name,
            &format!("{} ({})", path.display(), format_size(meta.len())),
        ),
        Err(_) => CheckResult::warning(name, &format!("{} (missing)", path.display()), hint),
    }
}

fn check_store(settings: &Settings) -> CheckResult {
    let path = settings.vector_store_path();
    if !VectorStore::exists(&path) {
        return CheckResult::warning(
            "Vector store",
            &format!("{} (not built yet)", path.display()),
            "Create with: puls index",
        );
    }

    match VectorStore::load(&path) {
        Ok(store) => {
            let expected = &settings.embedding;
            match store.ensure_compatible(&expected.model, expected.dimensions as usize) {
                Ok(()) => CheckResult::ok(
                    "Vector store",
                    &format!("{} chunks, {} ({})", store.len(), store.model(), path.display()),
                ),
                Err(e) => CheckResult::error("Vector store", &e.to_string(), "Rebuild with: puls index"),
            }
        }
        Err(e) => CheckResult::error("Vector store", &e.to_string(), "Rebuild with: puls index"),
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning("Config file", "using defaults", "Create with: puls config edit")
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
