//! Evaluate command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{content_preview, Output};
use crate::config::Settings;
use crate::evaluation::{evaluate, load_dataset, Verdict};
use crate::rag::Chatbot;
use anyhow::Result;
use console::style;

/// Run the evaluate command.
pub async fn run_evaluate(dataset: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let dataset = load_dataset(&Settings::expand_path(dataset))?;
    let total = dataset.test_cases.len();

    Output::header("Chatbot evaluation");
    Output::kv("Test cases", &total.to_string());
    println!();

    let mut chatbot = Chatbot::new(settings);
    chatbot.initialize()?;

    let report = evaluate(&mut chatbot, &dataset, |i, result| {
        println!("[{}/{}] {}", i + 1, total, style(&result.category).bold());
        println!("  Q: {}", result.question);
        if let Some(error) = &result.error {
            Output::error(error);
        } else {
            println!("  A: {}", content_preview(&result.answer, 200));
        }
        if let Some(follow_up) = &result.follow_up_answer {
            println!("  ↳ {}", content_preview(follow_up, 150));
        }
        if result.passed {
            Output::success(&format!("Keywords found: {}", result.matched.join(", ")));
        } else {
            Output::warning("Missing expected keywords");
        }
        println!();
    })
    .await?;

    Output::header("Results");
    Output::kv("Passed", &format!("{}/{}", report.passed(), report.total()));
    Output::kv("Score", &format!("{:.1}%", report.score()));
    println!();

    match report.verdict() {
        Verdict::Excellent => Output::success("Excellent: the chatbot answers satisfactorily."),
        Verdict::Good => Output::info("Good: some improvements possible."),
        Verdict::NeedsWork => Output::warning("Improvements are needed."),
    }

    Ok(())
}
