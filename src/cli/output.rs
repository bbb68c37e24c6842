//! CLI output formatting utilities.

use crate::vector_store::RetrievalResult;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a retrieved event chunk.
    pub fn search_result(rank: usize, result: &RetrievalResult, preview_chars: usize) {
        let meta = &result.chunk.metadata;
        let part = if meta.total_chunks > 1 {
            format!(" [{}/{}]", meta.chunk_index + 1, meta.total_chunks)
        } else {
            String::new()
        };

        println!(
            "\n{} {}{} (score: {:.2})",
            style(format!("{}.", rank)).green(),
            style(&meta.title).bold(),
            style(part).dim(),
            result.score
        );
        if !meta.lieu.is_empty() || !meta.ville.is_empty() {
            println!("   {}", style(venue_line(&meta.lieu, &meta.ville)).cyan());
        }
        println!("   {}", content_preview(&result.chunk.text, preview_chars));
        if !meta.url.is_empty() {
            println!("   {}", style(&meta.url).dim());
        }
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        if let Ok(bar_style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("#>-"));
        }
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

fn venue_line(venue: &str, city: &str) -> String {
    match (venue.is_empty(), city.is_empty()) {
        (false, false) => format!("{}, {}", venue, city),
        (false, true) => venue.to_string(),
        _ => city.to_string(),
    }
}

/// Truncate content with ellipsis, on a character boundary.
pub(crate) fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
