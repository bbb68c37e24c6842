//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::Chatbot;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

enum Input<'a> {
    Empty,
    Quit,
    Reset,
    Question(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        Input::Empty
    } else if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        Input::Quit
    } else if line.eq_ignore_ascii_case("reset") || line.eq_ignore_ascii_case("clear") {
        Input::Reset
    } else {
        Input::Question(line)
    }
}

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, mut settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'puls doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.llm.model = model;
    }
    let city = settings.events.city.clone();

    let mut chatbot = Chatbot::new(settings);
    let spinner = Output::spinner("Loading events...");
    let initialized = chatbot.initialize();
    spinner.finish_and_clear();
    initialized?;

    println!("\n{}", style(format!("Puls - événements à {}", city)).bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'reset' to start a new conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("Vous:").green().bold());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Quit => {
                Output::info("Au revoir !");
                break;
            }
            Input::Reset => {
                chatbot.reset();
                Output::info("Conversation history cleared.");
            }
            Input::Question(question) => {
                let spinner = Output::spinner("...");
                let result = chatbot.ask(question).await;
                spinner.finish_and_clear();

                match result {
                    Ok(response) => {
                        println!("\n{} {}\n", style("Puls:").cyan().bold(), response.answer);
                    }
                    Err(e) => Output::error(&format!("Error: {}", e)),
                }
            }
        }
    }

    Ok(())
}
