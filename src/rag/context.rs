//! Prompt assembly from retrieved chunks and conversation history.

use super::llm::ChatMessage;
use super::memory::ConversationMemory;
use crate::config::Prompts;
use crate::vector_store::RetrievalResult;
use std::collections::HashMap;

/// Join the text of retrieved chunks into the prompt's context block.
pub fn format_context_for_prompt(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format retrieved chunks as a list of sources for the user.
pub fn format_sources_for_display(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let meta = &result.chunk.metadata;
            let mut line = format!("[{}] {} (score: {:.2})", i + 1, meta.title, result.score);
            if !meta.lieu.is_empty() {
                line.push_str(&format!("\n    {}", meta.lieu));
            }
            if !meta.url.is_empty() {
                line.push_str(&format!("\n    {}", meta.url));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Messages for one grounded answer: system instructions, prior turns, then the
/// question with its retrieved context.
pub fn build_answer_messages(
    prompts: &Prompts,
    city: &str,
    memory: &ConversationMemory,
    results: &[RetrievalResult],
    question: &str,
) -> Vec<ChatMessage> {
    let mut vars = HashMap::new();
    vars.insert("city".to_string(), city.to_string());
    vars.insert("context".to_string(), format_context_for_prompt(results));
    vars.insert("question".to_string(), question.to_string());

    let mut messages = Vec::with_capacity(2 + memory.len() * 2);
    messages.push(ChatMessage::system(prompts.render_with_custom(&prompts.rag.system, &vars)));
    messages.extend(memory.serialize());
    messages.push(ChatMessage::user(prompts.render_with_custom(&prompts.rag.user, &vars)));
    messages
}

/// Single-message prompt asking the model to make a follow-up self-contained.
pub fn build_condense_messages(
    prompts: &Prompts,
    memory: &ConversationMemory,
    question: &str,
) -> Vec<ChatMessage> {
    let mut vars = HashMap::new();
    vars.insert("chat_history".to_string(), memory.transcript());
    vars.insert("question".to_string(), question.to_string());

    vec![ChatMessage::user(prompts.render_with_custom(&prompts.condense.user, &vars))]
}
