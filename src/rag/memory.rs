//! Bounded conversational memory.

use super::llm::ChatMessage;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One question and the answer it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

/// The last `capacity` turns of a conversation, oldest first.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    capacity: usize,
    turns: VecDeque<ConversationTurn>,
}

impl ConversationMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            turns: VecDeque::with_capacity(capacity),
        }
    }

    /// Record a turn, evicting the oldest one when full.
    pub fn append(&mut self, question: &str, answer: &str) {
        if self.capacity == 0 {
            return;
        }
        while self.turns.len() >= self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(ConversationTurn {
            question: question.to_string(),
            answer: answer.to_string(),
        });
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    /// Turns as alternating user and assistant messages.
    pub fn serialize(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .flat_map(|turn| {
                [
                    ChatMessage::user(&turn.question),
                    ChatMessage::assistant(&turn.answer),
                ]
            })
            .collect()
    }

    /// Plain-text transcript, used when rewriting follow-up questions.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("Utilisateur : {}\nAssistant : {}", turn.question, turn.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(5)
    }
}
