//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! A [`RagEngine`] holds the loaded vector store and the remote models and is shared by
//! every conversation. Each [`ChatSession`] owns its [`ConversationMemory`]; a
//! [`Chatbot`] wraps one session behind an explicit initialization step.

pub mod context;
pub mod llm;
mod memory;
mod session;

pub use context::{format_context_for_prompt, format_sources_for_display};
pub use llm::{ChatMessage, ChatModel, OpenAiChat, Role};
pub use memory::{ConversationMemory, ConversationTurn};
pub use session::{ChatSession, Chatbot, RagEngine, RagResponse};
