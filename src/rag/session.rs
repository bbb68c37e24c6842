//! Conversational retrieval: a shared engine, per-conversation sessions, and the
//! chatbot lifecycle.

use super::context::{build_answer_messages, build_condense_messages, format_sources_for_display};
use super::llm::{ChatModel, OpenAiChat};
use super::memory::ConversationMemory;
use crate::config::{Prompts, Settings};
use crate::embedding::{EmbeddingGenerator, MistralEmbedder};
use crate::error::{PulsError, Result};
use crate::openai;
use crate::vector_store::{RetrievalResult, VectorStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// An answer with the chunks it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<RetrievalResult>,
    /// Rewritten question used for retrieval, when follow-up condensation changed it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standalone_question: Option<String>,
}

impl RagResponse {
    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();
        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            output.push_str(&format_sources_for_display(&self.sources));
        }
        output
    }
}

/// Read-only components shared by every conversation.
pub struct RagEngine {
    store: Arc<VectorStore>,
    embeddings: EmbeddingGenerator,
    llm: Arc<dyn ChatModel>,
    prompts: Prompts,
    city: String,
    top_k: usize,
    memory_window: usize,
    condense_question: bool,
}

impl RagEngine {
    /// Create an engine. Fails when `store` was built with a different embedding model
    /// or dimension than `embeddings` produces.
    pub fn new(
        store: Arc<VectorStore>,
        embeddings: EmbeddingGenerator,
        llm: Arc<dyn ChatModel>,
    ) -> Result<Self> {
        store.ensure_compatible(embeddings.model(), embeddings.embedder().dimensions())?;

        Ok(Self {
            store,
            embeddings,
            llm,
            prompts: Prompts::default(),
            city: "Lille".to_string(),
            top_k: 5,
            memory_window: 5,
            condense_question: false,
        })
    }

    /// Load the store and connect the remote models described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let store = VectorStore::load(&settings.vector_store_path())?;
        let api_key = openai::api_key()?;

        let embedder = Arc::new(MistralEmbedder::new(&settings.embedding, &api_key)?);
        let embeddings = EmbeddingGenerator::from_settings(embedder, &settings.embedding);
        let llm = Arc::new(OpenAiChat::new(&settings.llm, &api_key)?);
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        info!(
            "RAG engine ready: {} chunks, embeddings '{}', model '{}'",
            store.len(),
            embeddings.model(),
            settings.llm.model
        );

        Ok(Self::new(Arc::new(store), embeddings, llm)?
            .with_prompts(prompts)
            .with_city(&settings.events.city)
            .with_top_k(settings.rag.top_k)
            .with_memory_window(settings.rag.memory_window)
            .with_condense_question(settings.rag.condense_question))
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_city(mut self, city: &str) -> Self {
        self.city = city.to_string();
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Set how many turns each new session remembers.
    pub fn with_memory_window(mut self, window: usize) -> Self {
        self.memory_window = window;
        self
    }

    /// Rewrite follow-up questions into standalone ones before retrieval.
    pub fn with_condense_question(mut self, enabled: bool) -> Self {
        self.condense_question = enabled;
        self
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Start a conversation with empty memory.
    pub fn session(self: &Arc<Self>) -> ChatSession {
        ChatSession {
            engine: Arc::clone(self),
            memory: ConversationMemory::new(self.memory_window),
        }
    }

    /// The `limit` chunks closest to `query`.
    pub async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<RetrievalResult>> {
        let query_embedding = self.embeddings.embed_query(query).await?;
        self.store.search(&query_embedding, limit)
    }

    /// Answer `question` given the conversation so far. Does not touch `memory`.
    #[instrument(skip(self, memory), fields(history = memory.len()))]
    pub async fn answer(&self, memory: &ConversationMemory, question: &str) -> Result<RagResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PulsError::InvalidInput("question is empty".to_string()));
        }

        let standalone_question = self.condense(memory, question).await?;
        let query = standalone_question.as_deref().unwrap_or(question);

        let sources = self.retrieve(query, self.top_k).await?;
        debug!("Retrieved {} chunks for '{}'", sources.len(), query);

        let messages = build_answer_messages(&self.prompts, &self.city, memory, &sources, question);
        let answer = self.llm.complete(&messages).await?;

        Ok(RagResponse {
            answer,
            sources,
            standalone_question,
        })
    }

    async fn condense(&self, memory: &ConversationMemory, question: &str) -> Result<Option<String>> {
        if !self.condense_question || memory.is_empty() {
            return Ok(None);
        }

        let messages = build_condense_messages(&self.prompts, memory, question);
        let rewritten = self.llm.complete(&messages).await?;
        let rewritten = rewritten.trim();

        if rewritten.is_empty() || rewritten == question {
            return Ok(None);
        }
        debug!("Follow-up rewritten as '{}'", rewritten);
        Ok(Some(rewritten.to_string()))
    }
}

/// One conversation: the shared engine plus this conversation's memory.
pub struct ChatSession {
    engine: Arc<RagEngine>,
    memory: ConversationMemory,
}

impl ChatSession {
    /// Answer a question and remember the turn. On error the memory is unchanged.
    pub async fn ask(&mut self, question: &str) -> Result<RagResponse> {
        info!("Processing question: {}", question);
        let response = self.engine.answer(&self.memory, question).await?;
        self.memory.append(question.trim(), &response.answer);
        Ok(response)
    }

    /// Forget the conversation so far.
    pub fn reset(&mut self) {
        self.memory.clear();
        debug!("Conversation memory cleared");
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn engine(&self) -> &Arc<RagEngine> {
        &self.engine
    }
}

enum ChatbotState {
    Uninitialized,
    Ready(ChatSession),
}

/// A single conversation with an explicit lifecycle: nothing is loaded until
/// [`initialize`](Self::initialize) succeeds.
pub struct Chatbot {
    settings: Settings,
    state: ChatbotState,
}

impl Chatbot {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            state: ChatbotState::Uninitialized,
        }
    }

    /// Load the store and models. Calling it again once ready does nothing.
    pub fn initialize(&mut self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }
        let engine = RagEngine::from_settings(&self.settings)?;
        self.initialize_with(Arc::new(engine));
        Ok(())
    }

    /// Become ready with an already constructed engine.
    pub fn initialize_with(&mut self, engine: Arc<RagEngine>) {
        if !self.is_ready() {
            self.state = ChatbotState::Ready(engine.session());
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ChatbotState::Ready(_))
    }

    pub async fn ask(&mut self, question: &str) -> Result<RagResponse> {
        match &mut self.state {
            ChatbotState::Ready(session) => session.ask(question).await,
            ChatbotState::Uninitialized => Err(PulsError::NotInitialized),
        }
    }

    /// Clear the conversation memory. A no-op before initialization.
    pub fn reset(&mut self) {
        if let ChatbotState::Ready(session) = &mut self.state {
            session.reset();
        }
    }

    pub fn session(&self) -> Option<&ChatSession> {
        match &self.state {
            ChatbotState::Ready(session) => Some(session),
            ChatbotState::Uninitialized => None,
        }
    }
}
