//! Retrieval-augmented response and escalation decision engine.
//!
//! Given an inbound support message, the engine optimizes the query, retrieves
//! knowledge chunks by semantic similarity, assembles a token-bounded context,
//! generates a reply through the configured language-model provider, scores
//! confidence, and decides whether the conversation escalates to a human
//! agent. The session/API layer around it is out of scope and talks to the
//! engine through [`ResponseEngine::handle_message`].

pub mod cache;
pub mod config;
pub mod confidence;
pub mod context;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod handoff;
pub mod lexicon;
pub mod llm;
pub mod query;
pub mod retrieval;
pub mod session;
pub mod types;

// Re-export primary types for convenience
pub use cache::ResponseCache;
pub use config::{EngineConfig, LexiconConfig, ModelConfig, ProviderKind, RetrievalConfig};
pub use confidence::{ConfidenceFactors, ConfidenceScorer};
pub use context::{AssembledContext, ContextAssembler, ConversationAnalyzer};
pub use engine::{Collaborators, EngineOutcome, ResponseEngine};
pub use error::EngineError;
pub use escalation::{EscalationDecision, EscalationEvaluator};
pub use handoff::{AgentDirectory, AgentNotifier, HandoffManager, TicketStore};
pub use lexicon::{CompiledLexicons, Lexicon};
pub use llm::{ChatMessage, ChatRole, ExternalProvider, LlmProvider, ResponseGenerator};
pub use query::{OptimizedQuery, QueryIntent, QueryOptimizer};
pub use retrieval::{EmbeddingProvider, SemanticRetriever, VectorSearchBackend};
pub use session::SessionStore;
pub use types::{
    AgentInfo, AgentStatus, Complexity, ConversationContext, GeneratedResponse, HandoffTicket,
    HandoffTrigger, Message, MessageRole, RetrievedChunk, Sentiment, SourceType, TicketStatus,
    Urgency,
};

// Re-export common types
pub use anyhow::Result;
pub use uuid::Uuid;
