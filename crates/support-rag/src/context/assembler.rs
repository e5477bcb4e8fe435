//! Context Assembler
//!
//! Merges recent conversation history with retrieved chunks into a
//! token-bounded prompt context. Under budget pressure the lowest-similarity
//! chunks go first, then the oldest history turns. The current user message
//! is never truncated.

use serde::{Deserialize, Serialize};

use crate::llm::{ChatMessage, ChatRole};
use crate::types::{Message, MessageRole, RetrievedChunk};

/// Tokens held back for the system prompt and message framing.
const RESERVED_TOKENS: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledContext {
    /// Compact transcript of the kept history turns.
    pub conversation_context: String,
    /// Retrieved chunk texts, highest similarity first.
    pub knowledge_context: String,
    /// Search-optimized form of the current message.
    pub enhanced_query: String,
    /// Mean similarity of the included chunks; 0 when none survive.
    pub context_relevance_score: f32,
    /// Kept history as provider-ready chat messages, oldest first.
    pub history: Vec<ChatMessage>,
    /// The current user message, verbatim.
    pub current_message: String,
}

pub struct ContextAssembler {
    history_limit: usize,
    max_context_tokens: usize,
}

impl ContextAssembler {
    pub fn new(history_limit: usize, max_context_tokens: usize) -> Self {
        Self {
            history_limit,
            max_context_tokens,
        }
    }

    pub fn assemble(
        &self,
        history: &[Message],
        chunks: &[RetrievedChunk],
        current_message: &str,
        enhanced_query: &str,
    ) -> AssembledContext {
        let start = history.len().saturating_sub(self.history_limit);
        let mut kept_history: Vec<&Message> = history[start..].iter().collect();

        let mut kept_chunks: Vec<&RetrievedChunk> = chunks.iter().collect();
        kept_chunks.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // The current message is charged against the budget up front so it
        // can never be the thing that gets cut.
        let budget = self
            .max_context_tokens
            .saturating_sub(estimate_tokens(current_message) + RESERVED_TOKENS);

        loop {
            let used: usize = kept_chunks
                .iter()
                .map(|c| estimate_tokens(&c.text))
                .sum::<usize>()
                + kept_history
                    .iter()
                    .map(|m| estimate_tokens(&m.content))
                    .sum::<usize>();

            if used <= budget {
                break;
            }
            if let Some(dropped) = kept_chunks.pop() {
                tracing::debug!(
                    source = %dropped.source_id,
                    similarity = dropped.similarity,
                    "dropped chunk to fit context budget"
                );
            } else if !kept_history.is_empty() {
                kept_history.remove(0);
            } else {
                break;
            }
        }

        let context_relevance_score = if kept_chunks.is_empty() {
            0.0
        } else {
            kept_chunks.iter().map(|c| c.similarity).sum::<f32>() / kept_chunks.len() as f32
        };

        let conversation_context = kept_history
            .iter()
            .map(|m| format!("{}: {}", role_label(m.role), m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let knowledge_context = kept_chunks
            .iter()
            .map(|c| format!("[{}] {}", c.source_id, c.text.trim()))
            .collect::<Vec<_>>()
            .join("\n\n");

        let history = kept_history
            .iter()
            .map(|m| ChatMessage {
                role: match m.role {
                    MessageRole::User => ChatRole::User,
                    MessageRole::Assistant => ChatRole::Assistant,
                    MessageRole::System => ChatRole::System,
                },
                content: m.content.clone(),
            })
            .collect();

        AssembledContext {
            conversation_context,
            knowledge_context,
            enhanced_query: enhanced_query.to_string(),
            context_relevance_score,
            history,
            current_message: current_message.to_string(),
        }
    }
}

fn role_label(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::System => "system",
    }
}

/// Rough chars/4 token estimate. Exact counting is the provider's problem.
fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4 + 1
}
