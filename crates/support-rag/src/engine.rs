//! Response pipeline
//!
//! One invocation per inbound message: optimize the query, retrieve knowledge,
//! assemble a bounded context, generate a reply, score confidence, and decide
//! whether the conversation goes to a human. Stages run sequentially; sessions
//! run concurrently and share no mutable state.

use std::sync::Arc;

use crate::cache::{CachedTurn, ResponseCache};
use crate::config::EngineConfig;
use crate::confidence::{ConfidenceFactors, ConfidenceScorer};
use crate::context::{ContextAssembler, ConversationAnalyzer};
use crate::error::EngineError;
use crate::escalation::{EscalationDecision, EscalationEvaluator};
use crate::handoff::{AgentDirectory, AgentNotifier, HandoffManager, TicketStore};
use crate::llm::{LlmProvider, ResponseGenerator};
use crate::query::QueryOptimizer;
use crate::retrieval::{EmbeddingProvider, SemanticRetriever, VectorSearchBackend};
use crate::session::SessionStore;
use crate::types::{ConversationContext, GeneratedResponse, HandoffTicket};

/// External collaborators the engine is wired to at construction.
pub struct Collaborators {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub vector_backend: Arc<dyn VectorSearchBackend>,
    pub llm: Arc<dyn LlmProvider>,
    pub sessions: Arc<dyn SessionStore>,
    pub tickets: Arc<dyn TicketStore>,
    pub agents: Arc<dyn AgentDirectory>,
    pub notifier: Arc<dyn AgentNotifier>,
}

/// Everything a turn produces. A persistence failure during ticket creation
/// lands in `ticket_error` instead of discarding the generated response.
#[derive(Debug)]
pub struct EngineOutcome {
    pub response: GeneratedResponse,
    pub confidence: f32,
    pub context_relevance: f32,
    pub conversation: ConversationContext,
    pub escalation: EscalationDecision,
    pub ticket: Option<HandoffTicket>,
    pub ticket_error: Option<EngineError>,
    pub from_cache: bool,
    /// True when retrieval failed and the turn ran with zero sources.
    pub degraded_retrieval: bool,
}

pub struct ResponseEngine {
    optimizer: QueryOptimizer,
    analyzer: ConversationAnalyzer,
    retriever: SemanticRetriever,
    assembler: ContextAssembler,
    generator: ResponseGenerator,
    scorer: ConfidenceScorer,
    evaluator: EscalationEvaluator,
    handoff: HandoffManager,
    sessions: Arc<dyn SessionStore>,
    cache: Option<ResponseCache>,
    history_limit: usize,
}

impl ResponseEngine {
    pub fn new(config: EngineConfig, collab: Collaborators) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::Configuration)?;

        let cache = config
            .cache
            .enabled
            .then(|| ResponseCache::new(&config.cache));

        Ok(Self {
            optimizer: QueryOptimizer::new(),
            analyzer: ConversationAnalyzer::new(&config.lexicons)?,
            retriever: SemanticRetriever::new(
                collab.embedder,
                collab.vector_backend,
                config.retrieval.clone(),
            ),
            assembler: ContextAssembler::new(
                config.retrieval.history_limit,
                config.model.max_context_tokens,
            ),
            generator: ResponseGenerator::new(collab.llm, config.model.clone()),
            scorer: ConfidenceScorer::new(),
            evaluator: EscalationEvaluator::new(config.escalation.clone(), &config.lexicons)?,
            handoff: HandoffManager::new(collab.tickets, collab.agents, collab.notifier),
            sessions: collab.sessions,
            cache,
            history_limit: config.retrieval.history_limit,
        })
    }

    /// Process one inbound message end to end.
    ///
    /// Failure handling per stage: retrieval errors degrade to a zero-source
    /// context and the turn continues at floor confidence; generation errors
    /// abort the turn; ticket-store errors are reported alongside the
    /// already-generated response rather than replacing it.
    pub async fn handle_message(
        &self,
        session_id: &str,
        account_id: &str,
        text: &str,
    ) -> Result<EngineOutcome, EngineError> {
        let history = match self
            .sessions
            .recent_messages(session_id, self.history_limit)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(session = %session_id, error = %e, "session store unavailable, continuing without history");
                Vec::new()
            }
        };

        let conversation = self.analyzer.analyze(session_id, &history, 0.0);
        let optimized = self.optimizer.optimize(text, &conversation.topics);

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(account_id, &optimized.optimized_query) {
                tracing::debug!(session = %session_id, "serving cached response");
                return Ok(self
                    .finish_turn(
                        session_id,
                        text,
                        conversation,
                        cached.response,
                        cached.confidence,
                        cached.context_relevance,
                        true,
                        false,
                    )
                    .await);
            }
        }

        let (chunks, degraded_retrieval) = match self
            .retriever
            .retrieve(&optimized.optimized_query, account_id)
            .await
        {
            Ok(chunks) => (chunks, false),
            Err(e) => {
                tracing::warn!(session = %session_id, error = %e, "retrieval failed, degrading to zero-source context");
                (Vec::new(), true)
            }
        };

        let assembled =
            self.assembler
                .assemble(&history, &chunks, text, &optimized.optimized_query);
        let context_relevance = assembled.context_relevance_score;

        let response = self.generator.generate(&assembled).await?;
        let confidence = self.scorer.score(&chunks, &ConfidenceFactors::default());

        // A degraded turn carries floor confidence; the next identical query
        // must retry retrieval instead of replaying the zero-source answer.
        if !degraded_retrieval {
            if let Some(cache) = &self.cache {
                cache.put(
                    account_id,
                    &optimized.optimized_query,
                    CachedTurn {
                        response: response.clone(),
                        confidence,
                        context_relevance,
                    },
                );
            }
        }

        Ok(self
            .finish_turn(
                session_id,
                text,
                conversation,
                response,
                confidence,
                context_relevance,
                false,
                degraded_retrieval,
            )
            .await)
    }

    /// Escalation evaluation and ticket handling, shared by the cached and
    /// full paths. Escalation always runs fresh — the decision depends on
    /// the current turn, not on how the reply was produced.
    #[allow(clippy::too_many_arguments)]
    async fn finish_turn(
        &self,
        session_id: &str,
        text: &str,
        mut conversation: ConversationContext,
        response: GeneratedResponse,
        confidence: f32,
        context_relevance: f32,
        from_cache: bool,
        degraded_retrieval: bool,
    ) -> EngineOutcome {
        conversation.average_confidence = confidence;
        let escalation = self.evaluator.evaluate(text, &conversation, confidence);

        let (ticket, ticket_error) = if escalation.should_handoff {
            match self.handoff.open_ticket(session_id, &escalation).await {
                Ok(ticket) => (Some(ticket), None),
                Err(e) => {
                    tracing::error!(session = %session_id, error = %e, "ticket creation failed, keeping generated response");
                    (None, Some(e))
                }
            }
        } else {
            (None, None)
        };

        EngineOutcome {
            response,
            confidence,
            context_relevance,
            conversation,
            escalation,
            ticket,
            ticket_error,
            from_cache,
            degraded_retrieval,
        }
    }

    /// Drop cached answers for an account after its knowledge base changes.
    pub fn invalidate_account_cache(&self, account_id: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate_account(account_id);
        }
    }

    /// (hits, misses) since construction; (0, 0) when caching is disabled.
    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache.as_ref().map(|c| c.stats()).unwrap_or((0, 0))
    }
}
