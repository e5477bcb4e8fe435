//! Semantic Retriever
//!
//! Embeds the optimized query and runs a thresholded top-k similarity search
//! scoped to the owning account. The embedding provider and vector backend
//! live behind traits; both are external services from the engine's point of
//! view.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RetrievalConfig;
use crate::error::EngineError;
use crate::types::RetrievedChunk;

/// Embedding provider boundary: text in, fixed-dimensionality vector out.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Vector-similarity backend boundary. Results must be scoped to the given
/// account and ordered by descending similarity.
#[async_trait]
pub trait VectorSearchBackend: Send + Sync {
    async fn match_chunks(
        &self,
        embedding: &[f32],
        threshold: f32,
        count: usize,
        account_id: &str,
    ) -> Result<Vec<RetrievedChunk>>;
}

pub struct SemanticRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    backend: Arc<dyn VectorSearchBackend>,
    config: RetrievalConfig,
}

impl SemanticRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        backend: Arc<dyn VectorSearchBackend>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            backend,
            config,
        }
    }

    /// Retrieve knowledge chunks for a query, scoped to one account.
    ///
    /// An empty result set is valid — it means nothing cleared the threshold.
    /// Provider and backend errors surface as `EngineError::Retrieval`; the
    /// caller decides whether to degrade to a zero-source context.
    pub async fn retrieve(
        &self,
        query: &str,
        account_id: &str,
    ) -> Result<Vec<RetrievedChunk>, EngineError> {
        let timeout = Duration::from_secs(self.config.timeout_secs);

        let embedding = tokio::time::timeout(timeout, self.embedder.embed(query))
            .await
            .map_err(|_| {
                EngineError::Retrieval(anyhow!(
                    "embedding request timed out after {}s",
                    self.config.timeout_secs
                ))
            })?
            .map_err(EngineError::Retrieval)?;

        if embedding.is_empty() {
            return Err(EngineError::Retrieval(anyhow!(
                "embedding provider returned an empty vector"
            )));
        }

        let mut chunks = tokio::time::timeout(
            timeout,
            self.backend.match_chunks(
                &embedding,
                self.config.match_threshold,
                self.config.match_count,
                account_id,
            ),
        )
        .await
        .map_err(|_| {
            EngineError::Retrieval(anyhow!(
                "vector search timed out after {}s",
                self.config.timeout_secs
            ))
        })?
        .map_err(EngineError::Retrieval)?;

        // Backends are expected to order by similarity, but downstream budget
        // trimming depends on it, so enforce here.
        chunks.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        chunks.truncate(self.config.match_count);

        tracing::debug!(
            query = %query,
            account = %account_id,
            results = chunks.len(),
            "semantic retrieval complete"
        );

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceType;
    use std::collections::HashMap;

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.1, 0.2, 0.3])
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(anyhow!("provider unreachable"))
        }
    }

    struct RecordingBackend {
        chunks: Vec<RetrievedChunk>,
    }

    #[async_trait]
    impl VectorSearchBackend for RecordingBackend {
        async fn match_chunks(
            &self,
            _embedding: &[f32],
            threshold: f32,
            count: usize,
            _account_id: &str,
        ) -> Result<Vec<RetrievedChunk>> {
            Ok(self
                .chunks
                .iter()
                .filter(|c| c.similarity >= threshold)
                .take(count)
                .cloned()
                .collect())
        }
    }

    fn chunk(id: &str, similarity: f32) -> RetrievedChunk {
        RetrievedChunk {
            source_id: id.to_string(),
            source_type: SourceType::Document,
            text: format!("chunk {}", id),
            similarity,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_results_ordered_by_similarity_desc() {
        let backend = RecordingBackend {
            chunks: vec![chunk("a", 0.72), chunk("b", 0.91), chunk("c", 0.8)],
        };
        let retriever = SemanticRetriever::new(
            Arc::new(FixedEmbedder),
            Arc::new(backend),
            RetrievalConfig::default(),
        );

        let result = retriever.retrieve("refund policy", "acct-1").await.unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].source_id, "b");
        assert_eq!(result[1].source_id, "c");
        assert_eq!(result[2].source_id, "a");
    }

    #[tokio::test]
    async fn test_empty_result_is_not_an_error() {
        let backend = RecordingBackend {
            chunks: vec![chunk("a", 0.2)],
        };
        let retriever = SemanticRetriever::new(
            Arc::new(FixedEmbedder),
            Arc::new(backend),
            RetrievalConfig::default(),
        );

        let result = retriever.retrieve("anything", "acct-1").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_embedder_failure_is_retrieval_error() {
        let backend = RecordingBackend { chunks: vec![] };
        let retriever = SemanticRetriever::new(
            Arc::new(FailingEmbedder),
            Arc::new(backend),
            RetrievalConfig::default(),
        );

        let err = retriever.retrieve("anything", "acct-1").await.unwrap_err();
        assert!(matches!(err, EngineError::Retrieval(_)));
        assert!(err.is_recoverable());
    }
}
