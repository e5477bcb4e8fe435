//! Confidence Scorer
//!
//! Single scalar trust estimate for a generated reply, derived from source
//! quality with optional complexity/coherence adjustments. Deterministic for
//! identical inputs; always in [0, 1].

use serde::{Deserialize, Serialize};

use crate::types::RetrievedChunk;

/// Fixed confidence when the reply was generated with zero sources. The
/// system still answers, but flags low trust.
pub const NO_SOURCE_FLOOR: f32 = 0.3;

/// Multiplier applied to average source similarity before clamping.
const SIMILARITY_BOOST: f32 = 1.2;

/// Optional factor overrides supplied by the caller, each in [0, 1].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfidenceFactors {
    /// Replaces the computed average similarity when set.
    pub source_quality: Option<f32>,
    pub query_complexity: Option<f32>,
    pub response_coherence: Option<f32>,
}

pub struct ConfidenceScorer {}

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self {}
    }

    pub fn score(&self, chunks: &[RetrievedChunk], factors: &ConfidenceFactors) -> f32 {
        if chunks.is_empty() {
            return NO_SOURCE_FLOOR;
        }

        let avg_similarity = chunks.iter().map(|c| c.similarity).sum::<f32>() / chunks.len() as f32;
        let quality = factors
            .source_quality
            .unwrap_or(avg_similarity)
            .clamp(0.0, 1.0);

        let base = (quality * SIMILARITY_BOOST).min(1.0);

        // Weighted average: the source-derived score dominates, supplied
        // factors pull it toward their own estimate.
        let mut weighted = base * 0.6;
        let mut weight = 0.6;
        if let Some(complexity) = factors.query_complexity {
            weighted += complexity.clamp(0.0, 1.0) * 0.2;
            weight += 0.2;
        }
        if let Some(coherence) = factors.response_coherence {
            weighted += coherence.clamp(0.0, 1.0) * 0.2;
            weight += 0.2;
        }

        (weighted / weight).clamp(0.0, 1.0)
    }
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new()
    }
}
