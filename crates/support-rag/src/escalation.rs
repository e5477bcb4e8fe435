//! Escalation Evaluator
//!
//! A fixed, ordered list of independent trigger functions evaluated against
//! the current turn, then aggregated by one deterministic policy. No state is
//! kept between turns — the same (message, context, confidence) always yields
//! the same decision, which is what makes the audit trail trustworthy.

use serde::{Deserialize, Serialize};

use crate::config::{EscalationConfig, LexiconConfig};
use crate::error::EngineError;
use crate::lexicon::CompiledLexicons;
use crate::types::{ConversationContext, HandoffTrigger, Sentiment, Urgency};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationDecision {
    pub should_handoff: bool,
    pub urgency: Urgency,
    /// Concatenated descriptions of every fired trigger, in evaluation order.
    pub reason: String,
    pub triggers: Vec<HandoffTrigger>,
}

pub struct EscalationEvaluator {
    config: EscalationConfig,
    lexicons: CompiledLexicons,
}

impl EscalationEvaluator {
    pub fn new(config: EscalationConfig, lexicons: &LexiconConfig) -> Result<Self, EngineError> {
        Ok(Self {
            config,
            lexicons: CompiledLexicons::compile(lexicons)?,
        })
    }

    /// Evaluate all triggers and aggregate. Pure function over its inputs.
    ///
    /// Policy: any high-urgency trigger escalates at high. Two or more medium
    /// triggers together escalate at high with reason "Multiple triggers".
    /// Exactly one medium trigger escalates at medium. Otherwise no handoff.
    pub fn evaluate(
        &self,
        message: &str,
        context: &ConversationContext,
        confidence: f32,
    ) -> EscalationDecision {
        let triggers = vec![
            self.low_confidence_trigger(confidence),
            self.urgent_keyword_trigger(message),
            self.human_request_trigger(message),
            self.sentiment_trigger(context),
            self.repetition_trigger(context),
            self.complexity_trigger(message),
        ];

        let fired: Vec<&HandoffTrigger> = triggers.iter().filter(|t| t.triggered).collect();
        let reasons = fired
            .iter()
            .map(|t| t.reason.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        let high_count = fired.iter().filter(|t| t.urgency == Urgency::High).count();
        let medium_count = fired
            .iter()
            .filter(|t| t.urgency == Urgency::Medium)
            .count();

        let (should_handoff, urgency, reason) = if high_count > 0 {
            (true, Urgency::High, reasons)
        } else if medium_count >= 2 {
            (true, Urgency::High, format!("Multiple triggers: {}", reasons))
        } else if medium_count == 1 {
            (true, Urgency::Medium, reasons)
        } else {
            (false, Urgency::Low, String::new())
        };

        EscalationDecision {
            should_handoff,
            urgency,
            reason,
            triggers,
        }
    }

    fn low_confidence_trigger(&self, confidence: f32) -> HandoffTrigger {
        HandoffTrigger {
            triggered: confidence < self.config.confidence_threshold,
            urgency: Urgency::Medium,
            reason: "Low AI confidence".to_string(),
        }
    }

    fn urgent_keyword_trigger(&self, message: &str) -> HandoffTrigger {
        let hit = self.lexicons.urgent_keywords.first_match(message);
        HandoffTrigger {
            triggered: hit.is_some(),
            urgency: Urgency::High,
            reason: match hit {
                Some(kw) => format!("Urgent keyword: '{}'", kw),
                None => "Urgent keyword".to_string(),
            },
        }
    }

    fn human_request_trigger(&self, message: &str) -> HandoffTrigger {
        HandoffTrigger {
            triggered: self.lexicons.human_request_phrases.is_match(message),
            urgency: Urgency::High,
            reason: "Customer requested human agent".to_string(),
        }
    }

    fn sentiment_trigger(&self, context: &ConversationContext) -> HandoffTrigger {
        HandoffTrigger {
            triggered: context.sentiment == Sentiment::Negative,
            urgency: Urgency::Medium,
            reason: "Negative sentiment".to_string(),
        }
    }

    fn repetition_trigger(&self, context: &ConversationContext) -> HandoffTrigger {
        HandoffTrigger {
            triggered: context.message_count >= self.config.repetition_threshold,
            urgency: Urgency::Medium,
            reason: "Long unresolved conversation".to_string(),
        }
    }

    /// Length/keyword heuristic for multi-step or technical asks.
    fn complexity_trigger(&self, message: &str) -> HandoffTrigger {
        let word_count = message.split_whitespace().count();
        let term_hits = self.lexicons.complexity_terms.match_count(message);
        let question_marks = message.matches('?').count();

        HandoffTrigger {
            triggered: word_count > self.config.complexity_min_words
                || term_hits >= 2
                || question_marks >= 3,
            urgency: Urgency::Medium,
            reason: "Complex multi-step request".to_string(),
        }
    }
}
