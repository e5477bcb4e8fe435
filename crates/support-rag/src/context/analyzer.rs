//! Conversation analysis
//!
//! Derives the per-turn `ConversationContext` from recent history: sentiment,
//! complexity, and topic extraction. Rule-based, no LLM dependency — the
//! escalation evaluator needs this to be cheap and deterministic.

use chrono::Utc;
use std::collections::HashMap;

use crate::config::LexiconConfig;
use crate::error::EngineError;
use crate::lexicon::CompiledLexicons;
use crate::types::{Complexity, ConversationContext, Message, MessageRole, Sentiment};

pub struct ConversationAnalyzer {
    lexicons: CompiledLexicons,
}

impl ConversationAnalyzer {
    pub fn new(lexicons: &LexiconConfig) -> Result<Self, EngineError> {
        Ok(Self {
            lexicons: CompiledLexicons::compile(lexicons)?,
        })
    }

    /// Recompute the conversation view from recent history.
    ///
    /// `average_confidence` is supplied by the caller since per-message
    /// confidence is not persisted anywhere the engine can read.
    pub fn analyze(
        &self,
        session_id: &str,
        messages: &[Message],
        average_confidence: f32,
    ) -> ConversationContext {
        let user_messages: Vec<&Message> = messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .collect();

        ConversationContext {
            session_id: session_id.to_string(),
            message_count: messages.len(),
            average_confidence,
            sentiment: self.detect_sentiment(&user_messages),
            complexity: self.detect_complexity(&user_messages),
            topics: Self::extract_topics(&user_messages),
            last_activity: messages
                .last()
                .map(|m| m.created_at)
                .unwrap_or_else(Utc::now),
        }
    }

    /// Lexicon-based sentiment over recent user messages. Later messages
    /// count double so a conversation that turns sour is flagged even after
    /// a friendly start.
    fn detect_sentiment(&self, user_messages: &[&Message]) -> Sentiment {
        let mut negative = 0i32;
        let mut positive = 0i32;
        let recent_start = user_messages.len().saturating_sub(3);

        for (i, msg) in user_messages.iter().enumerate() {
            let weight = if i >= recent_start { 2 } else { 1 };
            negative += weight * self.lexicons.negative_words.match_count(&msg.content) as i32;
            positive += weight * self.lexicons.positive_words.match_count(&msg.content) as i32;
        }

        if negative > positive {
            Sentiment::Negative
        } else if positive > negative {
            Sentiment::Positive
        } else {
            Sentiment::Neutral
        }
    }

    fn detect_complexity(&self, user_messages: &[&Message]) -> Complexity {
        if user_messages.is_empty() {
            return Complexity::Low;
        }

        let total_words: usize = user_messages
            .iter()
            .map(|m| m.content.split_whitespace().count())
            .sum();
        let avg_words = total_words / user_messages.len();

        let term_hits: usize = user_messages
            .iter()
            .map(|m| self.lexicons.complexity_terms.match_count(&m.content))
            .sum();

        if term_hits >= 2 || avg_words > 40 {
            Complexity::High
        } else if term_hits == 1 || avg_words > 20 {
            Complexity::Medium
        } else {
            Complexity::Low
        }
    }

    /// Most frequent content words across user messages, capped at 5.
    fn extract_topics(user_messages: &[&Message]) -> Vec<String> {
        let stop_words = [
            "what", "is", "are", "was", "were", "the", "a", "an", "of", "in", "for", "to",
            "and", "or", "can", "you", "me", "my", "i", "we", "our", "tell", "show", "do",
            "does", "how", "where", "when", "why", "who", "which", "about", "please",
            "could", "would", "should", "there", "from", "with", "that", "this", "have",
            "has", "had", "be", "been", "it", "its", "your", "not", "but", "on", "at",
        ];

        let mut counts: HashMap<String, usize> = HashMap::new();
        for msg in user_messages {
            for word in msg.content.to_lowercase().split_whitespace() {
                let clean = word.trim_matches(|c: char| !c.is_alphanumeric());
                if clean.len() > 2 && !stop_words.contains(&clean) {
                    *counts.entry(clean.to_string()).or_insert(0) += 1;
                }
            }
        }

        let mut topics: Vec<(String, usize)> = counts.into_iter().collect();
        // Frequency first, then alphabetical so output is stable across runs.
        topics.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        topics.into_iter().take(5).map(|(word, _)| word).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_msg(content: &str) -> Message {
        Message::new("s1", MessageRole::User, content)
    }

    fn analyzer() -> ConversationAnalyzer {
        ConversationAnalyzer::new(&LexiconConfig::default()).unwrap()
    }

    #[test]
    fn test_negative_sentiment_detected() {
        let messages = vec![
            user_msg("my order never arrived"),
            user_msg("this is unacceptable, I am very frustrated"),
        ];
        let context = analyzer().analyze("s1", &messages, 0.0);
        assert_eq!(context.sentiment, Sentiment::Negative);
    }

    #[test]
    fn test_positive_sentiment_detected() {
        let messages = vec![user_msg("thanks, that was really helpful!")];
        let context = analyzer().analyze("s1", &messages, 0.0);
        assert_eq!(context.sentiment, Sentiment::Positive);
    }

    #[test]
    fn test_embedded_words_do_not_count_as_sentiment() {
        // "scampi" must not hit the "scam" entry.
        let messages = vec![user_msg("the scampi recipe page will not load")];
        let context = analyzer().analyze("s1", &messages, 0.0);
        assert_eq!(context.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_neutral_by_default() {
        let messages = vec![user_msg("what are your business hours")];
        let context = analyzer().analyze("s1", &messages, 0.0);
        assert_eq!(context.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_complexity_from_technical_terms() {
        let messages = vec![user_msg(
            "I need to configure the api integration and set up a webhook",
        )];
        let context = analyzer().analyze("s1", &messages, 0.0);
        assert_eq!(context.complexity, Complexity::High);
    }

    #[test]
    fn test_message_count_tracks_all_roles() {
        let mut messages = vec![user_msg("hi")];
        messages.push(Message::new("s1", MessageRole::Assistant, "hello"));
        let context = analyzer().analyze("s1", &messages, 0.0);
        assert_eq!(context.message_count, 2);
    }

    #[test]
    fn test_topic_extraction() {
        let messages = vec![
            user_msg("question about shipping costs"),
            user_msg("is shipping free over fifty dollars"),
        ];
        let context = analyzer().analyze("s1", &messages, 0.0);
        assert!(context.topics.contains(&"shipping".to_string()));
    }
}
