//! Query Optimizer
//!
//! Rewrites a raw customer message into a search-optimized query before
//! embedding: strips filler words, expands domain synonyms, and classifies a
//! coarse intent. Pure function of its inputs — no network calls, never fails.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    /// Question about product, policy, or how something works.
    Informational,
    /// Billing, subscription, order, or account actions.
    Transactional,
    /// Dissatisfaction with the product or service.
    Complaint,
    /// Setup, integration, or troubleshooting.
    Technical,
    /// Greeting or chit-chat with no retrieval value.
    Smalltalk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedQuery {
    pub original: String,
    pub optimized_query: String,
    pub search_terms: Vec<String>,
    pub intent: QueryIntent,
}

pub struct QueryOptimizer {}

impl QueryOptimizer {
    pub fn new() -> Self {
        Self {}
    }

    /// Rewrite a raw message into a search query plus intent label.
    ///
    /// Falls back to the raw text when stripping leaves nothing — a query
    /// made entirely of stop words is still a valid search input.
    pub fn optimize(&self, text: &str, recent_topics: &[String]) -> OptimizedQuery {
        let intent = self.classify_intent(text);

        let mut terms = Self::extract_search_terms(text);
        for term in Self::expand_synonyms(&terms) {
            if !terms.contains(&term) {
                terms.push(term);
            }
        }

        let mut optimized = terms.join(" ");

        // Short follow-ups lean on recent conversation topics for recall.
        if terms.len() <= 2 {
            for topic in recent_topics.iter().take(2) {
                let topic_lower = topic.to_lowercase();
                if !optimized.contains(&topic_lower) {
                    optimized = format!("{} {}", optimized, topic_lower);
                }
            }
            optimized = optimized.trim().to_string();
        }

        if optimized.is_empty() {
            optimized = text.trim().to_string();
        }

        OptimizedQuery {
            original: text.to_string(),
            optimized_query: optimized,
            search_terms: terms,
            intent,
        }
    }

    fn classify_intent(&self, text: &str) -> QueryIntent {
        let lower = text.to_lowercase();
        let word_count = lower.split_whitespace().count();

        if word_count <= 4 {
            let greetings = [
                "hello", "hi", "hey", "thanks", "thank you", "bye", "goodbye", "ok", "okay",
            ];
            if greetings
                .iter()
                .any(|g| lower == *g || lower.starts_with(&format!("{} ", g)))
            {
                return QueryIntent::Smalltalk;
            }
        }

        let complaint_terms = [
            "not working",
            "doesn't work",
            "broken",
            "terrible",
            "awful",
            "disappointed",
            "unacceptable",
            "worst",
            "complaint",
            "frustrated",
        ];
        if complaint_terms.iter().any(|t| lower.contains(t)) {
            return QueryIntent::Complaint;
        }

        let transactional_terms = [
            "cancel",
            "refund",
            "subscription",
            "billing",
            "invoice",
            "payment",
            "upgrade",
            "downgrade",
            "order",
            "charge",
            "renew",
        ];
        if transactional_terms.iter().any(|t| lower.contains(t)) {
            return QueryIntent::Transactional;
        }

        let technical_terms = [
            "api", "error", "integration", "webhook", "install", "configure", "setup",
            "set up", "connect", "sync", "export", "import",
        ];
        if technical_terms.iter().any(|t| lower.contains(t)) {
            return QueryIntent::Technical;
        }

        QueryIntent::Informational
    }

    /// Strip stop words and punctuation, keeping content words in order.
    fn extract_search_terms(text: &str) -> Vec<String> {
        let stop_words: HashSet<&str> = [
            "what", "is", "are", "was", "were", "the", "a", "an", "of", "in", "for", "to",
            "and", "or", "can", "you", "me", "my", "i", "we", "our", "tell", "show", "do",
            "does", "how", "where", "when", "why", "who", "which", "about", "please",
            "could", "would", "should", "there", "from", "with", "that", "this", "have",
            "has", "had", "be", "been", "it", "its", "your", "hi", "hello", "hey",
        ]
        .iter()
        .copied()
        .collect();

        text.to_lowercase()
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_string()
            })
            .filter(|w| w.len() > 1 && !stop_words.contains(w.as_str()))
            .collect()
    }

    /// Support-domain synonym expansion so colloquial phrasing matches
    /// indexed article wording.
    fn expand_synonyms(terms: &[String]) -> Vec<String> {
        let synonym_pairs: &[(&str, &[&str])] = &[
            ("cancel", &["cancellation", "terminate"]),
            ("refund", &["reimbursement", "money back"]),
            ("price", &["pricing", "cost"]),
            ("cost", &["price", "pricing"]),
            ("bill", &["billing", "invoice"]),
            ("billing", &["invoice", "payment"]),
            ("ship", &["shipping", "delivery"]),
            ("shipping", &["delivery"]),
            ("delivery", &["shipping"]),
            ("login", &["sign in", "authentication"]),
            ("password", &["credentials", "reset password"]),
            ("hours", &["business hours", "opening hours"]),
            ("broken", &["not working", "malfunction"]),
            ("upgrade", &["plan change"]),
            ("account", &["profile"]),
        ];

        let mut expanded = Vec::new();
        for term in terms {
            for (key, synonyms) in synonym_pairs {
                if term == key {
                    for syn in *synonyms {
                        expanded.push(syn.to_string());
                    }
                }
            }
        }
        expanded
    }
}

impl Default for QueryOptimizer {
    fn default() -> Self {
        Self::new()
    }
}
