use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub retrieval: RetrievalConfig,
    pub model: ModelConfig,
    pub escalation: EscalationConfig,
    pub lexicons: LexiconConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum chunks returned by the vector backend.
    pub match_count: usize,
    /// Minimum similarity for a chunk to be included, in [0, 1].
    pub match_threshold: f32,
    /// Most recent messages pulled from the session store per turn.
    pub history_limit: usize,
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            match_count: 10,
            match_threshold: 0.7,
            history_limit: 20,
            timeout_secs: 5,
        }
    }
}

/// Active language-model configuration, selected once at load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    pub api_key: String,
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub system_prompt: String,
    /// Token budget for the assembled prompt context.
    pub max_context_tokens: usize,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            api_key: String::new(),
            model_name: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            system_prompt: "You are a helpful customer support assistant. Answer using the \
                            provided knowledge base articles when relevant, and say so when \
                            you are unsure."
                .to_string(),
            max_context_tokens: 8000,
            timeout_secs: 60,
        }
    }
}

/// Supported language-model providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    /// OpenAI-compatible endpoint (self-hosted or proxy).
    Custom { endpoint: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Confidence below this fires the low-confidence trigger.
    pub confidence_threshold: f32,
    /// Message count at which the repetition trigger fires.
    pub repetition_threshold: usize,
    /// Word count above which a message counts as complex.
    pub complexity_min_words: usize,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            repetition_threshold: 15,
            complexity_min_words: 50,
        }
    }
}

/// Word lists driving trigger evaluation and sentiment analysis.
/// Shipped as configuration rather than constants so product can tune them
/// without a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconConfig {
    pub urgent_keywords: Vec<String>,
    pub human_request_phrases: Vec<String>,
    pub negative_words: Vec<String>,
    pub positive_words: Vec<String>,
    pub complexity_terms: Vec<String>,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            urgent_keywords: to_strings(&[
                "urgent",
                "immediately",
                "right now",
                "asap",
                "emergency",
                "cancel my subscription",
                "cancel my account",
                "close my account",
                "delete my account",
                "demand a refund",
                "chargeback",
                "legal action",
                "lawyer",
            ]),
            human_request_phrases: to_strings(&[
                "speak to a human",
                "talk to a human",
                "real person",
                "human agent",
                "live agent",
                "speak to an agent",
                "talk to an agent",
                "speak to a manager",
                "talk to a manager",
                "customer representative",
                "speak to someone",
                "talk to someone",
            ]),
            negative_words: to_strings(&[
                "angry",
                "frustrated",
                "terrible",
                "awful",
                "horrible",
                "useless",
                "worst",
                "ridiculous",
                "unacceptable",
                "disappointed",
                "annoyed",
                "scam",
                "broken",
                "never works",
                "waste",
            ]),
            positive_words: to_strings(&[
                "thanks",
                "thank you",
                "great",
                "perfect",
                "awesome",
                "excellent",
                "helpful",
                "love",
                "appreciate",
                "wonderful",
            ]),
            complexity_terms: to_strings(&[
                "integration",
                "api",
                "webhook",
                "migrate",
                "migration",
                "configure",
                "configuration",
                "multiple",
                "several",
                "step by step",
                "workflow",
                "custom",
                "technical",
                "error code",
            ]),
        }
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 256,
            ttl_secs: 300,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retrieval: RetrievalConfig::default(),
            model: ModelConfig::default(),
            escalation: EscalationConfig::default(),
            lexicons: LexiconConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.retrieval.match_threshold) {
            return Err("retrieval.match_threshold must be in [0.0, 1.0]".into());
        }
        if self.retrieval.match_count == 0 {
            return Err("retrieval.match_count must be > 0".into());
        }
        if self.retrieval.history_limit == 0 {
            return Err("retrieval.history_limit must be > 0".into());
        }
        if self.model.model_name.is_empty() {
            return Err("model.model_name must not be empty".into());
        }
        if self.model.max_tokens == 0 {
            return Err("model.max_tokens must be > 0".into());
        }
        if self.model.max_context_tokens < 256 {
            return Err("model.max_context_tokens must be >= 256".into());
        }
        if !(0.0..=1.0).contains(&self.escalation.confidence_threshold) {
            return Err("escalation.confidence_threshold must be in [0.0, 1.0]".into());
        }
        if self.cache.enabled && self.cache.capacity == 0 {
            return Err("cache.capacity must be > 0 when cache is enabled".into());
        }
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let mut config = EngineConfig::default();
        config.retrieval.match_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_model_name() {
        let mut config = EngineConfig::default();
        config.model.model_name.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.retrieval.match_count, 10);
    }
}
