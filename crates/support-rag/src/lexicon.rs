//! Compiled lexicon matching
//!
//! Word lists from `LexiconConfig` compiled once at engine construction into
//! case-insensitive, word-boundary regex sets. Substring scans would flag
//! "rapid" for "api" or "urgency" for "urgent"; boundary matching keeps the
//! lexicons tunable as plain phrases without that class of false positive.

use regex::{RegexSet, RegexSetBuilder};

use crate::config::LexiconConfig;
use crate::error::EngineError;

/// One word list compiled for repeated matching.
#[derive(Debug)]
pub struct Lexicon {
    phrases: Vec<String>,
    set: RegexSet,
}

impl Lexicon {
    /// Compile a phrase list. Phrases are matched literally on word
    /// boundaries, case-insensitively.
    pub fn compile(phrases: &[String]) -> Result<Self, EngineError> {
        let patterns: Vec<String> = phrases
            .iter()
            .map(|p| format!(r"\b{}\b", regex::escape(p)))
            .collect();
        let set = RegexSetBuilder::new(&patterns)
            .case_insensitive(true)
            .build()
            .map_err(|e| EngineError::Configuration(format!("invalid lexicon entry: {}", e)))?;
        Ok(Self {
            phrases: phrases.to_vec(),
            set,
        })
    }

    /// First configured phrase present in `text`, in list order.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.set
            .matches(text)
            .iter()
            .next()
            .map(|i| self.phrases[i].as_str())
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.set.is_match(text)
    }

    /// Number of distinct phrases present in `text`.
    pub fn match_count(&self, text: &str) -> usize {
        self.set.matches(text).iter().count()
    }
}

/// Every configured lexicon, compiled together so construction fails fast on
/// a bad entry.
#[derive(Debug)]
pub struct CompiledLexicons {
    pub urgent_keywords: Lexicon,
    pub human_request_phrases: Lexicon,
    pub negative_words: Lexicon,
    pub positive_words: Lexicon,
    pub complexity_terms: Lexicon,
}

impl CompiledLexicons {
    pub fn compile(config: &LexiconConfig) -> Result<Self, EngineError> {
        Ok(Self {
            urgent_keywords: Lexicon::compile(&config.urgent_keywords)?,
            human_request_phrases: Lexicon::compile(&config.human_request_phrases)?,
            negative_words: Lexicon::compile(&config.negative_words)?,
            positive_words: Lexicon::compile(&config.positive_words)?,
            complexity_terms: Lexicon::compile(&config.complexity_terms)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon(phrases: &[&str]) -> Lexicon {
        let owned: Vec<String> = phrases.iter().map(|p| p.to_string()).collect();
        Lexicon::compile(&owned).unwrap()
    }

    #[test]
    fn test_matches_on_word_boundaries_only() {
        let lex = lexicon(&["api", "urgent"]);
        assert!(lex.is_match("the api docs are unclear"));
        assert!(!lex.is_match("a rapid response"));
        assert!(!lex.is_match("there is no urgency here"));
    }

    #[test]
    fn test_case_insensitive() {
        let lex = lexicon(&["chargeback"]);
        assert!(lex.is_match("I will file a CHARGEBACK"));
    }

    #[test]
    fn test_multi_word_phrases() {
        let lex = lexicon(&["cancel my subscription"]);
        assert!(lex.is_match("please cancel my subscription today"));
        assert!(!lex.is_match("cancel my other subscription"));
    }

    #[test]
    fn test_first_match_follows_list_order() {
        let lex = lexicon(&["urgent", "asap"]);
        assert_eq!(lex.first_match("asap, this is urgent"), Some("urgent"));
    }

    #[test]
    fn test_match_count_counts_distinct_phrases() {
        let lex = lexicon(&["api", "webhook", "migration"]);
        assert_eq!(lex.match_count("the webhook calls the api twice"), 2);
    }

    #[test]
    fn test_default_lexicons_compile() {
        assert!(CompiledLexicons::compile(&LexiconConfig::default()).is_ok());
    }
}
