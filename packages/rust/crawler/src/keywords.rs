//! Keyword tagging against a fixed vocabulary.
//!
//! Matching is plain case-insensitive substring search over the first
//! `scan_limit` characters of the description. An optional [`PhraseMiner`]
//! can contribute extra matches from noun phrases and named entities.

use std::collections::BTreeSet;

use internscout_shared::ScrapeConfig;

use crate::fetcher::truncate_chars;

/// Texts shorter than this are not scanned.
const MIN_TEXT_CHARS: usize = 10;

/// Words that mark an entity as a technology when indicator entities are admitted.
const INDICATOR_WORDS: &[&str] = &["software", "framework", "platform", "system"];

/// Kind of span produced by a [`PhraseMiner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    NounPhrase,
    Entity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedSpan {
    pub text: String,
    pub kind: SpanKind,
}

/// Phrase and entity extraction from lowercased text.
pub trait PhraseMiner: Send + Sync {
    fn mine(&self, text: &str) -> Vec<MinedSpan>;
}

pub struct KeywordExtractor {
    vocabulary: Vec<String>,
    scan_limit: usize,
    admit_indicator_entities: bool,
    miner: Option<Box<dyn PhraseMiner>>,
}

impl KeywordExtractor {
    pub fn new(vocabulary: &[String], scan_limit: usize) -> Self {
        let vocabulary: BTreeSet<String> = vocabulary
            .iter()
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect();

        Self {
            vocabulary: vocabulary.into_iter().collect(),
            scan_limit,
            admit_indicator_entities: false,
            miner: None,
        }
    }

    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self::new(&config.vocabulary, config.keyword_scan_limit)
            .admit_indicator_entities(config.admit_indicator_entities)
    }

    pub fn with_miner(mut self, miner: impl PhraseMiner + 'static) -> Self {
        self.miner = Some(Box::new(miner));
        self
    }

    /// Admit indicator entities from the miner. Without a miner this changes nothing.
    pub fn admit_indicator_entities(mut self, admit: bool) -> Self {
        self.admit_indicator_entities = admit;
        self
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Vocabulary terms found in `text`.
    pub fn extract(&self, text: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        if text.trim().chars().count() < MIN_TEXT_CHARS {
            return found;
        }

        let scanned = truncate_chars(text, self.scan_limit).to_lowercase();
        let scanned = scanned.as_str();

        for term in &self.vocabulary {
            if scanned.contains(term.as_str()) {
                found.insert(term.clone());
            }
        }

        if let Some(miner) = &self.miner {
            for span in miner.mine(scanned) {
                let span_text = span.text.trim().to_lowercase();
                if span_text.chars().count() <= 2 {
                    continue;
                }
                if self.vocabulary.binary_search(&span_text).is_ok() {
                    found.insert(span_text);
                } else if span.kind == SpanKind::Entity
                    && self.admit_indicator_entities
                    && INDICATOR_WORDS.iter().any(|word| span_text.contains(word))
                {
                    found.insert(span_text);
                }
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(terms: &[&str]) -> Vec<String> {
        terms.iter().map(|t| t.to_string()).collect()
    }

    struct FixedMiner(Vec<MinedSpan>);

    impl PhraseMiner for FixedMiner {
        fn mine(&self, _text: &str) -> Vec<MinedSpan> {
            self.0.clone()
        }
    }

    fn span(text: &str, kind: SpanKind) -> MinedSpan {
        MinedSpan {
            text: text.into(),
            kind,
        }
    }

    #[test]
    fn finds_vocabulary_terms_deterministically() {
        let extractor = KeywordExtractor::new(&vocab(&["python", "react", "java"]), 3000);
        let expected: BTreeSet<String> = ["python".to_string(), "react".to_string()].into();

        for _ in 0..5 {
            assert_eq!(extractor.extract("Experience with Python and React"), expected);
        }
    }

    #[test]
    fn vocabulary_is_lowercased_and_deduplicated() {
        let extractor = KeywordExtractor::new(&vocab(&["SQL", "sql", "  ", "Docker "]), 3000);
        assert_eq!(extractor.vocabulary(), &["docker".to_string(), "sql".to_string()]);
        assert!(extractor.extract("We use SQL and docker daily").contains("sql"));
    }

    #[test]
    fn short_text_yields_nothing() {
        let extractor = KeywordExtractor::new(&vocab(&["go"]), 3000);
        assert!(extractor.extract("go go").is_empty());
        assert!(extractor.extract("").is_empty());
    }

    #[test]
    fn scan_stops_at_limit() {
        let extractor = KeywordExtractor::new(&vocab(&["kubernetes", "python"]), 20);
        let text = format!("python is required. {} kubernetes", "filler ".repeat(10));
        let found = extractor.extract(&text);
        assert!(found.contains("python"));
        assert!(!found.contains("kubernetes"));
    }

    #[test]
    fn limit_applies_before_case_folding() {
        let extractor = KeywordExtractor::new(&vocab(&["kubernetes", "python"]), 30);
        let text = format!("Senior PYTHON Role, Ünïcode {} KUBERNETES", "ÉÀ ".repeat(50_000));
        let found = extractor.extract(&text);
        assert_eq!(found, ["python".to_string()].into());
    }

    #[test]
    fn miner_adds_exact_vocabulary_spans_only() {
        let extractor = KeywordExtractor::new(&vocab(&["machine learning", "rust"]), 3000)
            .with_miner(FixedMiner(vec![
                span("Machine Learning", SpanKind::NounPhrase),
                span("the team", SpanKind::NounPhrase),
                span("Acme Software Platform", SpanKind::Entity),
            ]));

        let found = extractor.extract("A role on the team building things.");
        assert_eq!(found, BTreeSet::from(["machine learning".to_string()]));
    }

    #[test]
    fn indicator_flag_without_miner_keeps_vocabulary_only() {
        let extractor = KeywordExtractor::new(&vocab(&["rust"]), 3000).admit_indicator_entities(true);
        let found = extractor.extract("Rust work on the Acme Software Platform.");
        assert_eq!(found, ["rust".to_string()].into());
    }

    #[test]
    fn indicator_entities_need_opt_in() {
        let miner = || FixedMiner(vec![span("Acme Software Platform", SpanKind::Entity)]);
        let text = "Join us to build the Acme Software Platform.";

        let strict = KeywordExtractor::new(&vocab(&["rust"]), 3000).with_miner(miner());
        assert!(strict.extract(text).is_empty());

        let open = KeywordExtractor::new(&vocab(&["rust"]), 3000)
            .with_miner(miner())
            .admit_indicator_entities(true);
        assert!(open.extract(text).contains("acme software platform"));
    }
}
