//! Structured Job Parser — pluggable, trait-based strategies over normalized text.
//!
//! `AiParser` (completion service, optional) runs first; `PatternParser`
//! (pure-Rust, deterministic, always available) is the final fallback.
//! `AppState` holds a `ParserChain` built once at startup.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::fallback::first_success;
use crate::ingestion::models::{JobPosting, MetaHints, PlainText};
use crate::llm_client::LlmError;

pub mod ai;
pub mod pattern;

pub use ai::AiParser;
pub use pattern::PatternParser;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("completion service failed: {0}")]
    Completion(#[from] LlmError),

    #[error("no JSON object in model output")]
    NoJson,

    #[error("malformed JSON in model output: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("model output does not match the job schema: {0}")]
    Schema(String),

    #[error("no parsing strategies configured")]
    NoStrategies,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// One parsing strategy. Implementations must fill every required `JobPosting`
/// field, using placeholders for anything they cannot recover.
#[async_trait]
pub trait JobParser: Send + Sync {
    fn name(&self) -> &'static str;

    async fn parse(&self, text: &PlainText, hints: &MetaHints) -> Result<JobPosting, ParseError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Chain
// ────────────────────────────────────────────────────────────────────────────

/// Strategies tried in order until one succeeds. Each gets one attempt.
#[derive(Clone)]
pub struct ParserChain {
    parsers: Vec<Arc<dyn JobParser>>,
}

impl ParserChain {
    pub fn new(parsers: Vec<Arc<dyn JobParser>>) -> Self {
        Self { parsers }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    pub async fn parse(&self, text: &PlainText, hints: &MetaHints) -> Result<JobPosting, ParseError> {
        let posting = first_success(
            "job parser",
            self.parsers.iter(),
            |parser| parser.parse(text, hints),
            |_| true,
        )
        .await
        .map_err(|e| e.unwrap_or(ParseError::NoStrategies))?;

        info!("Job parsed by {:?} strategy", posting.source);
        Ok(posting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::models::JobSource;

    struct Failing;

    #[async_trait]
    impl JobParser for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn parse(&self, _: &PlainText, _: &MetaHints) -> Result<JobPosting, ParseError> {
            Err(ParseError::NoJson)
        }
    }

    struct Fixed(JobSource);

    #[async_trait]
    impl JobParser for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn parse(&self, _: &PlainText, _: &MetaHints) -> Result<JobPosting, ParseError> {
            Ok(JobPosting::placeholder(self.0))
        }
    }

    #[tokio::test]
    async fn test_chain_falls_through_to_next_strategy() {
        let chain = ParserChain::new(vec![Arc::new(Failing), Arc::new(Fixed(JobSource::Pattern))]);
        let posting = chain
            .parse(&PlainText::default(), &MetaHints::default())
            .await
            .unwrap();
        assert_eq!(posting.source, JobSource::Pattern);
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_success() {
        let chain = ParserChain::new(vec![
            Arc::new(Fixed(JobSource::Ai)),
            Arc::new(Fixed(JobSource::Pattern)),
        ]);
        let posting = chain
            .parse(&PlainText::default(), &MetaHints::default())
            .await
            .unwrap();
        assert_eq!(posting.source, JobSource::Ai);
    }

    #[tokio::test]
    async fn test_empty_chain_errors() {
        let chain = ParserChain::new(vec![]);
        let err = chain
            .parse(&PlainText::default(), &MetaHints::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::NoStrategies));
    }
}
