use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::ingestion::fetcher::{ReqwestTransport, SafeFetcher};
use crate::ingestion::metadata::MetadataExtractor;
use crate::ingestion::parser::{AiParser, JobParser, ParserChain, PatternParser};
use crate::ingestion::pipeline::JobPipeline;
use crate::ingestion::tables::SiteTables;
use crate::ingestion::validator::UrlValidator;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
/// Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<JobPipeline>,
}

impl AppState {
    /// Wires the production pipeline: built-in site tables, the reqwest transport,
    /// and the AI parser only when an API key is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let tables = Arc::new(SiteTables::builtin());
        let validator = Arc::new(UrlValidator::new(tables.clone()));

        let transport = ReqwestTransport::new(config.fetch_timeout, config.fetch_max_body_bytes)
            .context("Failed to build fetch transport")?;
        let fetcher = SafeFetcher::new(Arc::new(transport), validator.clone(), config.fetch_max_redirects);

        let mut parsers: Vec<Arc<dyn JobParser>> = Vec::new();
        match &config.anthropic_api_key {
            Some(key) => {
                let llm = LlmClient::new(key.clone(), config.llm_models.clone(), config.llm_timeout)
                    .context("Failed to build LLM client")?;
                info!("AI-assisted parsing enabled (models: {})", llm.models().join(", "));
                parsers.push(Arc::new(AiParser::new(Arc::new(llm))));
            }
            None => info!("ANTHROPIC_API_KEY not set; using pattern-based parsing only"),
        }
        parsers.push(Arc::new(PatternParser::new(tables)));

        let pipeline = JobPipeline::new(
            validator,
            fetcher,
            MetadataExtractor::new(),
            ParserChain::new(parsers),
        );

        Ok(Self {
            pipeline: Arc::new(pipeline),
        })
    }
}
