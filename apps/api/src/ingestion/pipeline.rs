//! The extract-job pipeline:
//! validate → fetch → (plain text + metadata) → parser chain → finalize.

use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::ingestion::fetcher::SafeFetcher;
use crate::ingestion::metadata::MetadataExtractor;
use crate::ingestion::models::JobPosting;
use crate::ingestion::normalize::finalize;
use crate::ingestion::parser::ParserChain;
use crate::ingestion::text::to_plain_text;
use crate::ingestion::validator::UrlValidator;

/// Below this many characters of text, a page without a title hint is unusable.
const MIN_CONTENT_CHARS: usize = 50;

pub struct JobPipeline {
    validator: Arc<UrlValidator>,
    fetcher: SafeFetcher,
    metadata: MetadataExtractor,
    parser: ParserChain,
}

impl JobPipeline {
    pub fn new(
        validator: Arc<UrlValidator>,
        fetcher: SafeFetcher,
        metadata: MetadataExtractor,
        parser: ParserChain,
    ) -> Self {
        Self {
            validator,
            fetcher,
            metadata,
            parser,
        }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.parser.strategy_names()
    }

    pub async fn extract(&self, raw_url: &str) -> Result<JobPosting, AppError> {
        let target = self
            .validator
            .validate(raw_url)
            .into_target()
            .map_err(AppError::Validation)?;

        let document = self.fetcher.fetch(&target).await?;
        debug!(
            "Document from {}: status {}, {} redirect(s)",
            document.final_url, document.status_code, document.redirect_count
        );

        let text = to_plain_text(&document.raw_body);
        let mut hints = self.metadata.extract(&document.raw_body);
        if hints.company.is_none() {
            hints.company = target.company_hint().map(str::to_string);
        }

        if text.char_len() < MIN_CONTENT_CHARS && hints.title.is_none() {
            warn!(
                "Unextractable page at {} ({} chars of text, no title hint)",
                document.final_url,
                text.char_len()
            );
            return Err(AppError::Unextractable);
        }

        let posting = self
            .parser
            .parse(&text, &hints)
            .await
            .map_err(|e| AppError::Internal(anyhow!("no parsing strategy succeeded: {e}")))?;

        let mut posting = finalize(posting, &hints);
        posting.source_url = Some(document.final_url);

        info!(
            "Extracted \"{}\" at {} via {:?}",
            posting.title, posting.company, posting.source
        );
        Ok(posting)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::ingestion::fetcher::{FetchError, HttpTransport, RawResponse};
    use crate::ingestion::models::{JobSource, DEFAULT_LOCATION};
    use crate::ingestion::parser::{AiParser, JobParser, PatternParser};
    use crate::ingestion::tables::SiteTables;
    use crate::llm_client::{CompletionRequest, CompletionService, LlmError};

    const POSTING_HTML: &str = r#"<html><head>
        <title>Senior Rust Engineer - Acme Robotics</title>
        <meta property="og:title" content="Senior Rust Engineer">
        </head><body>
        <h1>Senior Rust Engineer</h1>
        <p>Acme Robotics is hiring a Senior Rust Engineer to build our fleet platform.
        This is a remote role with a competitive salary of $150,000 - $180,000.</p>
        <h2>Responsibilities</h2>
        <ul><li>Design and build services in Rust</li><li>Operate Kubernetes clusters</li></ul>
        <h2>Requirements</h2>
        <ul><li>5+ years of backend experience</li><li>Experience with PostgreSQL and AWS</li></ul>
        </body></html>"#;

    struct PageTransport {
        status: u16,
        body: String,
        requests: Mutex<usize>,
    }

    impl PageTransport {
        fn new(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.to_string(),
                requests: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for PageTransport {
        async fn get(&self, _url: &str) -> Result<RawResponse, FetchError> {
            *self.requests.lock().unwrap() += 1;
            Ok(RawResponse {
                status: self.status,
                location: None,
                body: self.body.clone(),
            })
        }
    }

    struct DownService;

    #[async_trait]
    impl CompletionService for DownService {
        async fn complete(&self, _: &CompletionRequest) -> Result<String, LlmError> {
            Err(LlmError::Api {
                status: 503,
                message: "overloaded".to_string(),
            })
        }
    }

    /// Answers every request with the same text.
    struct CannedReply(&'static str);

    #[async_trait]
    impl CompletionService for CannedReply {
        async fn complete(&self, _: &CompletionRequest) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    fn pipeline(transport: Arc<PageTransport>, ai: Option<Arc<dyn CompletionService>>) -> JobPipeline {
        let tables = Arc::new(SiteTables::builtin());
        let validator = Arc::new(UrlValidator::new(tables.clone()));
        let mut parsers: Vec<Arc<dyn JobParser>> = Vec::new();
        if let Some(service) = ai {
            parsers.push(Arc::new(AiParser::new(service)));
        }
        parsers.push(Arc::new(PatternParser::new(tables)));

        JobPipeline::new(
            validator.clone(),
            SafeFetcher::new(transport, validator, 5),
            MetadataExtractor::new(),
            ParserChain::new(parsers),
        )
    }

    #[tokio::test]
    async fn test_ai_failure_falls_back_to_pattern() {
        let transport = PageTransport::new(200, POSTING_HTML);
        let posting = pipeline(transport, Some(Arc::new(DownService)))
            .extract("https://jobs.lever.co/acme-robotics/abc-123?utm_source=x")
            .await
            .unwrap();

        assert_eq!(posting.source, JobSource::Pattern);
        assert_eq!(posting.title, "Senior Rust Engineer");
        assert!(posting.skills.contains(&"Rust".to_string()));
        assert!(!posting.responsibilities.is_empty());
        assert_eq!(
            posting.source_url.as_deref(),
            Some("https://jobs.lever.co/acme-robotics/abc-123")
        );
    }

    #[tokio::test]
    async fn test_malformed_ai_reply_falls_back_to_pattern() {
        let transport = PageTransport::new(200, POSTING_HTML);
        let posting = pipeline(
            transport,
            Some(Arc::new(CannedReply(r#"{"title": "Senior Rust Engineer", "skills": [oops]}"#))),
        )
        .extract("https://jobs.lever.co/acme-robotics/abc-123")
        .await
        .unwrap();

        assert_eq!(posting.source, JobSource::Pattern);
        assert_eq!(posting.title, "Senior Rust Engineer");
        assert!(!posting.requirements.is_empty());
    }

    #[tokio::test]
    async fn test_well_formed_ai_reply_wins() {
        let transport = PageTransport::new(200, POSTING_HTML);
        let posting = pipeline(
            transport,
            Some(Arc::new(CannedReply(
                r#"{"title": "Senior Rust Engineer", "company": "Acme Robotics", "location": "Remote"}"#,
            ))),
        )
        .extract("https://jobs.lever.co/acme-robotics/abc-123")
        .await
        .unwrap();
        assert_eq!(posting.source, JobSource::Ai);
    }

    #[tokio::test]
    async fn test_company_hint_comes_from_path() {
        let transport = PageTransport::new(200, POSTING_HTML);
        let posting = pipeline(transport, None)
            .extract("https://jobs.lever.co/acme-robotics/abc-123")
            .await
            .unwrap();
        assert_eq!(posting.company, "Acme Robotics");
    }

    #[tokio::test]
    async fn test_rejected_url_never_fetches() {
        let transport = PageTransport::new(200, POSTING_HTML);
        let err = pipeline(transport.clone(), None)
            .extract("http://169.254.169.254/latest/meta-data")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(*transport.requests.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_page_is_unextractable() {
        let transport = PageTransport::new(200, "<html><body><div id=\"app\"></div></body></html>");
        let err = pipeline(transport, None)
            .extract("https://jobs.lever.co/acme/1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unextractable));
    }

    #[tokio::test]
    async fn test_short_page_with_title_hint_still_parses() {
        let transport = PageTransport::new(
            200,
            r#"<html><head><meta property="og:title" content="Data Engineer"></head><body></body></html>"#,
        );
        let posting = pipeline(transport, None)
            .extract("https://jobs.lever.co/acme/1")
            .await
            .unwrap();
        assert_eq!(posting.title, "Data Engineer");
        assert_eq!(posting.location, DEFAULT_LOCATION);
        assert!(!posting.description.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_required() {
        let transport = PageTransport::new(401, "");
        let err = pipeline(transport, None)
            .extract("https://jobs.lever.co/acme/1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthenticationRequired));
    }
}
