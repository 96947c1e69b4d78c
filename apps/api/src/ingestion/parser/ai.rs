//! AI-assisted strategy. Runs first when a completion service is configured.
//!
//! The model's reply is never trusted: the first balanced JSON object is pulled
//! out of it and every field is coerced to its expected type. Any failure is
//! returned as a `ParseError` so the chain can move on; nothing here retries.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::ingestion::models::{
    JobPosting, JobSource, MetaHints, PlainText, DEFAULT_COMPANY, DEFAULT_DESCRIPTION,
    DEFAULT_LOCATION, DEFAULT_TITLE,
};
use crate::ingestion::parser::{JobParser, ParseError};
use crate::ingestion::prompts::{build_extract_prompt, JOB_EXTRACT_SYSTEM};
use crate::ingestion::text::truncate_chars;
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_INVENTION_INSTRUCTION};
use crate::llm_client::{extract_json_object, CompletionRequest, CompletionService};

/// Page text sent to the model, in characters.
const MAX_PROMPT_TEXT_CHARS: usize = 6_000;
const TEMPERATURE: f32 = 0.15;
const MAX_OUTPUT_TOKENS: u32 = 2_048;
const MAX_LIST_ITEMS: usize = 20;
const FALLBACK_DESCRIPTION_CHARS: usize = 1_000;

pub struct AiParser {
    service: Arc<dyn CompletionService>,
}

impl AiParser {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    fn build_request(&self, text: &PlainText, hints: &MetaHints) -> Result<CompletionRequest, ParseError> {
        let hints_json = serde_json::to_string_pretty(hints)?;
        let content = truncate_chars(text.as_str(), MAX_PROMPT_TEXT_CHARS);
        Ok(CompletionRequest {
            system_instructions: format!(
                "{JOB_EXTRACT_SYSTEM} {JSON_ONLY_SYSTEM} {NO_INVENTION_INSTRUCTION}"
            ),
            user_content: build_extract_prompt(&hints_json, content),
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        })
    }
}

#[async_trait]
impl JobParser for AiParser {
    fn name(&self) -> &'static str {
        "ai"
    }

    async fn parse(&self, text: &PlainText, hints: &MetaHints) -> Result<JobPosting, ParseError> {
        let request = self.build_request(text, hints)?;
        let reply = self.service.complete(&request).await?;
        debug!("Completion reply received ({} chars)", reply.len());

        let raw = extract_json_object(&reply).ok_or(ParseError::NoJson)?;
        let value: Value = serde_json::from_str(raw)?;
        coerce_posting(&value, text, hints)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Coercion
// ────────────────────────────────────────────────────────────────────────────

/// Maps an untrusted JSON value onto `JobPosting`, falling back to hints and
/// placeholders field by field.
fn coerce_posting(value: &Value, text: &PlainText, hints: &MetaHints) -> Result<JobPosting, ParseError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ParseError::Schema("top-level value is not an object".to_string()))?;

    let title = string_field(obj, &["title"]);
    let company = string_field(obj, &["company"]);
    let description = string_field(obj, &["description"]);
    if title.is_none() && company.is_none() && description.is_none() {
        return Err(ParseError::Schema(
            "no title, company or description in reply".to_string(),
        ));
    }

    let description = description
        .or_else(|| hints.description.clone())
        .or_else(|| {
            let head = truncate_chars(text.as_str(), FALLBACK_DESCRIPTION_CHARS).trim();
            (!head.is_empty()).then(|| head.to_string())
        })
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    Ok(JobPosting {
        title: title
            .or_else(|| hints.title.clone())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        company: company
            .or_else(|| hints.company.clone())
            .unwrap_or_else(|| DEFAULT_COMPANY.to_string()),
        location: string_field(obj, &["location"])
            .or_else(|| hints.location.clone())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        description,
        skills: string_list(obj.get("skills")),
        requirements: string_list(obj.get("requirements")),
        responsibilities: string_list(obj.get("responsibilities")),
        salary_range: string_field(obj, &["salary_range", "salaryRange"]),
        job_type: string_field(obj, &["job_type", "jobType"])
            .or_else(|| hints.employment_type.clone()),
        work_arrangement: string_field(obj, &["work_arrangement", "workArrangement"]),
        experience_level: string_field(obj, &["experience_level", "experienceLevel"]),
        source: JobSource::Ai,
        note: None,
        source_url: None,
    })
}

/// First key holding a usable string. Blank strings and "null"-like values count as absent.
fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let s = obj.get(*key)?.as_str()?.trim();
        let lowered = s.to_ascii_lowercase();
        if s.is_empty() || matches!(lowered.as_str(), "null" | "none" | "n/a" | "unknown") {
            None
        } else {
            Some(s.to_string())
        }
    })
}

/// Non-arrays become `[]`; non-string and blank items are dropped.
fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(MAX_LIST_ITEMS)
        .map(str::to_string)
        .collect()
}
