use serde::{Deserialize, Serialize};

/// Placeholder values used when a required field cannot be recovered.
pub const DEFAULT_TITLE: &str = "Job Position";
pub const DEFAULT_COMPANY: &str = "Company";
pub const DEFAULT_LOCATION: &str = "Not specified";
pub const DEFAULT_DESCRIPTION: &str = "No description available";

// ────────────────────────────────────────────────────────────────────────────
// Intermediate documents
// ────────────────────────────────────────────────────────────────────────────

/// One successful retrieval. Created by the fetcher, consumed once by the pipeline.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub final_url: String,
    pub status_code: u16,
    pub raw_body: String,
    pub redirect_count: usize,
}

/// Tag-free text derived from a raw body. Always within the normalizer's length cap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlainText(String);

impl PlainText {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

/// Structured hints pulled from well-known markup conventions.
/// Absence is `None`; an empty string never stands in for "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetaHints {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub employment_type: Option<String>,
}

impl MetaHints {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.company.is_none()
            && self.location.is_none()
            && self.description.is_none()
            && self.employment_type.is_none()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output contract
// ────────────────────────────────────────────────────────────────────────────

/// Which parsing strategy produced a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobSource {
    Ai,
    Pattern,
}

/// The structured job returned by `POST /extract-job`.
///
/// `title`, `company`, `location` and `description` are never empty and the list
/// fields are always present; the result normalizer enforces the caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub skills: Vec<String>,
    pub requirements: Vec<String>,
    pub responsibilities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_arrangement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
    pub source: JobSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl JobPosting {
    /// A posting with every required field set to its placeholder.
    pub fn placeholder(source: JobSource) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            company: DEFAULT_COMPANY.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            skills: Vec::new(),
            requirements: Vec::new(),
            responsibilities: Vec::new(),
            salary_range: None,
            job_type: None,
            work_arrangement: None,
            experience_level: None,
            source,
            note: None,
            source_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posting_serializes_camel_case_and_skips_absent_optionals() {
        let mut posting = JobPosting::placeholder(JobSource::Pattern);
        posting.salary_range = Some("$120,000 - $150,000".to_string());

        let value = serde_json::to_value(&posting).unwrap();
        assert_eq!(value["salaryRange"], "$120,000 - $150,000");
        assert_eq!(value["source"], "pattern");
        assert!(value["skills"].is_array());
        assert!(value.get("jobType").is_none());
        assert!(value.get("note").is_none());
    }

    #[test]
    fn test_source_serde_lowercase() {
        let source: JobSource = serde_json::from_str(r#""ai""#).unwrap();
        assert_eq!(source, JobSource::Ai);
    }

    #[test]
    fn test_empty_hints() {
        assert!(MetaHints::default().is_empty());
        let hints = MetaHints {
            company: Some("Acme".to_string()),
            ..Default::default()
        };
        assert!(!hints.is_empty());
    }
}
