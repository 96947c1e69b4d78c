// All LLM prompt constants for job-posting extraction.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for job extraction; combined with the shared JSON-only fragment.
pub const JOB_EXTRACT_SYSTEM: &str = "You are a job posting data extractor. \
    Read the text of a job posting page and return its structured details.";

/// Extraction prompt template. `{hints}` and `{content}` are filled by
/// [`build_extract_prompt`].
pub const JOB_EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract the job posting from the page text below.

Page metadata (may be incomplete):
{hints}

Return a JSON object with this EXACT schema (no extra fields):
{
  "title": "Senior Backend Engineer",
  "company": "Acme Corp",
  "location": "Berlin, Germany",
  "description": "Two to four sentence summary of the role",
  "skills": ["Rust", "PostgreSQL"],
  "requirements": ["5+ years building backend services"],
  "responsibilities": ["Own the billing service end to end"],
  "salary_range": "$150,000 - $180,000",
  "job_type": "Full-time",
  "work_arrangement": "Remote",
  "experience_level": "Senior"
}

Rules:
- "job_type" is one of Full-time, Part-time, Contract, Internship, Temporary, or null.
- "work_arrangement" is one of Remote, Hybrid, On-site, or null.
- "experience_level" is one of Entry, Mid, Senior, Lead, or null.
- At most 15 skills, 15 requirements and 15 responsibilities.

PAGE TEXT:
{content}"#;

/// Fills the template. `{content}` is substituted first so page text can never
/// land inside the metadata slot.
pub fn build_extract_prompt(hints_json: &str, content: &str) -> String {
    JOB_EXTRACT_PROMPT_TEMPLATE
        .replacen("{content}", content, 1)
        .replacen("{hints}", hints_json, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_filled() {
        let prompt = build_extract_prompt(r#"{"title":"SRE"}"#, "We are hiring an SRE.");
        assert!(prompt.contains(r#"{"title":"SRE"}"#));
        assert!(prompt.ends_with("We are hiring an SRE."));
        assert!(!prompt.contains("{content}"));
        assert!(!prompt.contains("{hints}"));
    }

    #[test]
    fn test_content_cannot_inject_into_hints_slot() {
        let prompt = build_extract_prompt("HINTS", "text with {hints} marker");
        assert!(prompt.contains("Page metadata (may be incomplete):\nHINTS"));
        assert!(prompt.ends_with("text with {hints} marker"));
    }
}
