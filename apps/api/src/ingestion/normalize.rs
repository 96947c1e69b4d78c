//! Result normalizer: fills missing required fields from hints, dedups and caps
//! list fields, and truncates long strings. Runs on every parser output.

use std::collections::HashSet;

use crate::ingestion::models::{
    JobPosting, MetaHints, DEFAULT_COMPANY, DEFAULT_DESCRIPTION, DEFAULT_LOCATION, DEFAULT_TITLE,
};
use crate::ingestion::text::truncate_chars;

pub const MAX_SKILLS: usize = 20;
pub const MAX_REQUIREMENTS: usize = 15;
pub const MAX_RESPONSIBILITIES: usize = 15;
pub const MAX_ITEM_CHARS: usize = 500;
pub const MAX_DESCRIPTION_CHARS: usize = 5_000;
pub const MAX_HEADLINE_CHARS: usize = 200;
const MAX_OPTIONAL_CHARS: usize = 100;

pub fn finalize(mut posting: JobPosting, hints: &MetaHints) -> JobPosting {
    posting.title = required(&posting.title, hints.title.as_deref(), DEFAULT_TITLE, MAX_HEADLINE_CHARS);
    posting.company = required(&posting.company, hints.company.as_deref(), DEFAULT_COMPANY, MAX_HEADLINE_CHARS);
    posting.location = required(&posting.location, hints.location.as_deref(), DEFAULT_LOCATION, MAX_HEADLINE_CHARS);
    posting.description = required(
        &posting.description,
        hints.description.as_deref(),
        DEFAULT_DESCRIPTION,
        MAX_DESCRIPTION_CHARS,
    );

    if posting.job_type.is_none() {
        posting.job_type = hints.employment_type.clone();
    }
    for field in [
        &mut posting.salary_range,
        &mut posting.job_type,
        &mut posting.work_arrangement,
        &mut posting.experience_level,
    ] {
        *field = field
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| truncate_chars(s, MAX_OPTIONAL_CHARS).to_string());
    }

    posting.skills = clean_list(std::mem::take(&mut posting.skills), MAX_SKILLS);
    posting.requirements = clean_list(std::mem::take(&mut posting.requirements), MAX_REQUIREMENTS);
    posting.responsibilities =
        clean_list(std::mem::take(&mut posting.responsibilities), MAX_RESPONSIBILITIES);
    posting
}

/// Keeps `current` unless it is blank or still the placeholder, in which case
/// the hint (then the placeholder) takes its place.
fn required(current: &str, hint: Option<&str>, placeholder: &str, cap: usize) -> String {
    let current = current.trim();
    let hint = hint.map(str::trim).filter(|h| !h.is_empty());
    let chosen = match hint {
        Some(h) if current.is_empty() || current == placeholder => h,
        _ if current.is_empty() => placeholder,
        _ => current,
    };
    truncate_chars(chosen, cap).trim_end().to_string()
}

/// Trims items, drops blanks and case-insensitive duplicates (first wins), caps length and count.
fn clean_list(items: Vec<String>, max_items: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter_map(|item| {
            let item = truncate_chars(item.trim(), MAX_ITEM_CHARS).trim_end().to_string();
            (!item.is_empty() && seen.insert(item.to_lowercase())).then_some(item)
        })
        .take(max_items)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::models::JobSource;

    #[test]
    fn test_placeholders_are_replaced_by_hints() {
        let hints = MetaHints {
            title: Some("Platform Engineer".to_string()),
            company: Some("Acme".to_string()),
            employment_type: Some("Full-time".to_string()),
            ..Default::default()
        };
        let posting = finalize(JobPosting::placeholder(JobSource::Pattern), &hints);
        assert_eq!(posting.title, "Platform Engineer");
        assert_eq!(posting.company, "Acme");
        assert_eq!(posting.location, DEFAULT_LOCATION);
        assert_eq!(posting.description, DEFAULT_DESCRIPTION);
        assert_eq!(posting.job_type.as_deref(), Some("Full-time"));
    }

    #[test]
    fn test_real_values_win_over_hints() {
        let mut posting = JobPosting::placeholder(JobSource::Ai);
        posting.title = "Staff Engineer".to_string();
        let hints = MetaHints {
            title: Some("Something else".to_string()),
            ..Default::default()
        };
        assert_eq!(finalize(posting, &hints).title, "Staff Engineer");
    }

    #[test]
    fn test_blank_required_fields_get_placeholders() {
        let mut posting = JobPosting::placeholder(JobSource::Ai);
        posting.title = "   ".to_string();
        posting.company = String::new();
        let posting = finalize(posting, &MetaHints::default());
        assert_eq!(posting.title, DEFAULT_TITLE);
        assert_eq!(posting.company, DEFAULT_COMPANY);
    }

    #[test]
    fn test_lists_are_deduped_and_capped() {
        let mut posting = JobPosting::placeholder(JobSource::Ai);
        posting.skills = (0..40).map(|i| format!("skill {i}")).collect();
        posting.skills.insert(0, "Rust".to_string());
        posting.skills.insert(1, " rust ".to_string());
        posting.skills.insert(2, "".to_string());
        posting.requirements = vec!["x".repeat(MAX_ITEM_CHARS + 50)];

        let posting = finalize(posting, &MetaHints::default());
        assert_eq!(posting.skills.len(), MAX_SKILLS);
        assert_eq!(posting.skills[0], "Rust");
        assert_eq!(posting.skills[1], "skill 0");
        assert_eq!(posting.requirements[0].chars().count(), MAX_ITEM_CHARS);
    }

    #[test]
    fn test_description_is_truncated() {
        let mut posting = JobPosting::placeholder(JobSource::Ai);
        posting.description = "é".repeat(MAX_DESCRIPTION_CHARS + 10);
        let posting = finalize(posting, &MetaHints::default());
        assert_eq!(posting.description.chars().count(), MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn test_blank_optionals_are_dropped() {
        let mut posting = JobPosting::placeholder(JobSource::Ai);
        posting.salary_range = Some("  ".to_string());
        posting.work_arrangement = Some(" Remote ".to_string());
        let posting = finalize(posting, &MetaHints::default());
        assert!(posting.salary_range.is_none());
        assert_eq!(posting.work_arrangement.as_deref(), Some("Remote"));
    }
}
