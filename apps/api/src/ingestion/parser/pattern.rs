//! Pattern-based strategy, the always-available fallback.
//!
//! Algorithm:
//! 1. Title / company / location: metadata hints first, then a short ordered
//!    list of line-anchored patterns over the normalized text.
//! 2. Sections: scan line by line for "responsibilities" / "requirements"
//!    style headers and collect the bulleted lines under each (capped).
//! 3. Skills: the keyword table, in table order, matched on word boundaries.
//! 4. Salary, job type, work arrangement and seniority from fixed patterns.
//!
//! Never fails: sparse input yields placeholders, not an error.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::ingestion::models::{JobPosting, JobSource, MetaHints, PlainText, DEFAULT_DESCRIPTION};
use crate::ingestion::parser::{JobParser, ParseError};
use crate::ingestion::tables::SiteTables;
use crate::ingestion::text::{truncate_chars, MAX_TEXT_CHARS};

const MAX_SECTION_BULLETS: usize = 10;
const MAX_SKILLS: usize = 15;
const MAX_FALLBACK_DESCRIPTION_CHARS: usize = 1_000;
const MAX_HEADER_CHARS: usize = 60;
const MAX_HEADER_WORDS: usize = 6;
const MIN_BULLET_CHARS: usize = 3;
/// Below this much body text, present metadata suggests a gated page.
const SHORT_BODY_CHARS: usize = 600;

const BULLET_GLYPHS: &[char] = &['•', '-', '*', '·', '–', '▪', '◦', '‣', '●', '○', '■'];

const RESPONSIBILITY_HEADERS: &[&str] = &[
    "responsibilit",
    "what you'll do",
    "what you will do",
    "what you’ll do",
    "duties",
    "your impact",
    "in this role",
    "day to day",
    "day-to-day",
];

const REQUIREMENT_HEADERS: &[&str] = &[
    "requirement",
    "qualification",
    "what you'll need",
    "what you will need",
    "what you’ll need",
    "what we're looking for",
    "what we’re looking for",
    "who you are",
    "must have",
    "nice to have",
    "bonus points",
    "skills and experience",
];

/// Headers that close whatever section is open.
const OTHER_HEADERS: &[&str] = &[
    "about",
    "benefits",
    "perks",
    "compensation",
    "salary",
    "why join",
    "why you'll love",
    "equal opportunity",
    "how to apply",
    "our values",
    "the team",
];

const NOT_A_COMPANY: &[&str] = &["the role", "the job", "the team", "us", "you", "this role", "the position"];

pub const LOGIN_WALL_NOTE: &str = "Some details may be hidden behind a login wall. \
    Paste the full job description for a complete result.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Responsibilities,
    Requirements,
}

pub struct PatternParser {
    tables: Arc<SiteTables>,
    title_patterns: Vec<Regex>,
    company_patterns: Vec<Regex>,
    location_patterns: Vec<Regex>,
    salary_patterns: Vec<Regex>,
}

impl PatternParser {
    pub fn new(tables: Arc<SiteTables>) -> Self {
        Self {
            tables,
            title_patterns: compile_all(&[
                r"(?im)^(?:job title|position|role)\s*[:\-–]\s*(.{3,100})$",
                r"(?m)^([A-Z][A-Za-z/&+,. -]{0,60}?\b(?:Engineer|Developer|Manager|Designer|Analyst|Scientist|Architect|Specialist|Consultant|Director|Administrator|Coordinator|Intern)\b[^\n]{0,40})$",
            ]),
            company_patterns: compile_all(&[
                r"(?im)^(?:company|company name|employer|organization)\s*[:\-–]\s*(.{2,80})$",
                r"(?m)^About\s+([A-Z][A-Za-z0-9&.' -]{1,60})$",
            ]),
            location_patterns: compile_all(&[
                r"(?im)^(?:location|job location|office location|based in)\s*[:\-–]\s*(.{2,80})$",
                r"(?m)^((?:[A-Z][a-z]+ ){0,2}[A-Z][a-z]+, [A-Z]{2})(?:\s|$)",
            ]),
            salary_patterns: compile_all(&[
                r"\$\s?\d{1,3}(?:,\d{3})+(?:\.\d{2})?(?:\s*(?:-|–|to)\s*\$?\s?\d{1,3}(?:,\d{3})+(?:\.\d{2})?)?",
                r"\$\s?\d{2,3}(?:\.\d)?[kK](?:\s*(?:-|–|to)\s*\$?\s?\d{2,3}(?:\.\d)?[kK])?",
            ]),
        }
    }

    /// Synchronous core, shared by the trait impl and the pipeline's tests.
    pub fn extract(&self, text: &PlainText, hints: &MetaHints) -> JobPosting {
        // Input is already capped by the normalizer; enforce again before matching.
        let text = truncate_chars(text.as_str(), MAX_TEXT_CHARS);
        let lower = text.to_lowercase();
        let mut posting = JobPosting::placeholder(JobSource::Pattern);

        if let Some(title) = hints.title.clone().or_else(|| first_capture(&self.title_patterns, text)) {
            posting.title = title;
        }
        if let Some(company) = hints.company.clone().or_else(|| self.find_company(text)) {
            posting.company = company;
        }

        posting.work_arrangement = detect_work_arrangement(&lower);
        let location = hints
            .location
            .clone()
            .or_else(|| first_capture(&self.location_patterns, text))
            .or_else(|| {
                (posting.work_arrangement.as_deref() == Some("Remote")).then(|| "Remote".to_string())
            });
        if let Some(location) = location {
            posting.location = location;
        }

        posting.description = hints
            .description
            .clone()
            .or_else(|| leading_paragraphs(text))
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        let (responsibilities, requirements) = collect_sections(text);
        posting.responsibilities = responsibilities;
        posting.requirements = requirements;
        posting.skills = self.match_skills(&lower);

        posting.salary_range = self
            .salary_patterns
            .iter()
            .find_map(|re| re.find(text))
            .map(|m| m.as_str().trim().to_string());
        posting.job_type = hints
            .employment_type
            .clone()
            .or_else(|| detect_job_type(&lower));
        posting.experience_level = detect_experience_level(&posting.title.to_lowercase(), &lower);

        if self.looks_truncated(&lower, text, hints) {
            posting.note = Some(LOGIN_WALL_NOTE.to_string());
        }

        posting
    }

    fn find_company(&self, text: &str) -> Option<String> {
        self.company_patterns.iter().find_map(|re| {
            re.captures_iter(text)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().trim().trim_end_matches(':').trim())
                .find(|name| !name.is_empty() && !NOT_A_COMPANY.contains(&name.to_lowercase().as_str()))
                .map(str::to_string)
        })
    }

    fn match_skills(&self, lower: &str) -> Vec<String> {
        let mut skills: Vec<String> = Vec::new();
        for keyword in &self.tables.skills {
            if skills.len() == MAX_SKILLS {
                break;
            }
            if contains_word(lower, &keyword.needle) && !skills.contains(&keyword.display) {
                skills.push(keyword.display.clone());
            }
        }
        skills
    }

    fn looks_truncated(&self, lower: &str, text: &str, hints: &MetaHints) -> bool {
        let marker = self
            .tables
            .truncation_markers
            .iter()
            .any(|m| lower.contains(m.as_str()));
        let short_despite_metadata =
            text.chars().count() < SHORT_BODY_CHARS && (hints.title.is_some() || hints.description.is_some());
        marker || short_despite_metadata
    }
}

#[async_trait]
impl JobParser for PatternParser {
    fn name(&self) -> &'static str {
        "pattern"
    }

    async fn parse(&self, text: &PlainText, hints: &MetaHints) -> Result<JobPosting, ParseError> {
        Ok(self.extract(text, hints))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Line and keyword helpers
// ────────────────────────────────────────────────────────────────────────────

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid pattern-parser regex"))
        .collect()
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Responsibilities and requirements, in that order, each capped.
fn collect_sections(text: &str) -> (Vec<String>, Vec<String>) {
    let mut responsibilities = Vec::new();
    let mut requirements = Vec::new();
    let mut current: Option<Section> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(item) = bullet_text(line) {
            let bucket = match current {
                Some(Section::Responsibilities) => &mut responsibilities,
                Some(Section::Requirements) => &mut requirements,
                None => continue,
            };
            if bucket.len() < MAX_SECTION_BULLETS && item.chars().count() >= MIN_BULLET_CHARS {
                bucket.push(item.to_string());
            }
            continue;
        }

        if let Some(header) = classify_header(line) {
            current = header;
        }
    }

    (responsibilities, requirements)
}

/// Text after a leading bullet glyph, if the line is bulleted.
fn bullet_text(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(BULLET_GLYPHS)?;
    let rest = rest.trim_start();
    // "--" rules and "**bold**" runs are not bullets.
    if rest.is_empty() || rest.starts_with(BULLET_GLYPHS) {
        return None;
    }
    Some(rest)
}

/// `Some(Some(section))` opens a section, `Some(None)` closes one, `None` means
/// the line is ordinary text.
fn classify_header(line: &str) -> Option<Option<Section>> {
    let heading = line.trim_end_matches(':').trim();
    if heading.chars().count() > MAX_HEADER_CHARS
        || heading.split_whitespace().count() > MAX_HEADER_WORDS
        || heading.ends_with('.')
    {
        return None;
    }
    let lower = heading.to_lowercase();

    if RESPONSIBILITY_HEADERS.iter().any(|h| lower.contains(h)) {
        return Some(Some(Section::Responsibilities));
    }
    if REQUIREMENT_HEADERS.iter().any(|h| lower.contains(h)) {
        return Some(Some(Section::Requirements));
    }
    if OTHER_HEADERS.iter().any(|h| lower.starts_with(h)) {
        return Some(None);
    }
    None
}

/// `needle` occurs in `haystack` with no alphanumeric character on either side.
pub(crate) fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn detect_work_arrangement(lower: &str) -> Option<String> {
    let label = if contains_word(lower, "hybrid") {
        "Hybrid"
    } else if contains_word(lower, "remote") {
        "Remote"
    } else if ["on-site", "onsite", "in-office", "in office"]
        .iter()
        .any(|w| contains_word(lower, w))
    {
        "On-site"
    } else {
        return None;
    };
    Some(label.to_string())
}

fn detect_job_type(lower: &str) -> Option<String> {
    let label = if contains_word(lower, "full-time") || contains_word(lower, "full time") {
        "Full-time"
    } else if contains_word(lower, "part-time") || contains_word(lower, "part time") {
        "Part-time"
    } else if contains_word(lower, "internship") {
        "Internship"
    } else if contains_word(lower, "contract") || contains_word(lower, "contractor") {
        "Contract"
    } else if contains_word(lower, "temporary") {
        "Temporary"
    } else {
        return None;
    };
    Some(label.to_string())
}

fn detect_experience_level(title_lower: &str, lower: &str) -> Option<String> {
    let from_title = if ["principal", "staff", "lead", "head", "director"]
        .iter()
        .any(|w| contains_word(title_lower, w))
    {
        Some("Lead")
    } else if contains_word(title_lower, "senior") || contains_word(title_lower, "sr") {
        Some("Senior")
    } else if ["junior", "jr", "intern", "graduate", "entry"]
        .iter()
        .any(|w| contains_word(title_lower, w))
    {
        Some("Entry")
    } else {
        None
    };

    let label = from_title.or_else(|| {
        if lower.contains("entry level") || lower.contains("entry-level") {
            Some("Entry")
        } else if lower.contains("mid-level") || lower.contains("mid level") {
            Some("Mid")
        } else if lower.contains("senior level") || lower.contains("senior-level") {
            Some("Senior")
        } else {
            None
        }
    })?;
    Some(label.to_string())
}

/// Opening non-bullet lines of the body, up to the fallback description cap.
fn leading_paragraphs(text: &str) -> Option<String> {
    let mut out = String::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || bullet_text(line).is_some() || classify_header(line).is_some() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
        if out.chars().count() >= MAX_FALLBACK_DESCRIPTION_CHARS {
            break;
        }
    }
    let out = truncate_chars(&out, MAX_FALLBACK_DESCRIPTION_CHARS).trim().to_string();
    (!out.is_empty()).then_some(out)
}
