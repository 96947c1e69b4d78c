//! Metadata Extractor: structured hints from well-known markup conventions.
//!
//! Sources, strongest first: JSON-LD `JobPosting` blocks, Open Graph / Twitter /
//! `description` meta tags, then `<title>`. Patterns run over the raw markup but
//! only their capture groups are used, and every capture is tag-stripped and
//! entity-decoded before it becomes a hint.

use regex::Regex;
use serde_json::Value;

use crate::ingestion::models::MetaHints;
use crate::ingestion::text::{decode_entities, to_plain_text, truncate_chars};

/// Only this much of the document is scanned for metadata.
const MAX_SCAN_BYTES: usize = 1_000_000;
const MAX_JSON_LD_BYTES: usize = 200_000;
const MAX_HINT_CHARS: usize = 300;
const MAX_DESCRIPTION_CHARS: usize = 5_000;

/// `og:site_name` values that name the board rather than the employer.
const BOARD_NAMES: &[&str] = &[
    "linkedin",
    "indeed",
    "glassdoor",
    "greenhouse",
    "lever",
    "workday",
    "ashby",
    "workable",
    "smartrecruiters",
    "ziprecruiter",
    "wellfound",
];

pub struct MetadataExtractor {
    title_re: Regex,
    meta_re: Regex,
    attr_re: Regex,
    json_ld_re: Regex,
    composite_re: Regex,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct MetaTags {
    og_title: Option<String>,
    twitter_title: Option<String>,
    og_description: Option<String>,
    description: Option<String>,
    twitter_description: Option<String>,
    site_name: Option<String>,
}

impl MetadataExtractor {
    pub fn new() -> Self {
        Self {
            title_re: Regex::new(r"(?is)<title[^>]{0,256}>([^<]{1,500})</title")
                .expect("valid title regex"),
            meta_re: Regex::new(r"(?i)<meta\s[^>]{1,1024}>").expect("valid meta regex"),
            attr_re: Regex::new(
                r#"(?i)([a-z][a-z0-9:_-]{0,40})\s*=\s*(?:"([^"]{0,1024})"|'([^']{0,1024})')"#,
            )
            .expect("valid attribute regex"),
            json_ld_re: Regex::new(
                r#"(?is)<script[^>]{0,256}type\s*=\s*["']application/ld\+json["'][^>]{0,256}>(.*?)</script"#,
            )
            .expect("valid json-ld regex"),
            composite_re: Regex::new(
                r"^(.{1,120}?) hiring (.{1,200}?) in (.{1,120}?)(?:\s*\|\s*LinkedIn)?$",
            )
            .expect("valid composite title regex"),
        }
    }

    /// Pulls title/company/location/description hints. Every field is optional.
    pub fn extract(&self, html: &str) -> MetaHints {
        let html = truncate_bytes(html, MAX_SCAN_BYTES);

        let mut hints = self.json_ld_hints(html).unwrap_or_default();
        let tags = self.meta_tags(html);

        let raw_title = tags
            .og_title
            .clone()
            .or_else(|| tags.twitter_title.clone())
            .or_else(|| self.document_title(html));

        if let Some(title) = raw_title {
            match self.split_composite(&title) {
                Some((company, role, location)) => {
                    hints.title.get_or_insert(role);
                    hints.company.get_or_insert(company);
                    hints.location.get_or_insert(location);
                }
                None => {
                    if let Some(bare) = clean(strip_board_suffix(&title)) {
                        hints.title.get_or_insert(bare);
                    }
                }
            }
        }

        if hints.company.is_none() {
            hints.company = tags
                .site_name
                .filter(|name| !is_board_name(name));
        }

        if hints.description.is_none() {
            hints.description = tags
                .og_description
                .or(tags.description)
                .or(tags.twitter_description);
        }

        hints
    }

    fn document_title(&self, html: &str) -> Option<String> {
        self.title_re
            .captures(html)
            .and_then(|c| c.get(1))
            .and_then(|m| clean(m.as_str()))
    }

    fn meta_tags(&self, html: &str) -> MetaTags {
        let mut tags = MetaTags::default();

        for tag in self.meta_re.find_iter(html) {
            let mut key: Option<String> = None;
            let mut content: Option<String> = None;

            for attr in self.attr_re.captures_iter(tag.as_str()) {
                let name = attr[1].to_ascii_lowercase();
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .map_or("", |m| m.as_str());
                match name.as_str() {
                    "property" | "name" => key = Some(value.to_ascii_lowercase()),
                    "content" => content = clean(value),
                    _ => {}
                }
            }

            let (Some(key), Some(content)) = (key, content) else {
                continue;
            };
            let slot = match key.as_str() {
                "og:title" => &mut tags.og_title,
                "twitter:title" => &mut tags.twitter_title,
                "og:description" => &mut tags.og_description,
                "description" => &mut tags.description,
                "twitter:description" => &mut tags.twitter_description,
                "og:site_name" => &mut tags.site_name,
                _ => continue,
            };
            slot.get_or_insert(content);
        }

        tags
    }

    fn json_ld_hints(&self, html: &str) -> Option<MetaHints> {
        for cap in self.json_ld_re.captures_iter(html) {
            let raw = cap.get(1).map_or("", |m| m.as_str()).trim();
            if raw.is_empty() || raw.len() > MAX_JSON_LD_BYTES {
                continue;
            }
            let Ok(value) = serde_json::from_str::<Value>(raw) else {
                continue;
            };
            if let Some(node) = find_job_posting(&value, 0) {
                return Some(hints_from_job_posting(node));
            }
        }
        None
    }

    /// `"<Company> hiring <Title> in <Location>"`, as LinkedIn titles its pages.
    fn split_composite(&self, title: &str) -> Option<(String, String, String)> {
        let caps = self.composite_re.captures(title.trim())?;
        Some((
            clean(&caps[1])?,
            clean(&caps[2])?,
            clean(&caps[3])?,
        ))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// JSON-LD
// ────────────────────────────────────────────────────────────────────────────

const MAX_JSON_LD_DEPTH: usize = 6;

fn find_job_posting(value: &Value, depth: usize) -> Option<&Value> {
    if depth > MAX_JSON_LD_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            if is_job_posting_type(map.get("@type")) {
                return Some(value);
            }
            map.get("@graph")
                .and_then(|graph| find_job_posting(graph, depth + 1))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|item| find_job_posting(item, depth + 1)),
        _ => None,
    }
}

fn is_job_posting_type(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => s.eq_ignore_ascii_case("JobPosting"),
        Some(Value::Array(items)) => items
            .iter()
            .any(|v| v.as_str().is_some_and(|s| s.eq_ignore_ascii_case("JobPosting"))),
        _ => false,
    }
}

fn hints_from_job_posting(node: &Value) -> MetaHints {
    let title = node.get("title").and_then(Value::as_str).and_then(clean);

    let company = match node.get("hiringOrganization") {
        Some(Value::String(name)) => clean(name),
        Some(org) => org.get("name").and_then(Value::as_str).and_then(clean),
        None => None,
    };

    let remote = node
        .get("jobLocationType")
        .and_then(Value::as_str)
        .is_some_and(|t| t.eq_ignore_ascii_case("TELECOMMUTE"));
    let location = node
        .get("jobLocation")
        .and_then(|loc| match loc {
            Value::Array(items) => items.first(),
            other => Some(other),
        })
        .and_then(|loc| loc.get("address"))
        .and_then(format_address)
        .or_else(|| remote.then(|| "Remote".to_string()));

    let description = node
        .get("description")
        .and_then(Value::as_str)
        .map(|d| to_plain_text(&decode_entities(d)))
        .and_then(|text| {
            let text = truncate_chars(text.as_str(), MAX_DESCRIPTION_CHARS).trim().to_string();
            (!text.is_empty()).then_some(text)
        });

    let employment_type = match node.get("employmentType") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Array(items)) => items.iter().find_map(Value::as_str),
        _ => None,
    }
    .and_then(humanize_employment_type);

    MetaHints {
        title,
        company,
        location,
        description,
        employment_type,
    }
}

fn format_address(address: &Value) -> Option<String> {
    if let Some(text) = address.as_str() {
        return clean(text);
    }
    let parts: Vec<String> = ["addressLocality", "addressRegion", "addressCountry"]
        .iter()
        .filter_map(|key| match address.get(*key)? {
            Value::String(s) => clean(s),
            other => other.get("name").and_then(Value::as_str).and_then(clean),
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn humanize_employment_type(raw: &str) -> Option<String> {
    let label = match raw.to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
        "FULL_TIME" => "Full-time",
        "PART_TIME" => "Part-time",
        "CONTRACTOR" | "CONTRACT" => "Contract",
        "TEMPORARY" => "Temporary",
        "INTERN" | "INTERNSHIP" => "Internship",
        "PER_DIEM" => "Per diem",
        "VOLUNTEER" => "Volunteer",
        _ => return clean(raw),
    };
    Some(label.to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Strips stray tags, decodes entities, collapses whitespace; `None` when empty.
fn clean(raw: &str) -> Option<String> {
    let text = to_plain_text(raw);
    let joined = text.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
    let joined = truncate_chars(&joined, MAX_HINT_CHARS).trim().to_string();
    (!joined.is_empty()).then_some(joined)
}

fn strip_board_suffix(title: &str) -> &str {
    let trimmed = title.trim();
    match trimmed.rsplit_once(" | ") {
        Some((head, tail)) if is_board_name(tail) => head,
        _ => trimmed,
    }
}

fn is_board_name(name: &str) -> bool {
    let lowered = name.trim().to_ascii_lowercase();
    BOARD_NAMES.iter().any(|board| lowered == *board)
}

fn truncate_bytes(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
