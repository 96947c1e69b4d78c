//! URL Validator & Canonicalizer — the SSRF gate in front of every outbound fetch.
//!
//! A client URL is parsed, checked against the scheme, private-address and
//! job-board allow-list gates, then rebuilt from a server-owned origin plus a
//! sanitized path and query. The client's string is never reused after that.
//!
//! Redirect targets go through the same `validate` call before being followed.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, warn};
use url::{Host, Url};

use crate::ingestion::network::{is_blocked_ip, is_local_hostname};
use crate::ingestion::tables::{PathRewrite, SiteTables};

const MAX_URL_LEN: usize = 2048;
const MAX_PATH_SEGMENTS: usize = 32;
const MAX_PATH_LEN: usize = 1024;
const MAX_QUERY_VALUE_LEN: usize = 64;

// ────────────────────────────────────────────────────────────────────────────
// Outcome types
// ────────────────────────────────────────────────────────────────────────────

/// A fetch target assembled only from table constants and allow-listed input.
/// Constructed exclusively by [`UrlValidator::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalTarget {
    origin: String,
    path: String,
    query: Vec<(String, String)>,
    company_hint: Option<String>,
}

impl CanonicalTarget {
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Employer name derived from the sanitized path on boards that host one
    /// company per path prefix.
    pub fn company_hint(&self) -> Option<&str> {
        self.company_hint.as_deref()
    }

    /// The composed fetch URL: canonical origin + sanitized path + sanitized query.
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            return format!("{}{}", self.origin, self.path);
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}{}?{}", self.origin, self.path, query)
    }
}

/// Result of one validation. Immutable; either carries a target or a reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    target: Option<CanonicalTarget>,
    reason: Option<String>,
}

impl ValidationOutcome {
    fn accepted(target: CanonicalTarget) -> Self {
        Self {
            target: Some(target),
            reason: None,
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            target: None,
            reason: Some(reason.into()),
        }
    }

    pub fn allowed(&self) -> bool {
        self.target.is_some()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn canonical_origin(&self) -> Option<&str> {
        self.target.as_ref().map(CanonicalTarget::origin)
    }

    pub fn sanitized_path(&self) -> Option<&str> {
        self.target.as_ref().map(CanonicalTarget::path)
    }

    pub fn sanitized_query(&self) -> Option<&[(String, String)]> {
        self.target.as_ref().map(CanonicalTarget::query)
    }

    pub fn target(&self) -> Option<&CanonicalTarget> {
        self.target.as_ref()
    }

    pub fn into_target(self) -> Result<CanonicalTarget, String> {
        match self.target {
            Some(target) => Ok(target),
            None => Err(self
                .reason
                .unwrap_or_else(|| "URL is not allowed".to_string())),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validator
// ────────────────────────────────────────────────────────────────────────────

pub struct UrlValidator {
    tables: Arc<SiteTables>,
}

impl UrlValidator {
    pub fn new(tables: Arc<SiteTables>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &SiteTables {
        &self.tables
    }

    /// Runs every gate in order; the first failure short-circuits.
    pub fn validate(&self, raw_url: &str) -> ValidationOutcome {
        let outcome = self.check(raw_url.trim());
        match outcome.reason() {
            Some(reason) => warn!("Rejected job URL: {reason}"),
            None => debug!(
                "Accepted job URL, canonical origin {}",
                outcome.canonical_origin().unwrap_or_default()
            ),
        }
        outcome
    }

    fn check(&self, raw_url: &str) -> ValidationOutcome {
        if raw_url.is_empty() {
            return ValidationOutcome::rejected("URL is required");
        }
        if raw_url.len() > MAX_URL_LEN {
            return ValidationOutcome::rejected("URL is too long");
        }

        let Ok(url) = Url::parse(raw_url) else {
            return ValidationOutcome::rejected("Invalid URL format");
        };

        if url.scheme() != "https" {
            return ValidationOutcome::rejected("Only HTTPS job posting URLs are supported");
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_ascii_lowercase(),
            Some(Host::Ipv4(ip)) => return reject_ip_literal(IpAddr::V4(ip)),
            Some(Host::Ipv6(ip)) => return reject_ip_literal(IpAddr::V6(ip)),
            None => return ValidationOutcome::rejected("URL has no host"),
        };
        let host = host.trim_end_matches('.');

        if is_local_hostname(host) {
            return ValidationOutcome::rejected("URLs pointing to private networks are not allowed");
        }

        let Some(site) = self.tables.lookup(host) else {
            return ValidationOutcome::rejected(format!(
                "Job board '{host}' is not supported"
            ));
        };

        let mut path = sanitize_path(url.path());
        let mut query = sanitize_query(url.query_pairs(), site.query_keys);

        if let Some(rule) = site.rewrite {
            apply_rewrite(rule, &mut path, &mut query);
        }

        let company_hint = if site.company_from_path {
            company_from_path(&path)
        } else {
            None
        };

        ValidationOutcome::accepted(CanonicalTarget {
            origin: site.origin,
            path,
            query,
            company_hint,
        })
    }
}

fn reject_ip_literal(ip: IpAddr) -> ValidationOutcome {
    if is_blocked_ip(&ip) {
        ValidationOutcome::rejected("URLs pointing to private networks are not allowed")
    } else {
        ValidationOutcome::rejected("IP address URLs are not supported; use the job board's link")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Path & query sanitization
// ────────────────────────────────────────────────────────────────────────────

/// Splits on `/`, drops empty, dot and unsafe segments, rejoins with a leading `/`.
/// Idempotent; the result never contains `.` or `..` segments.
pub fn sanitize_path(path: &str) -> String {
    let mut out = String::new();
    let mut count = 0;

    for segment in path.split('/') {
        if !is_safe_segment(segment) {
            continue;
        }
        if count == MAX_PATH_SEGMENTS || out.len() + segment.len() + 1 > MAX_PATH_LEN {
            break;
        }
        out.push('/');
        out.push_str(segment);
        count += 1;
    }

    if out.is_empty() {
        out.push('/');
    }
    out
}

fn is_safe_segment(segment: &str) -> bool {
    if segment.is_empty() {
        return false;
    }
    let lowered = segment.to_ascii_lowercase();
    // Encoded slashes and backslashes could reintroduce separators downstream.
    if lowered.contains("%2f") || lowered.contains("%5c") {
        return false;
    }
    let decoded_dots = lowered.replace("%2e", ".");
    if decoded_dots == "." || decoded_dots == ".." {
        return false;
    }
    segment.bytes().all(|b| {
        b.is_ascii_alphanumeric()
            || matches!(
                b,
                b'-' | b'.' | b'_' | b'~' | b'%' | b'!' | b'$' | b'&' | b'\'' | b'(' | b')'
                    | b'*' | b'+' | b',' | b';' | b'=' | b':' | b'@'
            )
    })
}

/// Keeps only allow-listed keys whose values are short `[A-Za-z0-9_-]+` tokens.
/// First occurrence wins; everything else is dropped silently.
pub fn sanitize_query<K, V, I>(pairs: I, allowed_keys: &[String]) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut kept: Vec<(String, String)> = Vec::new();
    for (key, value) in pairs {
        let (key, value) = (key.as_ref(), value.as_ref());
        if !allowed_keys.iter().any(|k| k == key) || !is_token(value) {
            continue;
        }
        if kept.iter().any(|(k, _)| k == key) {
            continue;
        }
        kept.push((key.to_string(), value.to_string()));
    }
    kept
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_QUERY_VALUE_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn apply_rewrite(rule: PathRewrite, path: &mut String, query: &mut Vec<(String, String)>) {
    match rule {
        PathRewrite::LinkedInCurrentJob => {
            let job_id = query
                .iter()
                .find(|(k, v)| k == "currentJobId" && v.bytes().all(|b| b.is_ascii_digit()))
                .map(|(_, v)| v.clone());
            if let Some(id) = job_id {
                if path.starts_with("/jobs") {
                    *path = format!("/jobs/view/{id}/");
                    query.clear();
                }
            }
        }
    }
}

/// Leading path segments that name a board feature rather than an employer.
const NON_EMPLOYER_SEGMENTS: &[&str] = &[
    "embed", "j", "o", "p", "jobs", "job", "careers", "apply", "view", "positions", "en",
    "en-us", "en-gb",
];

/// `/acme-corp/123` → `Acme Corp`.
fn company_from_path(path: &str) -> Option<String> {
    let slug = path.split('/').find(|s| !s.is_empty())?;
    if slug.chars().count() < 2
        || NON_EMPLOYER_SEGMENTS.contains(&slug.to_ascii_lowercase().as_str())
        || !slug
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return None;
    }
    let words: Vec<String> = slug
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() || words.iter().all(|w| w.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    Some(words.join(" "))
}
