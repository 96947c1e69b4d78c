//! Fixed lookup tables for the ingestion pipeline.
//!
//! Built once at startup with [`SiteTables::builtin`] and handed to the validator,
//! fetcher and parsers explicitly. Nothing here is mutated after construction.

/// A site-specific rewrite applied after sanitization. Pure path/query rewrites only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRewrite {
    /// LinkedIn search/collection URLs carrying `currentJobId=<id>` collapse to
    /// the single-job view `/jobs/view/<id>/`.
    LinkedInCurrentJob,
}

/// An exactly-matched job-board host and its server-owned canonical origin.
#[derive(Debug, Clone)]
pub struct HostRule {
    pub host: String,
    pub origin: String,
    pub query_keys: Vec<String>,
    pub rewrite: Option<PathRewrite>,
    /// First sanitized path segment names the employer (e.g. `/acme/123`).
    pub company_from_path: bool,
}

/// A trusted registrable domain; any well-formed subdomain of it is accepted.
#[derive(Debug, Clone)]
pub struct SuffixRule {
    pub suffix: String,
    pub query_keys: Vec<String>,
    pub company_from_path: bool,
}

/// A skill keyword: lowercase needle matched against body text, and display form.
#[derive(Debug, Clone)]
pub struct SkillKeyword {
    pub needle: String,
    pub display: String,
}

#[derive(Debug, Clone)]
pub struct SiteTables {
    pub hosts: Vec<HostRule>,
    pub suffixes: Vec<SuffixRule>,
    pub skills: Vec<SkillKeyword>,
    pub login_wall_markers: Vec<String>,
    pub truncation_markers: Vec<String>,
}

/// What the validator learns about a permitted host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteMatch<'a> {
    /// `https://<host>` built only from table constants and validated labels.
    pub origin: String,
    pub query_keys: &'a [String],
    pub rewrite: Option<PathRewrite>,
    pub company_from_path: bool,
}

const MAX_SUBDOMAIN_LABELS: usize = 4;
const MAX_LABEL_LEN: usize = 63;

impl SiteTables {
    /// Looks a lower-cased hostname up in the exact table, then the suffix table.
    pub fn lookup(&self, host: &str) -> Option<SiteMatch<'_>> {
        if let Some(rule) = self.hosts.iter().find(|r| r.host == host) {
            return Some(SiteMatch {
                origin: rule.origin.clone(),
                query_keys: &rule.query_keys,
                rewrite: rule.rewrite,
                company_from_path: rule.company_from_path,
            });
        }

        for rule in &self.suffixes {
            let Some(prefix) = host
                .strip_suffix(rule.suffix.as_str())
                .and_then(|p| p.strip_suffix('.'))
            else {
                continue;
            };
            let labels: Vec<&str> = prefix.split('.').collect();
            if labels.len() > MAX_SUBDOMAIN_LABELS || !labels.iter().all(|l| is_valid_label(l)) {
                return None;
            }
            // Rebuilt from checked labels and the table's own suffix string.
            let origin = format!("https://{}.{}", labels.join("."), rule.suffix);
            return Some(SiteMatch {
                origin,
                query_keys: &rule.query_keys,
                rewrite: None,
                company_from_path: rule.company_from_path,
            });
        }

        None
    }

    pub fn builtin() -> Self {
        let hosts = vec![
            host("boards.greenhouse.io", "https://boards.greenhouse.io", &["gh_jid"], None, true),
            host("job-boards.greenhouse.io", "https://job-boards.greenhouse.io", &["gh_jid"], None, true),
            host("jobs.lever.co", "https://jobs.lever.co", &[], None, true),
            host("jobs.ashbyhq.com", "https://jobs.ashbyhq.com", &[], None, true),
            host("apply.workable.com", "https://apply.workable.com", &[], None, true),
            host("jobs.smartrecruiters.com", "https://jobs.smartrecruiters.com", &[], None, true),
            host(
                "www.linkedin.com",
                "https://www.linkedin.com",
                &["currentJobId"],
                Some(PathRewrite::LinkedInCurrentJob),
                false,
            ),
            host(
                "linkedin.com",
                "https://www.linkedin.com",
                &["currentJobId"],
                Some(PathRewrite::LinkedInCurrentJob),
                false,
            ),
            host("www.indeed.com", "https://www.indeed.com", &["jk", "vjk"], None, false),
            host("indeed.com", "https://www.indeed.com", &["jk", "vjk"], None, false),
            host("www.glassdoor.com", "https://www.glassdoor.com", &["jl"], None, false),
            host("wellfound.com", "https://wellfound.com", &[], None, false),
            host("www.ziprecruiter.com", "https://www.ziprecruiter.com", &[], None, false),
            host("www.builtin.com", "https://builtin.com", &[], None, false),
            host("builtin.com", "https://builtin.com", &[], None, false),
        ];

        let suffixes = vec![
            suffix("greenhouse.io", &["gh_jid"], false),
            suffix("lever.co", &[], false),
            suffix("myworkdayjobs.com", &[], false),
            suffix("ashbyhq.com", &[], false),
            suffix("workable.com", &[], false),
            suffix("smartrecruiters.com", &[], false),
            suffix("icims.com", &["mode"], false),
            suffix("bamboohr.com", &[], false),
            suffix("recruitee.com", &[], false),
        ];

        let skills = [
            ("python", "Python"),
            ("javascript", "JavaScript"),
            ("typescript", "TypeScript"),
            ("java", "Java"),
            ("rust", "Rust"),
            ("golang", "Go"),
            ("c++", "C++"),
            ("c#", "C#"),
            ("ruby", "Ruby"),
            ("kotlin", "Kotlin"),
            ("swift", "Swift"),
            ("scala", "Scala"),
            ("php", "PHP"),
            ("sql", "SQL"),
            ("postgresql", "PostgreSQL"),
            ("mysql", "MySQL"),
            ("mongodb", "MongoDB"),
            ("redis", "Redis"),
            ("kafka", "Kafka"),
            ("react", "React"),
            ("angular", "Angular"),
            ("vue", "Vue"),
            ("node.js", "Node.js"),
            ("django", "Django"),
            ("flask", "Flask"),
            ("spring", "Spring"),
            ("graphql", "GraphQL"),
            ("rest", "REST"),
            ("aws", "AWS"),
            ("azure", "Azure"),
            ("gcp", "GCP"),
            ("docker", "Docker"),
            ("kubernetes", "Kubernetes"),
            ("terraform", "Terraform"),
            ("ci/cd", "CI/CD"),
            ("git", "Git"),
            ("linux", "Linux"),
            ("machine learning", "Machine Learning"),
            ("pytorch", "PyTorch"),
            ("tensorflow", "TensorFlow"),
            ("data analysis", "Data Analysis"),
            ("tableau", "Tableau"),
            ("excel", "Excel"),
            ("figma", "Figma"),
            ("agile", "Agile"),
            ("scrum", "Scrum"),
            ("product management", "Product Management"),
            ("project management", "Project Management"),
            ("communication", "Communication"),
            ("leadership", "Leadership"),
        ]
        .into_iter()
        .map(|(needle, display)| SkillKeyword {
            needle: needle.to_string(),
            display: display.to_string(),
        })
        .collect();

        Self {
            hosts,
            suffixes,
            skills,
            login_wall_markers: strings(&[
                "authwall",
                "sign in",
                "sign-in",
                "log in",
                "login",
                "join now",
            ]),
            truncation_markers: strings(&[
                "show more",
                "see more",
                "sign in to see",
                "join to see",
                "…more",
            ]),
        }
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !label.starts_with('-')
        && !label.ends_with('-')
}

fn host(
    host: &str,
    origin: &str,
    query_keys: &[&str],
    rewrite: Option<PathRewrite>,
    company_from_path: bool,
) -> HostRule {
    HostRule {
        host: host.to_string(),
        origin: origin.to_string(),
        query_keys: strings(query_keys),
        rewrite,
        company_from_path,
    }
}

fn suffix(suffix: &str, query_keys: &[&str], company_from_path: bool) -> SuffixRule {
    SuffixRule {
        suffix: suffix.to_string(),
        query_keys: strings(query_keys),
        company_from_path,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_host_uses_table_origin() {
        let tables = SiteTables::builtin();
        let site = tables.lookup("linkedin.com").unwrap();
        assert_eq!(site.origin, "https://www.linkedin.com");
        assert_eq!(site.rewrite, Some(PathRewrite::LinkedInCurrentJob));
    }

    #[test]
    fn test_suffix_host_rebuilds_origin() {
        let tables = SiteTables::builtin();
        let site = tables.lookup("acme.wd5.myworkdayjobs.com").unwrap();
        assert_eq!(site.origin, "https://acme.wd5.myworkdayjobs.com");
    }

    #[test]
    fn test_bare_suffix_is_not_a_subdomain() {
        let tables = SiteTables::builtin();
        assert!(tables.lookup("myworkdayjobs.com").is_none());
        assert!(tables.lookup("evilmyworkdayjobs.com").is_none());
    }

    #[test]
    fn test_suffix_rejects_malformed_labels() {
        let tables = SiteTables::builtin();
        assert!(tables.lookup("-bad.lever.co").is_none());
        assert!(tables.lookup("a..lever.co").is_none());
        assert!(tables.lookup("a.b.c.d.e.lever.co").is_none());
    }

    #[test]
    fn test_unknown_host() {
        let tables = SiteTables::builtin();
        assert!(tables.lookup("example.com").is_none());
        assert!(tables.lookup("lever.co.evil.com").is_none());
    }
}
