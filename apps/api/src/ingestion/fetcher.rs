//! Safe Content Fetcher — one request per hop, redirects followed manually.
//!
//! Every `Location` is joined against the current URL and pushed back through
//! the validator; the next hop always targets the re-canonicalized URL. The
//! production transport resolves DNS itself and drops private addresses.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hyper::client::connect::dns::Name;
use reqwest::dns::{Addrs, Resolve, Resolving};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::ingestion::models::FetchedDocument;
use crate::ingestion::network::is_blocked_ip;
use crate::ingestion::validator::{CanonicalTarget, UrlValidator};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bodies at or above this size are never treated as login walls.
const LOGIN_WALL_MAX_BODY_BYTES: usize = 6_000;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("redirect target rejected: {0}")]
    RedirectRejected(String),

    #[error("too many redirects (limit {0})")]
    TooManyRedirects(usize),

    #[error("redirect response without a usable Location header")]
    MissingLocation,

    #[error("request timed out")]
    Timeout,

    #[error("the job board requires signing in to view this posting")]
    AuthenticationRequired,

    #[error("job posting not found")]
    NotFound,

    #[error("job board responded with status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transport seam
// ────────────────────────────────────────────────────────────────────────────

/// One raw HTTP exchange. Redirects are never followed at this level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse, FetchError>;
}

/// `reqwest`-backed transport: no redirect following, no cookie store,
/// a guarded DNS resolver and an incremental body cap.
pub struct ReqwestTransport {
    client: Client,
    max_body_bytes: usize,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, max_body_bytes: usize) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .dns_resolver(Arc::new(GuardedResolver))
            .build()?;

        Ok(Self {
            client,
            max_body_bytes,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, FetchError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let remaining = self.max_body_bytes.saturating_sub(body.len());
            if chunk.len() >= remaining {
                body.extend_from_slice(&chunk[..remaining]);
                warn!("Response body from {url} cut at {} bytes", self.max_body_bytes);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(RawResponse {
            status,
            location,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

#[derive(Debug, Error)]
#[error("{0} resolves only to private or reserved addresses")]
struct PrivateResolution(String);

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Resolves through the system resolver, then drops every private, loopback,
/// link-local or reserved address before reqwest can connect to it.
struct GuardedResolver;

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_public(name.as_str().to_string()))
    }
}

async fn resolve_public(host: String) -> Result<Addrs, BoxError> {
    let resolved: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0)).await?.collect();
    let public: Vec<SocketAddr> = resolved
        .into_iter()
        .filter(|addr| !is_blocked_ip(&addr.ip()))
        .collect();

    if public.is_empty() {
        warn!("Refusing to connect: {host} has no public addresses");
        return Err(Box::new(PrivateResolution(host)));
    }
    Ok(Box::new(public.into_iter()))
}

// ────────────────────────────────────────────────────────────────────────────
// Fetcher
// ────────────────────────────────────────────────────────────────────────────

pub struct SafeFetcher {
    transport: Arc<dyn HttpTransport>,
    validator: Arc<UrlValidator>,
    max_redirects: usize,
}

impl SafeFetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        validator: Arc<UrlValidator>,
        max_redirects: usize,
    ) -> Self {
        Self {
            transport,
            validator,
            max_redirects,
        }
    }

    /// Fetches a validated target, following at most `max_redirects` re-validated hops.
    pub async fn fetch(&self, target: &CanonicalTarget) -> Result<FetchedDocument, FetchError> {
        let mut current = target.url();
        let mut redirect_count = 0;

        loop {
            debug!("Fetching {current} (hop {redirect_count})");
            let response = self.transport.get(&current).await?;

            if is_redirect(response.status) {
                if redirect_count >= self.max_redirects {
                    warn!("Redirect limit {} reached at {current}", self.max_redirects);
                    return Err(FetchError::TooManyRedirects(self.max_redirects));
                }
                let location = response.location.as_deref().ok_or(FetchError::MissingLocation)?;
                current = self.follow(&current, location)?;
                redirect_count += 1;
                continue;
            }

            match response.status {
                200..=299 => {}
                401 | 403 => return Err(FetchError::AuthenticationRequired),
                404 | 410 => return Err(FetchError::NotFound),
                status => return Err(FetchError::Status(status)),
            }

            if self.looks_like_login_wall(&response.body) {
                info!("Login wall detected at {current}");
                return Err(FetchError::AuthenticationRequired);
            }

            info!(
                "Fetched {current}: {} bytes after {redirect_count} redirect(s)",
                response.body.len()
            );
            return Ok(FetchedDocument {
                final_url: current,
                status_code: response.status,
                raw_body: response.body,
                redirect_count,
            });
        }
    }

    /// Resolves a `Location` against the current URL and re-validates it.
    /// Returns the re-canonicalized URL for the next hop.
    fn follow(&self, current: &str, location: &str) -> Result<String, FetchError> {
        let base = Url::parse(current).map_err(|e| FetchError::Transport(e.to_string()))?;
        let next = base
            .join(location.trim())
            .map_err(|_| FetchError::RedirectRejected("Invalid redirect URL".to_string()))?;

        let target = self
            .validator
            .validate(next.as_str())
            .into_target()
            .map_err(FetchError::RedirectRejected)?;
        Ok(target.url())
    }

    fn looks_like_login_wall(&self, body: &str) -> bool {
        if body.len() >= LOGIN_WALL_MAX_BODY_BYTES {
            return false;
        }
        let lowered = body.to_lowercase();
        self.validator
            .tables()
            .login_wall_markers
            .iter()
            .any(|marker| lowered.contains(marker.as_str()))
    }
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}
