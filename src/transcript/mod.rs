//! Transcript URL resolution.
//!
//! Every entry gets three transcript URLs: the one the feed declares (or one
//! derived from the episode page), a raw-content fallback and a CDN mirror of
//! the fallback. The feed candidate is only trusted after it has been probed
//! and actually looks like WebVTT; otherwise the raw fallback is chosen.

use crate::config::{NUM_PLACEHOLDER, TranscriptConfig};
use crate::feed::FeedEntry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Media type of WebVTT documents
pub const VTT_MIME_TYPE: &str = "text/vtt";

/// Magic string every WebVTT file starts with
pub const VTT_SIGNATURE: &[u8] = b"WEBVTT";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Suffix appended to an episode page to guess its transcript location
const TRANSCRIPT_SUFFIX: &str = "/transcript.vtt";

/// Outcome of a HEAD request against a transcript candidate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadResponse {
    /// HTTP status code after redirects
    pub status: u16,
    /// `Content-Type` header, if present and valid
    pub content_type: Option<String>,
}

/// Outcome of a bounded GET against a transcript candidate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SniffResponse {
    /// HTTP status code after redirects
    pub status: u16,
    /// First bytes of the body, at most the requested limit
    pub prefix: Vec<u8>,
}

/// Transport-level failure (DNS, connect, timeout, broken body)
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProbeError(pub String);

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProbeError(format!("timeout: {}", e))
        } else if e.is_connect() {
            ProbeError(format!("connection failed: {}", e))
        } else {
            ProbeError(e.to_string())
        }
    }
}

/// Network access used to validate transcript candidates
///
/// [`HttpProbe`] is the production implementation; tests plug in scripted
/// probes so resolver decisions can be checked without sockets.
#[async_trait]
pub trait TranscriptProbe: Send + Sync {
    /// Issue a HEAD request, following redirects
    async fn head(&self, url: &str) -> Result<HeadResponse, ProbeError>;

    /// Issue a GET request and read at most `limit` bytes of the body
    ///
    /// Implementations must release the connection after reading the prefix
    /// instead of draining the rest of the body.
    async fn sniff(&self, url: &str, limit: usize) -> Result<SniffResponse, ProbeError>;
}

/// [`TranscriptProbe`] backed by the shared `reqwest` client
pub struct HttpProbe {
    http_client: reqwest::Client,
    head_timeout: Duration,
    fetch_timeout: Duration,
}

impl HttpProbe {
    /// Create a probe using `http_client` with the configured per-request timeouts
    pub fn new(http_client: reqwest::Client, config: &TranscriptConfig) -> Self {
        Self {
            http_client,
            head_timeout: config.head_timeout,
            fetch_timeout: config.fetch_timeout,
        }
    }
}

#[async_trait]
impl TranscriptProbe for HttpProbe {
    async fn head(&self, url: &str) -> Result<HeadResponse, ProbeError> {
        let response = self
            .http_client
            .head(url)
            .timeout(self.head_timeout)
            .send()
            .await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(HeadResponse {
            status: response.status().as_u16(),
            content_type,
        })
    }

    async fn sniff(&self, url: &str, limit: usize) -> Result<SniffResponse, ProbeError> {
        let mut response = self
            .http_client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let mut prefix = Vec::with_capacity(limit);

        if status < 400 {
            while prefix.len() < limit {
                match response.chunk().await? {
                    Some(chunk) => prefix.extend_from_slice(&chunk),
                    None => break,
                }
            }
            prefix.truncate(limit);
        }

        // Dropping the response closes the body stream; nothing past the
        // prefix is read.
        drop(response);

        Ok(SniffResponse { status, prefix })
    }
}

/// Evidence that a candidate really is a WebVTT document
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VttEvidence {
    /// HEAD reported a `text/vtt` content type
    ContentType,
    /// The body starts with the `WEBVTT` signature
    Signature,
}

/// Why a candidate was not accepted
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// The server answered with status >= 400
    HttpStatus(u16),
    /// The body does not start with `WEBVTT`
    MissingSignature,
    /// The content check could not be completed
    Unreachable(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::HttpStatus(status) => write!(f, "HTTP {}", status),
            RejectReason::MissingSignature => write!(f, "body is not WebVTT"),
            RejectReason::Unreachable(e) => write!(f, "unreachable: {}", e),
        }
    }
}

/// Result of validating a transcript candidate
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VttCheck {
    /// The candidate serves WebVTT
    Confirmed(VttEvidence),
    /// The candidate cannot be used
    Rejected(RejectReason),
}

impl VttCheck {
    /// Whether the candidate may be used as the final transcript URL
    pub fn is_real(&self) -> bool {
        matches!(self, VttCheck::Confirmed(_))
    }
}

/// Check whether `bytes` begin with the WebVTT signature
///
/// Leading whitespace and a UTF-8 byte order mark are ignored.
pub fn has_vtt_signature(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    bytes.trim_ascii_start().starts_with(VTT_SIGNATURE)
}

/// Validate that `url` serves a real WebVTT document
///
/// A HEAD request decides first: an error status rejects, a `text/vtt`
/// content type confirms. Anything else, including a HEAD transport failure,
/// falls through to a GET that inspects the first `sniff_limit` bytes.
pub async fn has_real_vtt(probe: &dyn TranscriptProbe, url: &str, sniff_limit: usize) -> VttCheck {
    match probe.head(url).await {
        Ok(head) if head.status >= 400 => {
            return VttCheck::Rejected(RejectReason::HttpStatus(head.status));
        }
        Ok(head)
            if head
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.to_ascii_lowercase().contains(VTT_MIME_TYPE)) =>
        {
            return VttCheck::Confirmed(VttEvidence::ContentType);
        }
        Ok(head) => {
            debug!(url, content_type = ?head.content_type, "HEAD inconclusive, sniffing body");
        }
        Err(e) => {
            debug!(url, "HEAD failed ({}), sniffing body", e);
        }
    }

    match probe.sniff(url, sniff_limit).await {
        Ok(response) if response.status >= 400 => {
            VttCheck::Rejected(RejectReason::HttpStatus(response.status))
        }
        Ok(response) if has_vtt_signature(&response.prefix) => {
            VttCheck::Confirmed(VttEvidence::Signature)
        }
        Ok(_) => VttCheck::Rejected(RejectReason::MissingSignature),
        Err(e) => VttCheck::Rejected(RejectReason::Unreachable(e.0)),
    }
}

/// The transcript URL the feed offers for an entry, if any
///
/// A link whose media type starts with `text/vtt` wins. Without one, the
/// episode page with `/transcript.vtt` appended is used as a guess.
pub fn feed_transcript_candidate(entry: &FeedEntry) -> Option<String> {
    let declared = entry.links.iter().find(|link| {
        !link.href.is_empty()
            && link
                .mime_type
                .as_deref()
                .is_some_and(|t| t.to_ascii_lowercase().starts_with(VTT_MIME_TYPE))
    });
    if let Some(link) = declared {
        return Some(link.href.clone());
    }

    entry
        .link
        .as_deref()
        .filter(|l| !l.is_empty())
        .map(|l| format!("{}{}", l.trim_end_matches('/'), TRANSCRIPT_SUFFIX))
}

/// Fill the `{num}` placeholder of a URL template
pub fn expand_template(template: &str, num: &str) -> String {
    template.replace(NUM_PLACEHOLDER, num)
}

/// Which candidate became the final transcript URL
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptSource {
    /// The validated feed candidate
    Feed,
    /// The raw-content fallback
    GithubRaw,
}

impl fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptSource::Feed => write!(f, "feed"),
            TranscriptSource::GithubRaw => write!(f, "github_raw"),
        }
    }
}

/// All transcript URLs computed for one entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptResolution {
    /// Feed-declared or derived candidate
    pub feed_url: Option<String>,
    /// Raw-content fallback
    pub raw_url: String,
    /// CDN mirror of the fallback
    pub cdn_url: String,
    /// URL chosen for consumption
    pub final_url: String,
    /// Origin of `final_url`
    pub source: TranscriptSource,
    /// Validation outcome of the feed candidate, `None` when there was none
    pub check: Option<VttCheck>,
}

/// Picks the best transcript URL for each entry
pub struct TranscriptResolver {
    probe: Arc<dyn TranscriptProbe>,
    raw_url_template: String,
    cdn_url_template: String,
    sniff_limit: usize,
}

impl TranscriptResolver {
    /// Create a resolver that validates candidates through `probe`
    pub fn new(probe: Arc<dyn TranscriptProbe>, config: &TranscriptConfig) -> Self {
        Self {
            probe,
            raw_url_template: config.raw_url_template.clone(),
            cdn_url_template: config.cdn_url_template.clone(),
            sniff_limit: config.sniff_limit,
        }
    }

    /// Resolve the transcript URLs for `entry` numbered `num`
    ///
    /// Never fails: an unusable feed candidate simply yields the raw fallback.
    pub async fn resolve(&self, entry: &FeedEntry, num: &str) -> TranscriptResolution {
        let raw_url = expand_template(&self.raw_url_template, num);
        let cdn_url = expand_template(&self.cdn_url_template, num);
        let feed_url = feed_transcript_candidate(entry);

        let check = match &feed_url {
            Some(url) => Some(has_real_vtt(self.probe.as_ref(), url, self.sniff_limit).await),
            None => None,
        };

        let (final_url, source) = match (&feed_url, &check) {
            (Some(url), Some(check)) if check.is_real() => {
                debug!(num, url = %url, ?check, "Using feed transcript");
                (url.clone(), TranscriptSource::Feed)
            }
            (Some(url), Some(VttCheck::Rejected(reason))) => {
                warn!(num, url = %url, "Feed transcript rejected ({}), using raw fallback", reason);
                (raw_url.clone(), TranscriptSource::GithubRaw)
            }
            _ => {
                debug!(num, "No feed transcript candidate, using raw fallback");
                (raw_url.clone(), TranscriptSource::GithubRaw)
            }
        };

        TranscriptResolution {
            feed_url,
            raw_url,
            cdn_url,
            final_url,
            source,
            check,
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
