//! Feed fetching and parsing.
//!
//! The feed is fetched once per run and parsed as RSS 2.0, falling back to Atom.
//! Each item is flattened into a [`FeedEntry`] that exposes the raw fields later
//! stages need: free-form date strings, pre-parsed timestamps, identifiers, the
//! iTunes episode tag and every typed link (alternate, enclosure, transcript).

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::time::Duration;
use tracing::{debug, info};

/// A link attached to a feed entry, with its declared relation and media type
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedLink {
    /// Link target
    pub href: String,

    /// Link relation ("alternate", "enclosure", "transcript", ...)
    pub rel: Option<String>,

    /// Declared media type (e.g. "text/vtt", "audio/mpeg")
    pub mime_type: Option<String>,
}

impl FeedLink {
    /// Create a link with the given relation and optional media type
    pub fn new(href: impl Into<String>, rel: &str, mime_type: Option<&str>) -> Self {
        Self {
            href: href.into(),
            rel: Some(rel.to_string()),
            mime_type: mime_type.map(str::to_string),
        }
    }
}

/// One podcast episode as exposed by the feed parser
///
/// All fields are optional because feeds in the wild omit almost anything.
/// Date information is kept in two tiers: free-form strings exactly as they
/// appeared in the document, and timestamps the parser already understood.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedEntry {
    /// Episode title
    pub title: Option<String>,

    /// Canonical episode page
    pub link: Option<String>,

    /// Entry identifier (Atom id, or RSS guid)
    pub id: Option<String>,

    /// RSS guid
    pub guid: Option<String>,

    /// Free-form publication date (RSS pubDate)
    pub published: Option<String>,

    /// Free-form update date (atom:updated / dcterms:modified inside RSS)
    pub updated: Option<String>,

    /// Free-form creation date (dcterms:created)
    pub created: Option<String>,

    /// Free-form Dublin Core date (dc:date)
    pub date: Option<String>,

    /// Publication timestamp already parsed by the feed format (Atom published)
    pub published_parsed: Option<DateTime<FixedOffset>>,

    /// Update timestamp already parsed by the feed format (Atom updated)
    pub updated_parsed: Option<DateTime<FixedOffset>>,

    /// Raw `itunes:episode` value
    pub itunes_episode: Option<String>,

    /// Typed links
    pub links: Vec<FeedLink>,
}

/// Source of feed entries
///
/// The production implementation is [`HttpFeedSource`]; tests substitute
/// in-memory sources so ordering and manifest logic run without a network.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse every entry of the feed
    ///
    /// # Errors
    ///
    /// Any failure here is fatal for the run: transport errors, non-success
    /// status codes and documents that are neither RSS nor Atom.
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>>;
}

/// Fetches the feed over HTTP using the shared client
pub struct HttpFeedSource {
    http_client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpFeedSource {
    /// Create a feed source for `url` backed by `http_client`
    pub fn new(http_client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client,
            url: url.into(),
            timeout,
        }
    }

    /// The feed URL this source fetches
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>> {
        debug!("Fetching feed: {}", self.url);

        let response = self
            .http_client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?;

        // Check HTTP status before trying to parse the response body
        let status = response.status();
        if !status.is_success() {
            return Err(Error::FeedStatus {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let content = response.text().await?;
        let entries = parse_feed(&content)?;

        info!(url = %self.url, entries = entries.len(), "Fetched feed");
        Ok(entries)
    }
}

/// Parse a feed document, trying RSS first and then Atom
pub fn parse_feed(content: &str) -> Result<Vec<FeedEntry>> {
    match parse_as_rss(content) {
        Ok(entries) => {
            debug!("Parsed feed as RSS, found {} items", entries.len());
            Ok(entries)
        }
        Err(rss_err) => {
            debug!("Failed to parse as RSS: {}, trying Atom", rss_err);
            match parse_as_atom(content) {
                Ok(entries) => {
                    debug!("Parsed feed as Atom, found {} entries", entries.len());
                    Ok(entries)
                }
                Err(atom_err) => Err(Error::FeedParse {
                    rss: rss_err,
                    atom: atom_err,
                }),
            }
        }
    }
}

fn parse_as_rss(content: &str) -> std::result::Result<Vec<FeedEntry>, String> {
    let channel = content
        .parse::<rss::Channel>()
        .map_err(|e| e.to_string())?;

    let entries = channel
        .items()
        .iter()
        .map(|item| {
            let extensions = item.extensions();
            let guid = item.guid().and_then(|g| non_empty(g.value()));

            let mut links = Vec::new();
            if let Some(link) = item.link().and_then(non_empty) {
                links.push(FeedLink::new(link, "alternate", None));
            }
            // A permalink guid stands in for a missing <link>
            let link = item.link().and_then(non_empty).or_else(|| {
                item.guid()
                    .filter(|g| g.is_permalink())
                    .and_then(|g| non_empty(g.value()))
            });
            if let Some(enclosure) = item.enclosure()
                && !enclosure.url().trim().is_empty()
            {
                links.push(FeedLink::new(
                    enclosure.url(),
                    "enclosure",
                    non_empty(enclosure.mime_type()).as_deref(),
                ));
            }
            // <podcast:transcript url="..." type="text/vtt"/>
            if let Some(transcripts) = extensions.get("podcast").and_then(|m| m.get("transcript"))
            {
                for transcript in transcripts {
                    let attrs = transcript.attrs();
                    if let Some(url) = attrs.get("url").and_then(|u| non_empty(u)) {
                        links.push(FeedLink::new(
                            url,
                            "transcript",
                            attrs.get("type").map(String::as_str),
                        ));
                    }
                }
            }

            let date = item
                .dublin_core_ext()
                .and_then(|dc| dc.dates().first())
                .and_then(|d| non_empty(d));

            let updated = rss_extension_value(extensions, "atom", "updated")
                .or_else(|| rss_extension_value(extensions, "dcterms", "modified"));

            FeedEntry {
                title: item.title().and_then(non_empty),
                link,
                id: guid.clone(),
                guid,
                published: item.pub_date().and_then(non_empty),
                updated,
                created: rss_extension_value(extensions, "dcterms", "created"),
                date,
                published_parsed: None,
                updated_parsed: None,
                itunes_episode: item
                    .itunes_ext()
                    .and_then(|it| it.episode())
                    .and_then(non_empty),
                links,
            }
        })
        .collect();

    Ok(entries)
}

fn parse_as_atom(content: &str) -> std::result::Result<Vec<FeedEntry>, String> {
    let feed = atom_syndication::Feed::read_from(content.as_bytes()).map_err(|e| e.to_string())?;

    let entries = feed
        .entries()
        .iter()
        .map(|entry| {
            let links: Vec<FeedLink> = entry
                .links()
                .iter()
                .filter(|link| !link.href().trim().is_empty())
                .map(|link| FeedLink::new(link.href(), link.rel(), link.mime_type()))
                .collect();

            // Canonical link: first alternate, else whatever comes first
            let link = links
                .iter()
                .find(|l| l.rel.as_deref() == Some("alternate"))
                .or_else(|| links.first())
                .map(|l| l.href.clone());

            let itunes_episode = entry
                .extensions()
                .get("itunes")
                .and_then(|m| m.get("episode"))
                .and_then(|values| values.first())
                .and_then(|ext| ext.value())
                .and_then(non_empty);

            FeedEntry {
                title: non_empty(entry.title().as_str()),
                link,
                id: non_empty(entry.id()),
                guid: None,
                published: None,
                updated: None,
                created: None,
                date: None,
                published_parsed: entry.published().copied(),
                updated_parsed: Some(*entry.updated()),
                itunes_episode,
                links,
            }
        })
        .collect();

    Ok(entries)
}

fn rss_extension_value(
    extensions: &rss::extension::ExtensionMap,
    prefix: &str,
    name: &str,
) -> Option<String> {
    extensions
        .get(prefix)
        .and_then(|m| m.get(name))
        .and_then(|values| values.first())
        .and_then(|ext| ext.value())
        .and_then(non_empty)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
