//! Error types for podcast-manifest
//!
//! Only two conditions end a run early: the feed cannot be fetched or parsed, and
//! the built manifest contains duplicate sequence numbers. Per-entry problems
//! (unparseable dates, unreachable transcripts) are modelled as ordinary values in
//! [`crate::ordering`] and [`crate::transcript`] and never surface here.

use std::fmt;
use thiserror::Error;

/// Result type alias for podcast-manifest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for podcast-manifest
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "feed.url")
        key: Option<String>,
    },

    /// Network error while talking to the feed host
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Feed host answered with a non-success status
    #[error("feed returned HTTP {status}: {url}")]
    FeedStatus {
        /// HTTP status code returned by the feed host
        status: u16,
        /// The feed URL that was requested
        url: String,
    },

    /// Feed document is neither valid RSS nor valid Atom
    #[error("failed to parse feed as RSS or Atom. RSS error: {rss}. Atom error: {atom}")]
    FeedParse {
        /// Error reported by the RSS parser
        rss: String,
        /// Error reported by the Atom parser
        atom: String,
    },

    /// Two or more rows share a sequence number
    #[error("duplicate sequence numbers detected:\n{}", format_duplicates(.0))]
    DuplicateNumbers(Vec<DuplicateNumber>),

    /// CSV serialization or deserialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// A sequence number used by more than one manifest row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DuplicateNumber {
    /// The colliding sequence number (e.g. "007")
    pub num: String,
    /// Titles of every row carrying this number, in row order
    pub titles: Vec<String>,
}

impl fmt::Display for DuplicateNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, title) in self.titles.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}  {}", self.num, title)?;
        }
        Ok(())
    }
}

fn format_duplicates(dups: &[DuplicateNumber]) -> String {
    dups.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
