//! # podcast-manifest
//!
//! Rebuilds a numbered episode manifest for a podcast feed.
//!
//! Every feed entry gets a stable, zero-padded sequence number based on its
//! publish date, plus a transcript URL. A WebVTT transcript the feed offers is
//! used only after it has been verified to exist; otherwise the entry points at
//! a statically hosted `{num}.vtt`. The result is written as a CSV file that is
//! replaced on every run.
//!
//! ## Quick Start
//!
//! ```no_run
//! use podcast_manifest::{Config, ManifestRebuilder};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rebuilder = ManifestRebuilder::new(Config::default())?;
//!     let summary = rebuilder.run().await?;
//!     println!("{} rows written to {}", summary.rows, summary.path.display());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Feed fetching and parsing
pub mod feed;
/// Manifest rows and numbering
pub mod manifest;
/// Chronological ordering of entries
pub mod ordering;
/// Pipeline orchestration
pub mod rebuild;
/// Transcript URL resolution
pub mod transcript;
/// CSV validation and output
pub mod writer;


// Re-export commonly used types
pub use config::Config;
pub use error::{DuplicateNumber, Error, Result};
pub use feed::{FeedEntry, FeedLink, FeedSource, HttpFeedSource};
pub use manifest::{ManifestBuilder, ManifestRow};
pub use ordering::{DatedEntry, Timestamp, order_entries};
pub use rebuild::{ManifestRebuilder, RebuildSummary};
pub use transcript::{
    HttpProbe, TranscriptProbe, TranscriptResolution, TranscriptResolver, TranscriptSource,
    VttCheck, has_real_vtt,
};
pub use writer::{read_manifest, write_manifest};
