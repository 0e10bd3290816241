//! Manifest validation and CSV serialization.
//!
//! The whole manifest is validated and serialized in memory before the output
//! file is touched, so a run either replaces the file completely or leaves the
//! previous one in place.

use crate::error::{DuplicateNumber, Error, Result};
use crate::manifest::ManifestRow;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Sequence numbers used by more than one row, with every title involved
///
/// Sorted by number; titles appear in row order.
pub fn find_duplicates(rows: &[ManifestRow]) -> Vec<DuplicateNumber> {
    let mut by_num: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for row in rows {
        by_num
            .entry(row.num.as_str())
            .or_default()
            .push(row.title.clone());
    }

    by_num
        .into_iter()
        .filter(|(_, titles)| titles.len() > 1)
        .map(|(num, titles)| DuplicateNumber {
            num: num.to_string(),
            titles,
        })
        .collect()
}

/// Fail with [`Error::DuplicateNumbers`] if any sequence number repeats
pub fn validate_unique(rows: &[ManifestRow]) -> Result<()> {
    let duplicates = find_duplicates(rows);
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(Error::DuplicateNumbers(duplicates))
    }
}

/// Serialize rows to CSV bytes, header first
pub fn to_csv_bytes(rows: &[ManifestRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        // serde only emits a header together with the first record
        writer.write_record(MANIFEST_COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
}

/// Column order of the manifest CSV
pub const MANIFEST_COLUMNS: [&str; 12] = [
    "num",
    "title",
    "link",
    "guid",
    "pub_date",
    "itunes_episode",
    "is_noise",
    "transcript_url_feed",
    "transcript_url_raw",
    "transcript_url_jsdelivr",
    "transcript_url_final",
    "vtt_source",
];

/// Validate `rows` and write them to `path`, replacing any previous file
///
/// Returns the number of rows written. Nothing is written when validation or
/// serialization fails.
pub fn write_manifest(path: &Path, rows: &[ManifestRow]) -> Result<usize> {
    validate_unique(rows)?;

    let bytes = to_csv_bytes(rows)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Writing manifest");
    std::fs::write(path, bytes)?;

    info!(path = %path.display(), rows = rows.len(), "Manifest written");
    Ok(rows.len())
}

/// Read a manifest CSV back into rows
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<ManifestRow>, csv::Error>>()?;
    Ok(rows)
}
