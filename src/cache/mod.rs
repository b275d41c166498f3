//! On-disk cache of station metadata, download offsets and observations.
//!
//! # Layout
//!
//! ```text
//! <cache>/v2/<source>/
//!   metadata/<station-id>.json           StationMetadata incl. remote links
//!   <station-id>/downloads.json          DownloadLedger (resume offsets)
//!   <station-id>/<YYYY>/<MM>/<DD>.json   ObservationRecord batch for that UTC day
//! ```
//!
//! # Write Strategy
//!
//! | File         | Mode                                          |
//! |--------------|-----------------------------------------------|
//! | metadata     | overwritten on every save                     |
//! | downloads    | overwritten after each successful fetch       |
//! | observations | merged with the existing day, never truncated |
//!
//! Every write goes to a temporary file in the destination directory and is
//! renamed over the target, so readers never see a half-written file. There is
//! no locking: two runs against the same station must not overlap.

pub mod station;

pub use station::StationCache;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::AppResult;
use crate::sources::Source;

/// Bumped whenever the cached record format changes incompatibly.
pub const CACHE_VERSION: &str = "v2";

/// Directory layout for one source inside the cache root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    #[must_use]
    pub fn new(cache_dir: &Path, source: Source) -> Self {
        Self {
            root: cache_dir.join(CACHE_VERSION).join(source.as_str()),
        }
    }

    /// Create the source directory and its `metadata/` subdirectory.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the directories cannot be created.
    pub fn create(&self) -> AppResult<()> {
        fs::create_dir_all(self.metadata_dir())?;
        Ok(())
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join("metadata")
    }

    #[must_use]
    pub fn metadata_path(&self, station_id: &str) -> PathBuf {
        self.metadata_dir().join(format!("{station_id}.json"))
    }

    #[must_use]
    pub fn station_dir(&self, station_id: &str) -> PathBuf {
        self.root.join(station_id)
    }

    #[must_use]
    pub fn downloads_path(&self, station_id: &str) -> PathBuf {
        self.station_dir(station_id).join("downloads.json")
    }

    #[must_use]
    pub fn observations_path(&self, station_id: &str, date: chrono::NaiveDate) -> PathBuf {
        self.station_dir(station_id)
            .join(date.format("%Y").to_string())
            .join(date.format("%m").to_string())
            .join(format!("{}.json", date.format("%d")))
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path`.
///
/// # Errors
///
/// Returns an error if serialization, the temporary write, or the rename fails.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let mut body = serde_json::to_vec_pretty(value)?;
    body.push(b'\n');
    write_atomic(path, &body)
}

/// Write `body` to a temporary file next to `path` and rename it into place.
///
/// # Errors
///
/// Returns an error if the directory, the temporary write, or the rename fails.
pub fn write_atomic(path: &Path, body: &[u8]) -> AppResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(body)?;
    temp.as_file().sync_all()?;
    temp.persist(path)?;

    tracing::debug!(path = %path.display(), bytes = body.len(), "Cache file written");
    Ok(())
}

/// Read a JSON file, returning `None` if it does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
