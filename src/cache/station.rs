use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::cache::{CacheLayout, read_json, write_json_atomic};
use crate::entity::{DownloadLedger, ObservationRecord, StationMetadata};
use crate::error::AppResult;

/// Cache files belonging to a single station.
#[derive(Debug, Clone)]
pub struct StationCache {
    layout: CacheLayout,
    station_id: String,
}

impl StationCache {
    #[must_use]
    pub fn new(layout: CacheLayout, station_id: &str) -> Self {
        Self {
            layout,
            station_id: station_id.to_string(),
        }
    }

    #[must_use]
    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.layout.metadata_path(&self.station_id)
    }

    /// # Errors
    ///
    /// Returns an error if the cached file exists but is unreadable.
    pub fn load_metadata(&self) -> AppResult<Option<StationMetadata>> {
        read_json(&self.metadata_path())
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_metadata(&self, metadata: &StationMetadata) -> AppResult<()> {
        write_json_atomic(&self.metadata_path(), metadata)
    }

    /// # Errors
    ///
    /// Returns an error if the ledger exists but is unreadable.
    pub fn load_downloads(&self) -> AppResult<DownloadLedger> {
        Ok(read_json(&self.layout.downloads_path(&self.station_id))?.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns an error if the ledger cannot be written.
    pub fn save_downloads(&self, ledger: &DownloadLedger) -> AppResult<()> {
        write_json_atomic(&self.layout.downloads_path(&self.station_id), ledger)
    }

    /// Merge `records` into their day partitions.
    ///
    /// Each day file stays sorted by timestamp; records identical to one already
    /// stored are dropped. Returns the paths that were written.
    ///
    /// # Errors
    ///
    /// Returns an error if a day file cannot be read or written.
    pub fn append_observations(&self, records: &[ObservationRecord]) -> AppResult<Vec<PathBuf>> {
        let mut by_date: BTreeMap<NaiveDate, Vec<ObservationRecord>> = BTreeMap::new();
        for record in records {
            by_date.entry(record.date()).or_default().push(record.clone());
        }

        let mut written = Vec::with_capacity(by_date.len());
        for (date, batch) in by_date {
            let path = self.layout.observations_path(&self.station_id, date);
            let mut day: Vec<ObservationRecord> = read_json(&path)?.unwrap_or_default();
            let before = day.len();

            day.extend(batch);
            day.sort();
            day.dedup();

            tracing::debug!(
                path = %path.display(),
                added = day.len().saturating_sub(before),
                total = day.len(),
                "Appending observations"
            );

            write_json_atomic(&path, &day)?;
            written.push(path);
        }

        Ok(written)
    }

    /// All cached observations from `first` to `last` (inclusive), in timestamp order.
    ///
    /// # Errors
    ///
    /// Returns an error if a day file exists but cannot be parsed.
    pub fn load_observations(
        &self,
        first: NaiveDate,
        last: NaiveDate,
    ) -> AppResult<Vec<ObservationRecord>> {
        let mut records = Vec::new();
        let mut date = first;
        while date <= last {
            let path = self.layout.observations_path(&self.station_id, date);
            if let Some(day) = read_json::<Vec<ObservationRecord>>(&path)? {
                records.extend(day);
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        records.sort();
        Ok(records)
    }

    /// The most recent day that has a partition on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the station directory cannot be listed.
    pub fn latest_observation_date(&self) -> AppResult<Option<NaiveDate>> {
        let station_dir = self.layout.station_dir(&self.station_id);
        let Some(year) = max_numeric_entry(&station_dir, false)? else {
            return Ok(None);
        };
        let year_dir = station_dir.join(format!("{year:04}"));
        let Some(month) = max_numeric_entry(&year_dir, false)? else {
            return Ok(None);
        };
        let month_dir = year_dir.join(format!("{month:02}"));
        let Some(day) = max_numeric_entry(&month_dir, true)? else {
            return Ok(None);
        };

        Ok(NaiveDate::from_ymd_opt(
            year,
            u32::try_from(month).unwrap_or(0),
            u32::try_from(day).unwrap_or(0),
        ))
    }
}

/// Largest numeric directory name (or `NN.json` file stem) under `dir`.
fn max_numeric_entry(dir: &std::path::Path, files: bool) -> AppResult<Option<i32>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut max = None;
    for entry in entries {
        let entry = entry?;
        let is_dir = entry.file_type()?.is_dir();
        let name = entry.file_name().to_string_lossy().into_owned();

        let number = if files && !is_dir {
            name.strip_suffix(".json").and_then(|s| s.parse::<i32>().ok())
        } else if !files && is_dir {
            name.parse::<i32>().ok()
        } else {
            None
        };

        if let Some(n) = number {
            max = max.max(Some(n));
        }
    }
    Ok(max)
}
