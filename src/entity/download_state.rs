use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::http::FetchOutcome;

/// Resume bookkeeping for one remote source file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadState {
    pub url: String,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    /// Bytes of the remote file already consumed.
    #[serde(default)]
    pub content_length: Option<u64>,
    #[serde(default)]
    pub full_file: bool,
    /// Column names captured from the last full download.
    #[serde(default)]
    pub columns: Vec<String>,
}

impl DownloadState {
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        self.content_length
    }

    /// Record a fetch. `NoNewData` and `Failed` leave the state as it was.
    pub fn apply(&mut self, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::FullData {
                content_length,
                last_modified,
                ..
            } => {
                self.content_length = Some(*content_length);
                self.last_modified = *last_modified;
                self.full_file = true;
            }
            FetchOutcome::PartialData {
                content_length,
                last_modified,
                ..
            } => {
                self.content_length = Some(*content_length);
                self.last_modified = *last_modified;
                self.full_file = false;
            }
            FetchOutcome::NoNewData { .. } | FetchOutcome::Failed { .. } => {}
        }
    }
}

/// All download states of one station, persisted as `downloads.json`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLedger {
    #[serde(default)]
    pub files: Vec<DownloadState>,
}

impl DownloadLedger {
    #[must_use]
    pub fn get(&self, url: &str) -> Option<&DownloadState> {
        self.files.iter().find(|f| f.url == url)
    }

    /// State for `url`, created empty if it has never been downloaded.
    pub fn entry(&mut self, url: &str) -> &mut DownloadState {
        if let Some(index) = self.files.iter().position(|f| f.url == url) {
            &mut self.files[index]
        } else {
            self.files.push(DownloadState::new(url));
            let last = self.files.len() - 1;
            &mut self.files[last]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_new_data_keeps_offset() {
        let mut state = DownloadState::new("http://example.com/a.dat");
        state.apply(&FetchOutcome::FullData {
            body: b"abc".to_vec(),
            content_length: 3,
            last_modified: None,
        });
        state.apply(&FetchOutcome::NoNewData {
            content_length: 3,
            last_modified: None,
        });
        state.apply(&FetchOutcome::Failed {
            url: "http://example.com/a.dat".to_string(),
            status: 500,
        });

        assert_eq!(state.offset(), Some(3));
        assert!(state.full_file);
    }

    #[test]
    fn partial_data_advances_offset() {
        let mut ledger = DownloadLedger::default();
        let state = ledger.entry("http://example.com/a.dat");
        state.content_length = Some(10);
        state.apply(&FetchOutcome::PartialData {
            body: b"12345".to_vec(),
            content_length: 15,
            last_modified: None,
        });

        let state = ledger.get("http://example.com/a.dat").unwrap();
        assert_eq!(state.offset(), Some(15));
        assert!(!state.full_file);
        assert_eq!(ledger.files.len(), 1);
    }
}
