//! Resumable downloads of append-only source files.
//!
//! A HEAD probe compares the remote `Content-Length` against the number of bytes
//! already seen:
//!
//! | Remote length      | Action                                       |
//! |--------------------|----------------------------------------------|
//! | unknown / < offset | full GET (file was rotated or truncated)     |
//! | == offset          | nothing to do                                |
//! | > offset           | `Range: bytes=<offset>-` without compression |
//!
//! The probe also asks for the identity encoding, so a server that gzips the
//! file still reports its uncompressed length.
//!
//! Ranged bodies may start mid-file, so they never contain a header row.

use chrono::{DateTime, Utc};

use crate::common::time::parse_last_modified;
use crate::error::{AppError, AppResult};
use crate::http::HttpTransport;

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The whole remote file, starting at byte 0.
    FullData {
        body: Vec<u8>,
        content_length: u64,
        last_modified: Option<DateTime<Utc>>,
    },
    /// Bytes from the prior offset to the end of the remote file.
    PartialData {
        body: Vec<u8>,
        content_length: u64,
        last_modified: Option<DateTime<Utc>>,
    },
    NoNewData {
        content_length: u64,
        last_modified: Option<DateTime<Utc>>,
    },
    /// The ranged request came back with a status we cannot use.
    Failed { url: String, status: u16 },
}

impl FetchOutcome {
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            Self::FullData { body, .. } | Self::PartialData { body, .. } => Some(body),
            Self::NoNewData { .. } | Self::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn is_full_file(&self) -> bool {
        matches!(self, Self::FullData { .. })
    }

    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        match self {
            Self::FullData { content_length, .. }
            | Self::PartialData { content_length, .. }
            | Self::NoNewData { content_length, .. } => Some(*content_length),
            Self::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::FullData { last_modified, .. }
            | Self::PartialData { last_modified, .. }
            | Self::NoNewData { last_modified, .. } => *last_modified,
            Self::Failed { .. } => None,
        }
    }

    /// Convert a `Failed` outcome into the error callers propagate.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Download` for `Failed`.
    pub fn into_result(self) -> AppResult<Self> {
        match self {
            Self::Failed { url, status } => Err(AppError::Download { url, status }),
            other => Ok(other),
        }
    }
}

/// Download `url`, resuming after `prior_offset` bytes when possible.
///
/// # Errors
///
/// Returns an error if the HEAD probe or a full download fails. A failed ranged
/// request is reported as `FetchOutcome::Failed` instead.
pub async fn fetch(
    http: &dyn HttpTransport,
    url: &str,
    prior_offset: Option<u64>,
) -> AppResult<FetchOutcome> {
    let Some(offset) = prior_offset else {
        return fetch_full(http, url).await;
    };

    // Lengths must describe the uncompressed bytes the offset counts.
    let probe = http.head(url, &[("Accept-Encoding", "identity")]).await?;
    let last_modified = parse_last_modified(probe.header("Last-Modified"));
    let remote_length = probe
        .header("Content-Length")
        .and_then(|v| v.trim().parse::<u64>().ok());

    let Some(remote_length) = remote_length else {
        tracing::info!(url, "Remote data file has no usable Content-Length");
        return fetch_full(http, url).await;
    };

    if remote_length < offset {
        tracing::info!(
            url,
            remote_length,
            offset,
            "Remote data file length is shorter than expected"
        );
        return fetch_full(http, url).await;
    }

    if remote_length == offset {
        tracing::debug!(url, offset, "No new data");
        return Ok(FetchOutcome::NoNewData {
            content_length: offset,
            last_modified,
        });
    }

    let range = format!("bytes={offset}-");
    let response = match http
        .get(url, &[("Accept-Encoding", "identity"), ("Range", range.as_str())])
        .await
    {
        Ok(response) => response,
        Err(AppError::Download { url, status }) => {
            tracing::error!(url, status, "Error downloading partial data");
            return Ok(FetchOutcome::Failed { url, status });
        }
        Err(e) => return Err(e),
    };

    match response.status {
        416 => {
            tracing::info!(url, "No new data");
            Ok(FetchOutcome::NoNewData {
                content_length: offset,
                last_modified,
            })
        }
        206 => {
            let content_length = offset + response.body.len() as u64;
            tracing::info!(url, bytes = response.body.len(), "Downloaded partial data");
            Ok(FetchOutcome::PartialData {
                last_modified: parse_last_modified(response.header("Last-Modified"))
                    .or(last_modified),
                body: response.body,
                content_length,
            })
        }
        status => {
            tracing::error!(url, status, "Error downloading partial data");
            Ok(FetchOutcome::Failed {
                url: url.to_string(),
                status,
            })
        }
    }
}

async fn fetch_full(http: &dyn HttpTransport, url: &str) -> AppResult<FetchOutcome> {
    tracing::info!(url, "Downloading entire data file");
    let response = http.get(url, &[]).await?;

    if !response.is_success() {
        return Err(AppError::Download {
            url: url.to_string(),
            status: response.status,
        });
    }

    Ok(FetchOutcome::FullData {
        last_modified: parse_last_modified(response.header("Last-Modified")),
        content_length: response.body.len() as u64,
        body: response.body,
    })
}
