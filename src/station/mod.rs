//! Stations: one per source, all behind the same download/save/upload contract.
//!
//! | Operation             | Network                              | Cache                    |
//! |-----------------------|--------------------------------------|--------------------------|
//! | download_metadata     | source GET                           | none                     |
//! | save_metadata         | none                                 | metadata/<id>.json       |
//! | upload_metadata       | SensorThings POSTs for missing links | metadata after each POST |
//! | download_observations | source GET (ranged when resumable)   | none                     |
//! | save_observations     | as download_observations             | day files, downloads.json |
//! | upload_observations   | one POST per observation             | read only                |

pub mod campbell_scientific;
pub mod data_garrison;
pub mod environment_canada;

pub use campbell_scientific::CampbellScientificStation;
pub use data_garrison::DataGarrisonStation;
pub use environment_canada::EnvironmentCanadaStation;

use std::sync::Arc;

use crate::cache::StationCache;
use crate::entity::{DatastreamDef, DownloadLedger, ObservationRecord, StationMetadata};
use crate::error::AppResult;
use crate::http::{FetchOutcome, HttpTransport, fetch};
use crate::ontology::Ontology;
use crate::sensorthings::SensorThingsClient;
use crate::sources::{RowTable, Source, SourceMetadata};
use crate::sync::{self, ObservationWindow, PropertyFilter};

/// Observations parsed by one download cycle, plus the resume state to persist
/// once they are safely stored.
#[derive(Debug, Clone, Default)]
pub struct ObservationBatch {
    pub records: Vec<ObservationRecord>,
    pub ledger: Option<DownloadLedger>,
}

/// State and behaviour shared by every station variant.
pub struct StationCore {
    pub metadata: StationMetadata,
    cache: StationCache,
    http: Arc<dyn HttpTransport>,
    ontology: Ontology,
}

impl StationCore {
    #[must_use]
    pub fn new(
        metadata: StationMetadata,
        cache: StationCache,
        http: Arc<dyn HttpTransport>,
        ontology: Ontology,
    ) -> Self {
        Self {
            metadata,
            cache,
            http,
            ontology,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &StationCache {
        &self.cache
    }

    #[must_use]
    pub fn http(&self) -> &dyn HttpTransport {
        self.http.as_ref()
    }

    /// Fold a freshly parsed source description into the cached metadata.
    ///
    /// Values the source does not report keep their cached (possibly
    /// hand-edited) value; datastreams are merged by source property id.
    pub fn apply_source_metadata(&mut self, source: SourceMetadata) {
        let metadata = &mut self.metadata;

        if source.name.is_some() {
            metadata.name = source.name;
        }
        if source.latitude.is_some() {
            metadata.latitude = source.latitude;
        }
        if source.longitude.is_some() {
            metadata.longitude = source.longitude;
        }
        if source.elevation.is_some() {
            metadata.elevation = source.elevation;
        }
        if source.timezone_offset.is_some() {
            metadata.timezone_offset = source.timezone_offset;
        }
        metadata.properties.extend(source.properties);

        let parsed: Vec<DatastreamDef> = source
            .property_defs
            .into_iter()
            .map(|property| {
                if !self.ontology.contains(&property.id) {
                    tracing::debug!(
                        station = %metadata.id,
                        property = %property.id,
                        "Property not in ontology; using generic observation type"
                    );
                }
                DatastreamDef::new(&property.id, property.units, self.ontology.resolve(&property.id))
            })
            .collect();

        tracing::info!(
            station = %metadata.id,
            datastreams = parsed.len(),
            "Parsed station metadata"
        );
        metadata.merge_datastreams(parsed);
    }

    /// # Errors
    ///
    /// Returns an error if the metadata file cannot be written.
    pub fn save_metadata(&self) -> AppResult<()> {
        self.cache.save_metadata(&self.metadata)?;
        tracing::info!(
            station = %self.metadata.id,
            path = %self.cache.metadata_path().display(),
            "Saved station metadata"
        );
        Ok(())
    }

    /// Append a batch to the observation store, then persist its resume state.
    ///
    /// # Errors
    ///
    /// Returns an error if either cache write fails.
    pub fn store(&self, batch: &ObservationBatch) -> AppResult<usize> {
        if !batch.records.is_empty() {
            self.cache.append_observations(&batch.records)?;
        }
        if let Some(ledger) = &batch.ledger {
            self.cache.save_downloads(ledger)?;
        }

        tracing::info!(
            station = %self.metadata.id,
            count = batch.records.len(),
            "Saved observations"
        );
        Ok(batch.records.len())
    }

    /// # Errors
    ///
    /// See [`sync::synchronize`].
    pub async fn upload_metadata(
        &mut self,
        destination: &str,
        filter: &PropertyFilter,
    ) -> AppResult<usize> {
        let client = SensorThingsClient::new(self.http.as_ref(), destination);
        sync::synchronize(&mut self.metadata, &self.cache, &client, filter).await
    }

    /// Load the cached days covering `window` and upload the matching records.
    ///
    /// # Errors
    ///
    /// See [`sync::upload`].
    pub async fn upload_observations(
        &self,
        destination: &str,
        window: &ObservationWindow,
        filter: &PropertyFilter,
    ) -> AppResult<usize> {
        let range = match window.date_range() {
            Some(range) => Some(range),
            None => self.cache.latest_observation_date()?.map(|day| (day, day)),
        };
        let Some((first, last)) = range else {
            tracing::info!(station = %self.metadata.id, "No cached observations to upload");
            return Ok(0);
        };

        let records = self.cache.load_observations(first, last)?;
        let client = SensorThingsClient::new(self.http.as_ref(), destination);
        sync::upload(&self.metadata, &records, window, filter, &client).await
    }
}

/// Resume `url` from its ledger entry and decode whatever arrived.
///
/// Full bodies go through `parse_full` and their columns are remembered;
/// ranged bodies are decoded against those columns. Only complete lines are
/// consumed: the recorded offset stops after the last newline, so a record cut
/// off by the server is fetched again, whole, next cycle. Returns `None` when
/// there is nothing new or the ranged request failed, in which case the ledger
/// entry is left untouched.
pub(crate) async fn fetch_table<F, G>(
    http: &dyn HttpTransport,
    ledger: &mut DownloadLedger,
    url: &str,
    parse_full: F,
    parse_rows: G,
) -> AppResult<Option<RowTable>>
where
    F: Fn(&[u8]) -> AppResult<RowTable>,
    G: Fn(&[u8], &[String]) -> AppResult<RowTable>,
{
    let state = ledger.entry(url);
    // Without captured columns a ranged body cannot be decoded.
    let offset = if state.columns.is_empty() {
        None
    } else {
        state.offset()
    };

    let outcome = fetch(http, url, offset).await?;
    let (table, consumed) = match &outcome {
        FetchOutcome::FullData { body, .. } => {
            // A file with no newline at all is kept whole.
            let end = complete_lines(body).unwrap_or(body.len());
            let table = parse_full(&body[..end])?;
            state.columns.clone_from(&table.columns);
            (Some(table), Some(end as u64))
        }
        FetchOutcome::PartialData {
            body,
            content_length,
            ..
        } => {
            let start = content_length.saturating_sub(body.len() as u64);
            let end = complete_lines(body).unwrap_or(0);
            if end < body.len() {
                tracing::debug!(
                    url,
                    trailing = body.len() - end,
                    "Holding back incomplete trailing line"
                );
            }
            let table = parse_rows(&body[..end], &state.columns)?;
            (Some(table), Some(start + end as u64))
        }
        FetchOutcome::NoNewData { .. } => (None, None),
        FetchOutcome::Failed { url, status } => {
            tracing::warn!(url = %url, status, "Skipping data file this cycle");
            return Ok(None);
        }
    };

    state.apply(&outcome);
    if consumed.is_some() {
        state.content_length = consumed;
    }
    Ok(table)
}

/// Length of `body` up to and including its last newline.
fn complete_lines(body: &[u8]) -> Option<usize> {
    body.iter().rposition(|b| *b == b'\n').map(|i| i + 1)
}

pub enum Station {
    EnvironmentCanada(EnvironmentCanadaStation),
    DataGarrison(DataGarrisonStation),
    CampbellScientific(CampbellScientificStation),
}

impl Station {
    #[must_use]
    pub fn source(&self) -> Source {
        match self {
            Self::EnvironmentCanada(_) => Source::EnvironmentCanada,
            Self::DataGarrison(_) => Source::DataGarrison,
            Self::CampbellScientific(_) => Source::CampbellScientific,
        }
    }

    fn core(&self) -> &StationCore {
        match self {
            Self::EnvironmentCanada(s) => &s.core,
            Self::DataGarrison(s) => &s.core,
            Self::CampbellScientific(s) => &s.core,
        }
    }

    fn core_mut(&mut self) -> &mut StationCore {
        match self {
            Self::EnvironmentCanada(s) => &mut s.core,
            Self::DataGarrison(s) => &mut s.core,
            Self::CampbellScientific(s) => &mut s.core,
        }
    }

    #[must_use]
    pub fn metadata(&self) -> &StationMetadata {
        &self.core().metadata
    }

    pub fn metadata_mut(&mut self) -> &mut StationMetadata {
        &mut self.core_mut().metadata
    }

    /// Fetch and parse the source's description of this station into the
    /// in-memory metadata. Nothing is written until [`Self::save_metadata`].
    ///
    /// # Errors
    ///
    /// Returns download or parse errors from the source.
    pub async fn download_metadata(&mut self) -> AppResult<()> {
        match self {
            Self::EnvironmentCanada(s) => s.download_metadata().await,
            Self::DataGarrison(s) => s.download_metadata().await,
            Self::CampbellScientific(s) => s.download_metadata().await,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the metadata file cannot be written.
    pub fn save_metadata(&self) -> AppResult<()> {
        self.core().save_metadata()
    }

    /// Create missing SensorThings entities; returns how many were created.
    ///
    /// # Errors
    ///
    /// See [`sync::synchronize`].
    pub async fn upload_metadata(
        &mut self,
        destination: &str,
        filter: &PropertyFilter,
    ) -> AppResult<usize> {
        self.core_mut().upload_metadata(destination, filter).await
    }

    /// # Errors
    ///
    /// Returns download, timestamp or parse errors from the source.
    pub async fn download_observations(&self) -> AppResult<ObservationBatch> {
        match self {
            Self::EnvironmentCanada(s) => s.download_observations().await,
            Self::DataGarrison(s) => s.download_observations().await,
            Self::CampbellScientific(s) => s.download_observations().await,
        }
    }

    /// Download new observations and append them to the cache.
    ///
    /// # Errors
    ///
    /// Returns download, parse or cache errors.
    pub async fn save_observations(&self) -> AppResult<usize> {
        let batch = self.download_observations().await?;
        self.core().store(&batch)
    }

    /// Upload cached observations inside `window`; returns how many were posted.
    ///
    /// # Errors
    ///
    /// See [`sync::upload`].
    pub async fn upload_observations(
        &self,
        destination: &str,
        window: &ObservationWindow,
        filter: &PropertyFilter,
    ) -> AppResult<usize> {
        self.core()
            .upload_observations(destination, window, filter)
            .await
    }
}
