use std::fs;
use std::path::PathBuf;

use crate::cache::{CacheLayout, write_atomic};
use crate::error::{AppError, AppResult};
use crate::http::{HttpTransport, fetch};
use crate::sources::swob::{self, StationListing, SwobDocument};
use crate::station::{ObservationBatch, StationCore};

const STATION_LIST_FILE: &str = "stations.csv";

/// Environment Canada station, read from the MSC Datamart SWOB-ML feed.
pub struct EnvironmentCanadaStation {
    pub(crate) core: StationCore,
    station_list_url: String,
    swob_base_url: String,
}

impl EnvironmentCanadaStation {
    #[must_use]
    pub fn new(core: StationCore, station_list_url: &str, swob_base_url: &str) -> Self {
        Self {
            core,
            station_list_url: station_list_url.to_string(),
            swob_base_url: swob_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Latest SWOB-ML document for this station. Manned stations publish
    /// `-MAN-` documents, everything else `-AUTO-`.
    #[must_use]
    pub fn swob_url(&self) -> String {
        let id = self.core.metadata.id.trim().to_ascii_uppercase();
        let code = if id.len() == 3 { format!("C{id}") } else { id };
        let kind = match self.core.metadata.properties.get("auto_man") {
            Some(value) if value.eq_ignore_ascii_case("MAN") => "MAN",
            _ => "AUTO",
        };
        format!("{}/{code}-{kind}-swob.xml", self.swob_base_url)
    }

    pub(crate) async fn download_metadata(&mut self) -> AppResult<()> {
        let layout = self.core.cache().layout().clone();
        let listings =
            load_station_list(self.core.http(), &layout, &self.station_list_url).await?;

        let station_id = self.core.metadata.id.clone();
        let listing = listings
            .into_iter()
            .find(|l| l.matches(&station_id))
            .ok_or_else(|| AppError::StationNotFound(station_id.clone()))?;

        // auto_man picks the document flavour, so record the listing first.
        self.core.metadata.properties.extend(listing.properties());

        let document = self.download_document().await?;
        let mut source = document.metadata();
        source.name = Some(listing.name.clone()).filter(|n| !n.is_empty()).or(source.name);
        source.latitude = listing.latitude.or(source.latitude);
        source.longitude = listing.longitude.or(source.longitude);
        source.elevation = listing.elevation.or(source.elevation);
        // Identification elements change with every report; keep the listing's.
        source.properties = listing.properties();

        self.core.apply_source_metadata(source);
        Ok(())
    }

    pub(crate) async fn download_observations(&self) -> AppResult<ObservationBatch> {
        let document = self.download_document().await?;
        let records = document.observations()?;
        tracing::info!(
            station = %self.core.metadata.id,
            count = records.len(),
            "Downloaded observations"
        );
        Ok(ObservationBatch {
            records,
            ledger: None,
        })
    }

    async fn download_document(&self) -> AppResult<SwobDocument> {
        let url = self.swob_url();
        let outcome = fetch(self.core.http(), &url, None).await?.into_result()?;
        let body = outcome.body().unwrap_or_default();
        swob::parse(body)
    }
}

/// The MSC station list, downloaded once per cache and read from disk afterwards.
///
/// # Errors
///
/// Returns download or parse errors, or `AppError::Io` if the cached copy
/// cannot be read or written.
pub async fn load_station_list(
    http: &dyn HttpTransport,
    layout: &CacheLayout,
    url: &str,
) -> AppResult<Vec<StationListing>> {
    let path = station_list_path(layout);

    let body = match fs::read(&path) {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(url, "Downloading station list");
            let outcome = fetch(http, url, None).await?.into_result()?;
            let body = outcome.body().unwrap_or_default().to_vec();
            write_atomic(&path, &body)?;
            body
        }
        Err(e) => return Err(e.into()),
    };

    swob::parse_station_list(&body)
}

#[must_use]
pub fn station_list_path(layout: &CacheLayout) -> PathBuf {
    layout.root().join(STATION_LIST_FILE)
}
