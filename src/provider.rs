//! Locating stations of one source inside the cache.

use std::path::Path;

use crate::cache::{CacheLayout, StationCache};
use crate::common::AppState;
use crate::entity::StationMetadata;
use crate::error::{AppError, AppResult};
use crate::ontology::Ontology;
use crate::sources::Source;
use crate::sources::swob::StationListing;
use crate::station::{
    CampbellScientificStation, DataGarrisonStation, EnvironmentCanadaStation, Station,
    StationCore, environment_canada,
};

/// Identifies a station and the source-specific details needed to reach it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationParams {
    pub station_id: String,
    /// Data Garrison account that owns the station.
    pub user_id: Option<String>,
    /// Campbell Scientific TOA5 files.
    pub data_urls: Vec<String>,
}

impl StationParams {
    #[must_use]
    pub fn new(station_id: &str) -> Self {
        Self {
            station_id: station_id.to_string(),
            ..Self::default()
        }
    }
}

pub struct Provider {
    source: Source,
    layout: CacheLayout,
    state: AppState,
}

impl Provider {
    /// Create a provider rooted at `<cache_root>/v2/<source>`, creating the
    /// metadata directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the cache directories cannot be created.
    pub fn new(source: Source, cache_root: &Path, state: AppState) -> AppResult<Self> {
        let layout = CacheLayout::new(cache_root, source);
        layout.create()?;
        tracing::debug!(source = %source, root = %layout.root().display(), "Provider ready");

        Ok(Self {
            source,
            layout,
            state,
        })
    }

    #[must_use]
    pub fn source(&self) -> Source {
        self.source
    }

    #[must_use]
    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// The Environment Canada station list (cached as `stations.csv`).
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidArgument` for other sources, or download and
    /// parse errors.
    pub async fn stations(&self) -> AppResult<Vec<StationListing>> {
        if self.source != Source::EnvironmentCanada {
            return Err(AppError::InvalidArgument(format!(
                "{} does not publish a station list",
                self.source
            )));
        }
        environment_canada::load_station_list(
            self.state.http.as_ref(),
            &self.layout,
            &self.state.config.ec_station_list_url,
        )
        .await
    }

    /// A station with empty metadata; nothing is read from or written to disk.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidArgument` if a source-specific parameter is missing.
    pub fn new_station(&self, params: &StationParams) -> AppResult<Station> {
        let mut metadata = StationMetadata::new(&params.station_id);
        metadata.data_urls.clone_from(&params.data_urls);
        self.build(params, metadata)
    }

    /// The station as cached on disk, or `None` if it was never saved.
    ///
    /// Data URLs given in `params` replace the cached ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the cached metadata cannot be read.
    pub fn load_station(&self, params: &StationParams) -> AppResult<Option<Station>> {
        let Some(mut metadata) = self.station_cache(&params.station_id).load_metadata()? else {
            return Ok(None);
        };

        tracing::debug!(station = %params.station_id, "Loaded cached station metadata");
        if !params.data_urls.is_empty() {
            metadata.data_urls.clone_from(&params.data_urls);
        }
        self.build(params, metadata).map(Some)
    }

    /// The cached station if present, otherwise a freshly downloaded and saved one.
    ///
    /// # Errors
    ///
    /// Returns cache errors, or download and parse errors for an uncached station.
    pub async fn get_station(&self, params: &StationParams) -> AppResult<Station> {
        if let Some(station) = self.load_station(params)? {
            return Ok(station);
        }

        tracing::info!(station = %params.station_id, "Station not cached; downloading metadata");
        let mut station = self.new_station(params)?;
        station.download_metadata().await?;
        station.save_metadata()?;
        Ok(station)
    }

    fn station_cache(&self, station_id: &str) -> StationCache {
        StationCache::new(self.layout.clone(), station_id)
    }

    fn build(&self, params: &StationParams, metadata: StationMetadata) -> AppResult<Station> {
        let config = &self.state.config;
        let core = StationCore::new(
            metadata,
            self.station_cache(&params.station_id),
            self.state.http.clone(),
            Ontology::for_source(self.source)?,
        );

        Ok(match self.source {
            Source::EnvironmentCanada => Station::EnvironmentCanada(EnvironmentCanadaStation::new(
                core,
                &config.ec_station_list_url,
                &config.ec_swob_base_url,
            )),
            Source::DataGarrison => {
                let user_id = params
                    .user_id
                    .as_deref()
                    .or_else(|| core.metadata.properties.get("user_id").map(String::as_str))
                    .ok_or_else(|| {
                        AppError::InvalidArgument("data_garrison requires a user id".to_string())
                    })?
                    .to_string();
                Station::DataGarrison(DataGarrisonStation::new(
                    core,
                    &user_id,
                    &config.data_garrison_base_url,
                ))
            }
            Source::CampbellScientific => {
                if core.metadata.data_urls.is_empty() {
                    return Err(AppError::InvalidArgument(
                        "campbell_scientific requires at least one data URL".to_string(),
                    ));
                }
                Station::CampbellScientific(CampbellScientificStation::new(core))
            }
        })
    }
}
