//! Command-line interface: argument parsing, validation and dispatch.

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::PathBuf;

use crate::cache::CacheLayout;
use crate::common::AppState;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::provider::{Provider, StationParams};
use crate::sources::Source;
use crate::sync::{ObservationWindow, PropertyFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Verb {
    /// Download from the source into the cache
    Get,
    /// Upload from the cache to a SensorThings server
    Put,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Object {
    Metadata,
    Observations,
}

#[derive(Parser, Debug)]
#[command(name = "transloader")]
#[command(about = "Synchronize weather station data into an OGC SensorThings API")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    #[arg(value_enum)]
    pub verb: Verb,

    #[arg(value_enum)]
    pub object: Object,

    /// Station data provider
    #[arg(long, value_enum)]
    pub source: Source,

    /// Station identifier
    #[arg(long)]
    pub station: String,

    /// Data Garrison user id
    #[arg(long)]
    pub user: Option<String>,

    /// Campbell Scientific data file URL (repeatable)
    #[arg(long = "dataurl", value_name = "URL")]
    pub data_urls: Vec<String>,

    /// Cache directory (defaults to $TRANSLOADER_CACHE)
    #[arg(long, value_name = "DIR")]
    pub cache: Option<PathBuf>,

    /// ISO-8601 instant, `start/end` interval, or `latest`
    #[arg(long)]
    pub date: Option<String>,

    /// SensorThings base URL (defaults to $TRANSLOADER_DESTINATION)
    #[arg(long, value_name = "URL")]
    pub destination: Option<String>,

    /// Only synchronize these source property ids (repeatable)
    #[arg(long = "allow", value_name = "ID")]
    pub allowed: Vec<String>,

    /// Skip these source property ids (repeatable)
    #[arg(long = "block", value_name = "ID")]
    pub blocked: Vec<String>,
}

/// A validated invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub verb: Verb,
    pub object: Object,
    pub source: Source,
    pub cache_dir: PathBuf,
    pub params: StationParams,
    pub destination: Option<String>,
    pub window: Option<ObservationWindow>,
    pub filter: PropertyFilter,
}

impl Args {
    /// Check argument combinations, filling gaps from `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidArgument` (or `AppError::Timestamp` for a bad
    /// `--date`) describing the first problem found.
    pub fn validate(self, config: &Config) -> AppResult<Invocation> {
        let cache_dir = self
            .cache
            .or_else(|| config.cache_dir.clone())
            .ok_or_else(|| AppError::InvalidArgument("--cache is required".to_string()))?;
        if !cache_dir.is_dir() {
            return Err(AppError::InvalidArgument(format!(
                "cache directory {} does not exist",
                cache_dir.display()
            )));
        }

        let destination = self.destination.or_else(|| config.destination.clone());
        if self.verb == Verb::Put && destination.is_none() {
            return Err(AppError::InvalidArgument(
                "--destination is required for put".to_string(),
            ));
        }

        let window = match (self.verb, self.object, self.date.as_deref()) {
            (Verb::Put, Object::Observations, None) => {
                return Err(AppError::InvalidArgument(
                    "--date is required for put observations".to_string(),
                ));
            }
            (Verb::Put, Object::Observations, Some(date)) => Some(ObservationWindow::parse(date)?),
            _ => None,
        };

        if self.source == Source::DataGarrison && self.user.is_none() {
            return Err(AppError::InvalidArgument(
                "--user is required for data_garrison".to_string(),
            ));
        }

        if self.source == Source::CampbellScientific && self.data_urls.is_empty() {
            let cached = CacheLayout::new(&cache_dir, self.source)
                .metadata_path(&self.station)
                .is_file();
            if !cached {
                return Err(AppError::InvalidArgument(
                    "--dataurl is required for an uncached campbell_scientific station".to_string(),
                ));
            }
        }

        let filter = PropertyFilter::new(Some(self.allowed), Some(self.blocked)).map_err(|_| {
            AppError::InvalidArgument("--allow and --block are mutually exclusive".to_string())
        })?;

        Ok(Invocation {
            verb: self.verb,
            object: self.object,
            source: self.source,
            cache_dir,
            params: StationParams {
                station_id: self.station,
                user_id: self.user,
                data_urls: self.data_urls,
            },
            destination,
            window,
            filter,
        })
    }
}

/// Usage line for error messages.
#[must_use]
pub fn usage() -> String {
    Args::command().render_usage().to_string()
}

/// Execute a validated invocation.
///
/// # Errors
///
/// Propagates any provider, station or upload error.
pub async fn run(invocation: &Invocation, state: AppState) -> AppResult<()> {
    let provider = Provider::new(invocation.source, &invocation.cache_dir, state)?;
    let params = &invocation.params;
    let destination = invocation.destination.as_deref().unwrap_or_default();

    match (invocation.verb, invocation.object) {
        (Verb::Get, Object::Metadata) => {
            // A cached station keeps its links and hand-edited fields.
            let mut station = match provider.load_station(params)? {
                Some(station) => station,
                None => provider.new_station(params)?,
            };
            station.download_metadata().await?;
            station.save_metadata()?;
            tracing::info!(station = %params.station_id, "Metadata downloaded");
        }
        (Verb::Put, Object::Metadata) => {
            let mut station = provider.get_station(params).await?;
            let created = station
                .upload_metadata(destination, &invocation.filter)
                .await?;
            tracing::info!(station = %params.station_id, created, "Metadata uploaded");
        }
        (Verb::Get, Object::Observations) => {
            let station = provider.get_station(params).await?;
            let saved = station.save_observations().await?;
            tracing::info!(station = %params.station_id, saved, "Observations downloaded");
        }
        (Verb::Put, Object::Observations) => {
            let window = invocation.window.unwrap_or(ObservationWindow::Latest);
            let station = provider.get_station(params).await?;
            let posted = station
                .upload_observations(destination, &window, &invocation.filter)
                .await?;
            tracing::info!(station = %params.station_id, posted, "Observations uploaded");
        }
    }

    Ok(())
}
