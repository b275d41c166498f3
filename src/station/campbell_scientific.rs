use crate::error::{AppError, AppResult};
use crate::http::fetch;
use crate::sources::toa5;
use crate::station::{ObservationBatch, StationCore, fetch_table};

/// Campbell Scientific logger publishing one or more TOA5 tables over HTTP.
///
/// Data URLs live in the station metadata so later runs need only the station id.
pub struct CampbellScientificStation {
    pub(crate) core: StationCore,
}

impl CampbellScientificStation {
    #[must_use]
    pub fn new(core: StationCore) -> Self {
        Self { core }
    }

    #[must_use]
    pub fn data_urls(&self) -> &[String] {
        &self.core.metadata.data_urls
    }

    pub(crate) async fn download_metadata(&mut self) -> AppResult<()> {
        if self.core.metadata.data_urls.is_empty() {
            return Err(AppError::InvalidArgument(format!(
                "station `{}` has no data URLs",
                self.core.metadata.id
            )));
        }

        for url in self.core.metadata.data_urls.clone() {
            let outcome = fetch(self.core.http(), &url, None).await?.into_result()?;
            let file = toa5::parse_full(outcome.body().unwrap_or_default())?;
            tracing::debug!(
                url = %url,
                table = file.header.environment.get(7).map_or("", String::as_str),
                "Parsed TOA5 header"
            );
            self.core.apply_source_metadata(file.header.metadata());
        }
        Ok(())
    }

    pub(crate) async fn download_observations(&self) -> AppResult<ObservationBatch> {
        // Logger clocks carry no zone; refuse before touching the network.
        let zone_offset = self.core.metadata.timezone_offset.as_deref().ok_or_else(|| {
            AppError::Timestamp(format!(
                "station `{}` has no timezone_offset; set it in the cached metadata",
                self.core.metadata.id
            ))
        })?;

        let mut ledger = self.core.cache().load_downloads()?;
        let mut records = Vec::new();

        for url in &self.core.metadata.data_urls {
            let table = fetch_table(
                self.core.http(),
                &mut ledger,
                url,
                |body| toa5::parse_full(body).map(|file| file.table),
                toa5::parse_rows,
            )
            .await?;

            if let Some(table) = table {
                let parsed = toa5::observations(&table, Some(zone_offset))?;
                tracing::info!(url = %url, count = parsed.len(), "Downloaded observations");
                records.extend(parsed);
            }
        }

        Ok(ObservationBatch {
            records,
            ledger: Some(ledger),
        })
    }
}
