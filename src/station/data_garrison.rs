use crate::error::AppResult;
use crate::http::fetch;
use crate::sources::hobo;
use crate::station::{ObservationBatch, StationCore, fetch_table};

/// Data Garrison station: one HOBO export per user/station pair.
pub struct DataGarrisonStation {
    pub(crate) core: StationCore,
    user_id: String,
    base_url: String,
}

impl DataGarrisonStation {
    #[must_use]
    pub fn new(core: StationCore, user_id: &str, base_url: &str) -> Self {
        Self {
            core,
            user_id: user_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn data_url(&self) -> String {
        format!(
            "{}/users/{}/{}/temporary_data/latest.txt",
            self.base_url, self.user_id, self.core.metadata.id
        )
    }

    pub(crate) async fn download_metadata(&mut self) -> AppResult<()> {
        let url = self.data_url();
        let outcome = fetch(self.core.http(), &url, None).await?.into_result()?;
        let file = hobo::parse_full(outcome.body().unwrap_or_default())?;

        let mut source = file.metadata();
        source
            .properties
            .insert("user_id".to_string(), self.user_id.clone());
        self.core.apply_source_metadata(source);
        Ok(())
    }

    pub(crate) async fn download_observations(&self) -> AppResult<ObservationBatch> {
        let url = self.data_url();
        let mut ledger = self.core.cache().load_downloads()?;

        let table = fetch_table(
            self.core.http(),
            &mut ledger,
            &url,
            |body| hobo::parse_full(body).map(|file| file.table),
            hobo::parse_rows,
        )
        .await?;

        let records = match table {
            Some(table) => {
                hobo::observations(&table, self.core.metadata.timezone_offset.as_deref())?
            }
            None => Vec::new(),
        };

        tracing::info!(
            station = %self.core.metadata.id,
            url = %url,
            count = records.len(),
            "Downloaded observations"
        );
        Ok(ObservationBatch {
            records,
            ledger: Some(ledger),
        })
    }
}
