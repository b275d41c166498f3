use chrono::Utc;

use crate::common::time::to_iso8601;
use crate::entity::{ObservationRecord, StationMetadata};
use crate::error::{AppError, AppResult};
use crate::ontology::coerce;
use crate::sensorthings::{ObservationPayload, SensorThingsClient};
use crate::sync::{ObservationWindow, PropertyFilter};

/// Post every record inside `window` that passes `filter` to its Datastream.
///
/// Records are posted in timestamp order with no deduplication against the
/// server. A record whose datastream has not been uploaded, or whose value
/// does not fit its observation type, is skipped and logged; the others are
/// still posted.
///
/// # Errors
///
/// Returns `AppError::EntityCreation` on the first rejected POST. After the
/// run, returns `AppError::MissingDatastream` or `AppError::InvalidValue` for
/// the first record that was skipped.
pub async fn upload(
    metadata: &StationMetadata,
    observations: &[ObservationRecord],
    window: &ObservationWindow,
    filter: &PropertyFilter,
    client: &SensorThingsClient<'_>,
) -> AppResult<usize> {
    let window = resolve_latest(window, observations);

    let mut selected: Vec<&ObservationRecord> = observations
        .iter()
        .filter(|r| window.contains(&r.timestamp))
        .filter(|r| filter.allows(&r.source_property_id))
        .collect();
    selected.sort();

    tracing::info!(
        station = %metadata.id,
        window = %window,
        count = selected.len(),
        "Uploading observations"
    );

    let result_time = to_iso8601(&Utc::now());
    let mut posted = 0;
    let mut first_skipped: Option<Skipped> = None;

    for record in selected {
        let Some((datastream_link, observation_type)) = metadata
            .datastream(&record.source_property_id)
            .and_then(|d| {
                d.remote_datastream_link
                    .as_deref()
                    .map(|link| (link, d.observation_type_uri.as_str()))
            })
        else {
            tracing::error!(
                station = %metadata.id,
                datastream = %record.source_property_id,
                "Datastream has not been uploaded; skipping observation"
            );
            first_skipped
                .get_or_insert_with(|| Skipped::Missing(record.source_property_id.clone()));
            continue;
        };

        let result = match coerce(&record.value, observation_type) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    station = %metadata.id,
                    datastream = %record.source_property_id,
                    error = %e,
                    "Skipping observation with invalid value"
                );
                first_skipped.get_or_insert_with(|| Skipped::Invalid {
                    datastream: record.source_property_id.clone(),
                    value: record.value.clone(),
                });
                continue;
            }
        };

        let payload = ObservationPayload {
            phenomenon_time: to_iso8601(&record.timestamp),
            result_time: result_time.clone(),
            result,
        };
        client.create_observation(datastream_link, &payload).await?;
        posted += 1;
    }

    tracing::info!(station = %metadata.id, posted, "Observations uploaded");

    match first_skipped {
        Some(Skipped::Missing(datastream)) => Err(AppError::MissingDatastream { datastream, posted }),
        Some(Skipped::Invalid { datastream, value }) => Err(AppError::InvalidValue {
            datastream,
            value,
            posted,
        }),
        None => Ok(posted),
    }
}

/// First record left out of an upload.
enum Skipped {
    Missing(String),
    Invalid { datastream: String, value: String },
}

/// Replace `Latest` with the newest timestamp among `observations`.
fn resolve_latest(
    window: &ObservationWindow,
    observations: &[ObservationRecord],
) -> ObservationWindow {
    match window {
        ObservationWindow::Latest => observations
            .iter()
            .map(|r| r.timestamp)
            .max()
            .map_or(ObservationWindow::Latest, ObservationWindow::Instant),
        other => *other,
    }
}
