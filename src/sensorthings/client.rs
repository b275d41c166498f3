use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::http::HttpTransport;
use crate::sensorthings::models::{
    DatastreamPayload, LocationPayload, ObservationPayload, ObservedPropertyPayload,
    SensorPayload, ThingPayload,
};

/// Thin writer for a SensorThings API endpoint.
///
/// Every create returns the navigation link of the new entity; dependent
/// entities are posted under that link.
pub struct SensorThingsClient<'a> {
    http: &'a dyn HttpTransport,
    base_url: String,
}

impl<'a> SensorThingsClient<'a> {
    #[must_use]
    pub fn new(http: &'a dyn HttpTransport, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// # Errors
    ///
    /// Returns `AppError::EntityCreation` if the server rejects the Thing.
    pub async fn create_thing(&self, payload: &ThingPayload) -> AppResult<String> {
        let url = format!("{}/Things", self.base_url);
        self.create("Thing", &url, payload).await
    }

    /// # Errors
    ///
    /// Returns `AppError::EntityCreation` if the server rejects the Location.
    pub async fn create_location(
        &self,
        thing_link: &str,
        payload: &LocationPayload,
    ) -> AppResult<String> {
        let url = format!("{}/Locations", thing_link.trim_end_matches('/'));
        self.create("Location", &url, payload).await
    }

    /// # Errors
    ///
    /// Returns `AppError::EntityCreation` if the server rejects the Sensor.
    pub async fn create_sensor(&self, payload: &SensorPayload) -> AppResult<String> {
        let url = format!("{}/Sensors", self.base_url);
        self.create("Sensor", &url, payload).await
    }

    /// # Errors
    ///
    /// Returns `AppError::EntityCreation` if the server rejects the ObservedProperty.
    pub async fn create_observed_property(
        &self,
        payload: &ObservedPropertyPayload,
    ) -> AppResult<String> {
        let url = format!("{}/ObservedProperties", self.base_url);
        self.create("ObservedProperty", &url, payload).await
    }

    /// # Errors
    ///
    /// Returns `AppError::EntityCreation` if the server rejects the Datastream.
    pub async fn create_datastream(
        &self,
        thing_link: &str,
        payload: &DatastreamPayload,
    ) -> AppResult<String> {
        let url = format!("{}/Datastreams", thing_link.trim_end_matches('/'));
        self.create("Datastream", &url, payload).await
    }

    /// # Errors
    ///
    /// Returns `AppError::EntityCreation` if the server rejects the Observation.
    pub async fn create_observation(
        &self,
        datastream_link: &str,
        payload: &ObservationPayload,
    ) -> AppResult<String> {
        let url = format!("{}/Observations", datastream_link.trim_end_matches('/'));
        self.create("Observation", &url, payload).await
    }

    async fn create<T: Serialize + Sync>(
        &self,
        entity: &'static str,
        url: &str,
        payload: &T,
    ) -> AppResult<String> {
        let body = serde_json::to_value(payload)?;
        let response = self.http.post_json(url, &body).await?;

        if !response.is_success() {
            let text = response.text();
            tracing::error!(
                entity,
                url,
                status = response.status,
                body_preview = %text.chars().take(500).collect::<String>(),
                "Entity creation failed"
            );
            return Err(AppError::EntityCreation {
                entity,
                status: response.status,
                body: text,
            });
        }

        if let Some(location) = response.header("Location") {
            return Ok(location.to_string());
        }

        // Some servers answer 200 with the entity instead of a Location header.
        let self_link = serde_json::from_slice::<Value>(&response.body)
            .ok()
            .and_then(|v| v.get("@iot.selfLink").and_then(Value::as_str).map(ToString::to_string));

        self_link.ok_or_else(|| AppError::EntityCreation {
            entity,
            status: response.status,
            body: "response has neither a Location header nor @iot.selfLink".to_string(),
        })
    }
}

/// Extract the `@iot.id` from a navigation link.
///
/// `.../Sensors(42)` yields the number `42`; `.../Sensors('abc')` yields the string `"abc"`.
#[must_use]
pub fn entity_id_from_link(link: &str) -> Option<Value> {
    let link = link.trim_end_matches('/');
    let inner = link.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let raw = &inner[open + 1..];

    if let Some(quoted) = raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        return Some(Value::String(quoted.replace("''", "'")));
    }

    raw.parse::<i64>()
        .ok()
        .map(|n| Value::Number(n.into()))
        .or_else(|| (!raw.is_empty()).then(|| Value::String(raw.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_and_string_ids() {
        assert_eq!(
            entity_id_from_link("http://example.com/v1.0/Sensors(42)"),
            Some(Value::from(42))
        );
        assert_eq!(
            entity_id_from_link("http://example.com/v1.0/Sensors('abc')"),
            Some(Value::from("abc"))
        );
        assert_eq!(entity_id_from_link("http://example.com/v1.0/Sensors"), None);
    }
}
