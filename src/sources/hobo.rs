//! HOBO tab-separated exports, as published by the Data Garrison portal.
//!
//! ```text
//! Station ID: 300234065673960
//! Title: Cambridge Bay
//! Date Time, GMT-06:00<TAB>Pressure, mbar<TAB>Temperature, *C
//! 07/03/19 14:00:00<TAB>1013.2<TAB>4.5
//! ```
//!
//! The zone offset lives in the time column's header.

use std::collections::BTreeMap;

use crate::common::time::parse_logger_timestamp;
use crate::entity::ObservationRecord;
use crate::error::{AppError, AppResult};
use crate::sources::{PropertyDef, RowTable, SourceMetadata};

const TIME_COLUMN_PREFIX: &str = "Date Time";
const TIMESTAMP_FORMAT: &str = "%m/%d/%y %H:%M:%S";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoboFile {
    pub preamble: BTreeMap<String, String>,
    pub table: RowTable,
}

impl HoboFile {
    #[must_use]
    pub fn metadata(&self) -> SourceMetadata {
        let coordinate = |key: &str| {
            self.preamble
                .get(key)
                .and_then(|v| v.trim().parse::<f64>().ok())
        };

        let property_defs = self
            .table
            .columns
            .iter()
            .skip(1)
            .map(|header| {
                let (id, units) = split_column_header(header);
                PropertyDef { id, units }
            })
            .collect();

        SourceMetadata {
            name: self.preamble.get("Title").cloned(),
            latitude: coordinate("Latitude"),
            longitude: coordinate("Longitude"),
            elevation: coordinate("Elevation"),
            timezone_offset: self.table.columns.first().and_then(|c| zone_of(c)),
            properties: self.preamble.clone(),
            property_defs,
        }
    }
}

/// Parse a complete export: preamble, header row, then data rows.
///
/// # Errors
///
/// Returns `AppError::Parse` if no `Date Time` header row is found.
pub fn parse_full(body: &[u8]) -> AppResult<HoboFile> {
    let mut preamble = BTreeMap::new();
    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for record in read_records(body)? {
        if columns.is_some() {
            rows.push(record);
        } else if record
            .first()
            .is_some_and(|f| f.starts_with(TIME_COLUMN_PREFIX))
        {
            columns = Some(record);
        } else if let Some((key, value)) = record.join("\t").split_once(':') {
            preamble.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    let columns =
        columns.ok_or_else(|| AppError::Parse("HOBO export has no `Date Time` header".to_string()))?;

    Ok(HoboFile {
        preamble,
        table: RowTable { columns, rows },
    })
}

/// Parse header-less rows from a ranged download.
///
/// # Errors
///
/// Returns `AppError::Csv` if the body cannot be split into records.
pub fn parse_rows(body: &[u8], columns: &[String]) -> AppResult<RowTable> {
    Ok(RowTable {
        columns: columns.to_vec(),
        rows: read_records(body)?,
    })
}

/// Convert a table into observations keyed by property name (the header text
/// before the unit).
///
/// The offset in the time column header wins; `fallback_offset` is used only
/// when the header has none.
///
/// # Errors
///
/// Returns `AppError::Timestamp` if no offset is available or a timestamp is malformed.
pub fn observations(
    table: &RowTable,
    fallback_offset: Option<&str>,
) -> AppResult<Vec<ObservationRecord>> {
    let zone = table
        .columns
        .first()
        .and_then(|c| zone_of(c))
        .or_else(|| fallback_offset.map(ToString::to_string));

    let keyed = RowTable {
        columns: table
            .columns
            .iter()
            .map(|c| split_column_header(c).0)
            .collect(),
        rows: table.rows.clone(),
    };

    keyed.observations(0, &[], |value| {
        parse_logger_timestamp(value, TIMESTAMP_FORMAT, zone.as_deref())
    })
}

/// `"Pressure, mbar (LGR S/N: 123)"` → (`"Pressure"`, `Some("mbar")`).
fn split_column_header(header: &str) -> (String, Option<String>) {
    match header.split_once(',') {
        Some((name, rest)) => {
            let units = rest.split('(').next().unwrap_or_default().trim();
            (
                name.trim().to_string(),
                (!units.is_empty()).then(|| units.to_string()),
            )
        }
        None => (header.trim().to_string(), None),
    }
}

/// `"Date Time, GMT-06:00"` → `"GMT-06:00"`.
fn zone_of(time_header: &str) -> Option<String> {
    let (_, zone) = time_header.split_once(',')?;
    let zone = zone.trim();
    (zone.starts_with("GMT") || zone.starts_with("UTC")).then(|| zone.to_string())
}

fn read_records(body: &[u8]) -> AppResult<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .has_headers(false)
        .flexible(true)
        .from_reader(body);

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        records.push(record.iter().map(|f| f.trim_end_matches('\r').to_string()).collect());
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Station ID: 300234065673960\n\
Title: Cambridge Bay\n\
\n\
Date Time, GMT-06:00\tPressure, mbar\tTemperature, *C (LGR S/N: 10)\n\
07/03/19 14:00:00\t1013.2\t4.5\n\
07/03/19 14:15:00\t1013.1\t\n";

    #[test]
    fn parses_preamble_and_columns() {
        let file = parse_full(SAMPLE.as_bytes()).unwrap();
        let metadata = file.metadata();

        assert_eq!(metadata.name.as_deref(), Some("Cambridge Bay"));
        assert_eq!(metadata.timezone_offset.as_deref(), Some("GMT-06:00"));
        assert_eq!(metadata.property_defs.len(), 2);
        assert_eq!(metadata.property_defs[1].id, "Temperature");
        assert_eq!(metadata.property_defs[1].units.as_deref(), Some("*C"));
    }

    #[test]
    fn normalizes_timestamps_with_header_offset() {
        let file = parse_full(SAMPLE.as_bytes()).unwrap();
        let observations = observations(&file.table, None).unwrap();

        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].source_property_id, "Pressure");
        assert_eq!(
            observations[0].timestamp.to_rfc3339(),
            "2019-07-03T20:00:00+00:00"
        );
    }

    #[test]
    fn missing_offset_is_an_error() {
        let table = RowTable {
            columns: vec!["Date Time".to_string(), "Pressure, mbar".to_string()],
            rows: vec![vec!["07/03/19 14:00:00".to_string(), "1013.2".to_string()]],
        };
        assert!(matches!(
            observations(&table, None),
            Err(AppError::Timestamp(_))
        ));
        assert_eq!(observations(&table, Some("-06:00")).unwrap().len(), 1);
    }
}
