//! Campbell Scientific TOA5 table files.
//!
//! ```text
//! "TOA5","CBAY_MET","CR1000","12345","CR1000.Std.32","CPU:met.CR1","5327","CBAY_MET_1HR"
//! "TIMESTAMP","RECORD","BP_Avg","AirTC_Avg"
//! "TS","RN","mbar","Deg C"
//! "","","Avg","Avg"
//! "2019-06-28 14:00:00",1,1013.2,4.5
//! ```
//!
//! Timestamps are logger-local with no zone, so the station offset is required.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::common::time::parse_logger_timestamp;
use crate::entity::ObservationRecord;
use crate::error::{AppError, AppResult};
use crate::sources::{PropertyDef, RowTable, SourceMetadata};

pub const TIMESTAMP_COLUMN: &str = "TIMESTAMP";
pub const RECORD_COLUMN: &str = "RECORD";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const ENVIRONMENT_KEYS: [&str; 7] = [
    "station_name",
    "logger_model",
    "logger_serial",
    "logger_os",
    "program",
    "program_signature",
    "table_name",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toa5Header {
    pub environment: Vec<String>,
    pub fields: Vec<String>,
    pub units: Vec<String>,
    pub processing: Vec<String>,
}

impl Toa5Header {
    #[must_use]
    pub fn station_name(&self) -> Option<&str> {
        self.environment.get(1).map(String::as_str)
    }

    #[must_use]
    pub fn metadata(&self) -> SourceMetadata {
        let properties: BTreeMap<String, String> = ENVIRONMENT_KEYS
            .iter()
            .zip(self.environment.iter().skip(1))
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect();

        let property_defs = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, name)| *name != TIMESTAMP_COLUMN && *name != RECORD_COLUMN)
            .map(|(index, name)| PropertyDef {
                id: name.clone(),
                units: self.units.get(index).filter(|u| !u.is_empty()).cloned(),
            })
            .collect();

        SourceMetadata {
            name: self.station_name().map(ToString::to_string),
            properties,
            property_defs,
            ..SourceMetadata::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toa5File {
    pub header: Toa5Header,
    pub table: RowTable,
}

/// Parse a complete TOA5 file, header included.
///
/// # Errors
///
/// Returns `AppError::Parse` if the four header lines are missing or the
/// file is not TOA5.
pub fn parse_full(body: &[u8]) -> AppResult<Toa5File> {
    let mut records = read_records(body)?.into_iter();

    let environment = records
        .next()
        .ok_or_else(|| AppError::Parse("empty TOA5 file".to_string()))?;
    if environment.first().map(String::as_str) != Some("TOA5") {
        return Err(AppError::Parse(format!(
            "not a TOA5 file (format `{}`)",
            environment.first().map_or("", String::as_str)
        )));
    }

    let mut next_line = |what: &str| {
        records
            .next()
            .ok_or_else(|| AppError::Parse(format!("TOA5 header is missing its {what} line")))
    };
    let fields = next_line("field name")?;
    let units = next_line("units")?;
    let processing = next_line("processing")?;

    if !fields.iter().any(|f| f == TIMESTAMP_COLUMN) {
        return Err(AppError::Parse("TOA5 header has no TIMESTAMP field".to_string()));
    }

    let rows = records.collect();

    Ok(Toa5File {
        table: RowTable {
            columns: fields.clone(),
            rows,
        },
        header: Toa5Header {
            environment,
            fields,
            units,
            processing,
        },
    })
}

/// Parse header-less data rows from a ranged download.
///
/// # Errors
///
/// Returns `AppError::Csv` if the body is not valid CSV.
pub fn parse_rows(body: &[u8], columns: &[String]) -> AppResult<RowTable> {
    Ok(RowTable {
        columns: columns.to_vec(),
        rows: read_records(body)?,
    })
}

/// Convert a table into observations, normalizing timestamps with `zone_offset`.
///
/// # Errors
///
/// Returns `AppError::Timestamp` if the offset is absent or a timestamp is malformed,
/// and `AppError::Parse` if the table has no TIMESTAMP column.
pub fn observations(
    table: &RowTable,
    zone_offset: Option<&str>,
) -> AppResult<Vec<ObservationRecord>> {
    let time_column = table
        .columns
        .iter()
        .position(|c| c == TIMESTAMP_COLUMN)
        .ok_or_else(|| AppError::Parse("TOA5 table has no TIMESTAMP column".to_string()))?;
    let ignored: Vec<usize> = table
        .columns
        .iter()
        .position(|c| c == RECORD_COLUMN)
        .into_iter()
        .collect();

    table.observations(time_column, &ignored, |value| -> AppResult<DateTime<Utc>> {
        parse_logger_timestamp(value, TIMESTAMP_FORMAT, zone_offset)
    })
}

fn read_records(body: &[u8]) -> AppResult<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body);

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        records.push(record.iter().map(ToString::to_string).collect());
    }
    Ok(records)
}
