//! Cached records: what a station looks like, what was downloaded, and what was observed.

pub mod datastream;
pub mod download_state;
pub mod observation;
pub mod station;

pub use datastream::{DatastreamDef, UnitOfMeasurement};
pub use download_state::{DownloadLedger, DownloadState};
pub use observation::ObservationRecord;
pub use station::StationMetadata;
