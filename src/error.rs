#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Error downloading {url}: HTTP {status}")]
    Download { url: String, status: u16 },

    #[error("Failed to create {entity}: HTTP {status}: {body}")]
    EntityCreation {
        entity: &'static str,
        status: u16,
        body: String,
    },

    #[error("Datastream `{datastream}` has not been uploaded ({posted} observations were posted)")]
    MissingDatastream { datastream: String, posted: usize },

    #[error("Value `{value}` does not fit datastream `{datastream}` ({posted} observations were posted)")]
    InvalidValue {
        datastream: String,
        value: String,
        posted: usize,
    },

    #[error("Station `{0}` has no coordinates; set latitude and longitude in its metadata")]
    MissingCoordinates(String),

    #[error("Station not found: {0}")]
    StationNotFound(String),

    #[error("Invalid timestamp: {0}")]
    Timestamp(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<tempfile::PersistError> for AppError {
    fn from(e: tempfile::PersistError) -> Self {
        Self::Io(e.error)
    }
}

pub type AppResult<T> = Result<T, AppError>;
