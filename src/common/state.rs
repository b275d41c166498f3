use std::sync::Arc;

use crate::config::Config;
use crate::error::AppResult;
use crate::http::{HttpTransport, ReqwestTransport};

/// Everything a single CLI run shares between the provider and its stations.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: Arc<dyn HttpTransport>,
}

impl AppState {
    /// Build state backed by the real reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: Config) -> AppResult<Self> {
        let http = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(http)))
    }

    pub fn with_transport(config: Config, http: Arc<dyn HttpTransport>) -> Self {
        Self {
            config: Arc::new(config),
            http,
        }
    }
}
