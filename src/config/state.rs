// Application state module
// Everything a connection task needs, shared behind one Arc

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use super::types::Config;
use crate::api::FaceApi;
use crate::face::RemoteFaceAnalysis;
use crate::logger::Logger;

/// Application state
pub struct AppState {
    pub config: Config,
    pub api: FaceApi<RemoteFaceAnalysis>,
    /// Signalled once when the process should stop accepting connections
    pub shutdown: Arc<Notify>,
}

impl AppState {
    pub fn new(config: &Config, logger: Logger) -> Self {
        let service = RemoteFaceAnalysis::new(
            &config.service.base_url,
            Duration::from_secs(config.service.timeout),
        );
        Self {
            config: config.clone(),
            api: FaceApi::new(service, logger, &config.api),
            shutdown: Arc::new(Notify::new()),
        }
    }
}
