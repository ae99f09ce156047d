//! # Vehicle Emulator
//!
//! Process shell around the emulator crates: configuration, the outbound
//! HTTP client, the HTTP front end and logging.

pub mod config;
pub mod http;
pub mod logging;
pub mod provider;

use std::sync::Arc;

use delivery::{LogStore, RetrySweeper, Sender};
use device_log::BatchEncoder;
use emulator::Emulator;
use route::RouteSource;
use telemetry::{Clock, HttpRequest};

pub use crate::config::{Config, FileConfig};
pub use crate::provider::ReqwestProvider;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub emulator: Emulator,
}

impl AppState {
    /// Wire the emulator and its delivery store over `http`.
    #[must_use]
    pub fn new(config: &Config, http: Arc<dyn HttpRequest>, clock: Arc<dyn Clock>) -> Self {
        let sender = Sender::new(Arc::clone(&http), config.delivery.backend_url.clone())
            .with_timeout(config.delivery.send_timeout)
            .with_health_timeout(config.delivery.health_timeout);
        let store = Arc::new(LogStore::new(sender, Arc::clone(&clock), config.delivery.retention));
        let routes = RouteSource::new(http, config.route.clone());
        let encoder = BatchEncoder::new(config.encoder.clone(), Arc::clone(&clock));

        Self { emulator: Emulator::new(config.emulator.clone(), clock, routes, encoder, store) }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<LogStore> {
        self.emulator.store()
    }

    /// Redelivery daemon for this state's store.
    #[must_use]
    pub fn sweeper(&self, config: &Config) -> RetrySweeper {
        RetrySweeper::new(Arc::clone(self.store()))
            .with_interval(config.delivery.sweep_interval)
            .with_initial_delay(config.delivery.initial_delay)
    }
}
