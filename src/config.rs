//! Process configuration: built-in defaults, then environment variables,
//! then an optional JSON file.

use std::path::Path;
use std::time::Duration;
use std::{fs, io};

use chrono_tz::Tz;
use delivery::DeliveryConfig;
use device_log::EncoderConfig;
use emulator::{EmulatorConfig, secs_f64};
use route::RouteConfig;
use serde::Deserialize;
use telemetry::{env_string, env_timezone, env_u64};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    /// Zone used for every wire time string.
    pub timezone: Tz,
    /// Bound on the final sweep at shutdown.
    pub shutdown_sweep_timeout: Duration,
    pub delivery: DeliveryConfig,
    pub route: RouteConfig,
    pub encoder: EncoderConfig,
    pub emulator: EmulatorConfig,
}

/// Keys accepted in the JSON config file.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub backend_url: Option<String>,
    pub interval_sec: Option<f64>,
    pub batch_size: Option<usize>,
    pub send_interval_sec: Option<f64>,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_host: env_string("API_HOST", "0.0.0.0"),
            api_port: u16::try_from(env_u64("API_PORT", 8081)).unwrap_or(8081),
            timezone: env_timezone("TIMEZONE"),
            shutdown_sweep_timeout: Duration::from_secs(env_u64("SHUTDOWN_SWEEP_TIMEOUT_SECS", 5)),
            delivery: DeliveryConfig::from_env(),
            route: RouteConfig::from_env(),
            encoder: EncoderConfig::from_env(),
            emulator: EmulatorConfig::from_env(),
        }
    }

    /// Environment configuration overlaid with `CONFIG_FILE` (default
    /// `config.json`) when that file exists.
    #[must_use]
    pub fn load() -> Self {
        let mut config = Self::from_env();
        let path = env_string("CONFIG_FILE", "config.json");
        config.merge_file(Path::new(&path));
        config
    }

    /// Overlay values from a JSON file. A missing file is not an error; an
    /// unreadable or malformed one is logged and ignored.
    pub fn merge_file(&mut self, path: &Path) {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file");
                return;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config file unreadable, ignoring");
                return;
            }
        };

        match serde_json::from_slice::<FileConfig>(&bytes) {
            Ok(file) => {
                info!(path = %path.display(), "loaded config file");
                self.apply(file);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "config file invalid, ignoring"),
        }
    }

    pub fn apply(&mut self, file: FileConfig) {
        if let Some(url) = file.backend_url.filter(|url| !url.trim().is_empty()) {
            self.delivery.backend_url = url;
        }
        if let Some(secs) = file.interval_sec {
            self.emulator.interval = secs_f64(secs, self.emulator.interval.as_secs_f64());
        }
        if let Some(size) = file.batch_size.filter(|size| *size > 0) {
            self.emulator.batch_size = size;
        }
        if let Some(secs) = file.send_interval_sec {
            self.emulator.send_interval = secs_f64(secs, self.emulator.send_interval.as_secs_f64());
        }
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
