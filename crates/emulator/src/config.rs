use std::time::Duration;

use route::RoutePoint;
use telemetry::{env_f64, env_u64, env_usize};

#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    /// Sampler tick period.
    pub interval: Duration,
    /// Samples per batch before a flush.
    pub batch_size: usize,
    /// Maximum time between flushes.
    pub send_interval: Duration,
    /// Bounded wait for the sampler loop on stop.
    pub stop_join_timeout: Duration,
    /// Bounded wait for in-flight deliveries and sweeps on shutdown.
    pub drain_timeout: Duration,
    /// Seed position for a device that has never run.
    pub default_origin: RoutePoint,
    /// Uniform jitter, in degrees, applied to `default_origin`.
    pub seed_jitter_deg: f64,
    /// Trip destination when the start request names none.
    pub destination: RoutePoint,
}

impl EmulatorConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            interval: secs_f64(env_f64("INTERVAL_SEC", 1.0), 1.0),
            batch_size: env_usize("BATCH_SIZE", 60).max(1),
            send_interval: secs_f64(env_f64("SEND_INTERVAL_SEC", 60.0), 60.0),
            stop_join_timeout: Duration::from_secs(env_u64("STOP_JOIN_TIMEOUT_SECS", 2)),
            drain_timeout: Duration::from_secs(env_u64("SHUTDOWN_DRAIN_TIMEOUT_SECS", 10)),
            default_origin: RoutePoint::new(
                env_f64("DEFAULT_LATITUDE", 37.5665),
                env_f64("DEFAULT_LONGITUDE", 126.9780),
            ),
            seed_jitter_deg: env_f64("SEED_JITTER_DEG", 0.01).abs(),
            destination: RoutePoint::new(
                env_f64("DESTINATION_LATITUDE", 37.4979),
                env_f64("DESTINATION_LONGITUDE", 127.0276),
            ),
        }
    }
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Positive, finite seconds or `default`.
#[must_use]
pub fn secs_f64(value: f64, default: f64) -> Duration {
    Duration::try_from_secs_f64(value)
        .ok()
        .filter(|d| !d.is_zero())
        .unwrap_or_else(|| Duration::from_secs_f64(default))
}
