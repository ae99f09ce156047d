use std::time::Duration;

use chrono::TimeDelta;
use device_log::LogKind;
use telemetry::{env_string, env_u64};

#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub backend_url: String,
    pub send_timeout: Duration,
    pub health_timeout: Duration,
    pub sweep_interval: Duration,
    pub initial_delay: Duration,
    pub retention: Retention,
}

impl DeliveryConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            backend_url: env_string("BACKEND_URL", "http://localhost:8080"),
            send_timeout: Duration::from_secs(env_u64("SEND_TIMEOUT_SECS", 10)),
            health_timeout: Duration::from_secs(env_u64("HEALTH_TIMEOUT_SECS", 3)),
            sweep_interval: Duration::from_secs(env_u64("RETRY_INTERVAL_SECS", 300).max(1)),
            initial_delay: Duration::from_secs(env_u64("RETRY_INITIAL_DELAY_SECS", 5)),
            retention: Retention::from_env(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Maximum age of an undelivered entry, per log kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    pub gps: chrono::Duration,
    pub power: chrono::Duration,
    pub geofence: chrono::Duration,
}

impl Retention {
    fn from_env() -> Self {
        let hours = |key: &str, default: i64| hours_or(env_u64(key, default.unsigned_abs()), default);
        Self {
            gps: hours("GPS_RETENTION_HOURS", 1),
            power: hours("POWER_RETENTION_HOURS", 24),
            geofence: hours("GEOFENCE_RETENTION_HOURS", 1),
        }
    }

    #[must_use]
    pub const fn for_kind(&self, kind: LogKind) -> chrono::Duration {
        match kind {
            LogKind::Gps => self.gps,
            LogKind::Power => self.power,
            LogKind::Geofence => self.geofence,
        }
    }
}

/// `value` hours, or `default` hours when that does not fit a duration.
fn hours_or(value: u64, default: i64) -> TimeDelta {
    i64::try_from(value).ok().and_then(TimeDelta::try_hours).unwrap_or_else(|| TimeDelta::hours(default))
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            gps: chrono::Duration::hours(1),
            power: chrono::Duration::hours(24),
            geofence: chrono::Duration::hours(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::hours_or;

    #[test]
    fn oversized_retention_falls_back() {
        assert_eq!(hours_or(24, 1), TimeDelta::hours(24));
        assert_eq!(hours_or(u64::MAX, 1), TimeDelta::hours(1));
        assert_eq!(hours_or(i64::MAX.unsigned_abs(), 24), TimeDelta::hours(24));
    }
}
