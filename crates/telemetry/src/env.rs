//! Environment lookups with typed fallbacks.

use std::env;

use chrono_tz::Tz;

pub fn env_string(key: &str, default: &str) -> String {
    env::var(key).ok().filter(|value| !value.trim().is_empty()).unwrap_or_else(|| default.to_string())
}

pub fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "t"))
        .unwrap_or(default)
}

pub fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|value| value.parse::<f64>().ok()).unwrap_or(default)
}

pub fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|value| value.parse::<u64>().ok()).unwrap_or(default)
}

pub fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|value| value.parse::<usize>().ok()).unwrap_or(default)
}

/// Zone named by `key`, falling back to `Asia/Seoul`.
pub fn env_timezone(key: &str) -> Tz {
    env::var(key).ok().and_then(|value| value.parse::<Tz>().ok()).unwrap_or(chrono_tz::Asia::Seoul)
}
