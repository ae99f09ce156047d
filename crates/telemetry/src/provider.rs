//! # Provider
//!
//! Provider defines external data interfaces for the emulator crates.

use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use http::{Request, Response};

/// Host-provided HTTP client abstraction.
///
/// Implementations report transport failures as [`crate::Error::Connection`]
/// or [`crate::Error::Timeout`] so callers can classify them.
#[async_trait]
pub trait HttpRequest: Send + Sync {
    /// Make an outbound HTTP request and return the raw response payload.
    async fn fetch(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>>;
}

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    /// Zone used when rendering device time strings.
    fn timezone(&self) -> Tz;

    fn local_now(&self) -> DateTime<Tz> {
        self.now_utc().with_timezone(&self.timezone())
    }
}

#[derive(Clone, Debug)]
pub struct SystemClock {
    timezone: Tz,
}

impl SystemClock {
    #[must_use]
    pub const fn new(timezone: Tz) -> Self {
        Self { timezone }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(chrono_tz::Asia::Seoul)
    }
}

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn timezone(&self) -> Tz {
        self.timezone
    }
}

/// Clock that only moves when told to. Used to drive simulated time.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
    timezone: Tz,
}

impl ManualClock {
    #[must_use]
    pub const fn new(start: DateTime<Utc>, timezone: Tz) -> Self {
        Self { now: RwLock::new(start), timezone }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn timezone(&self) -> Tz {
        self.timezone
    }
}
