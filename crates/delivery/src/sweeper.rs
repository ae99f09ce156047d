//! Background redelivery daemon.
//!
//! Waits for the initial delay, sweeps once, then sweeps on every interval
//! tick until cancelled. A sweep in progress always runs to completion so
//! drained entries are written back before the loop observes cancellation.
//!
//! ```ignore
//! let sweeper = RetrySweeper::new(Arc::clone(&store))
//!     .with_interval(Duration::from_secs(300));
//! tokio::spawn(sweeper.run(shutdown.clone()));
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::store::LogStore;

/// Default interval between sweeps (5 minutes).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Default delay before the first sweep.
pub const DEFAULT_INITIAL_DELAY_SECS: u64 = 5;

pub struct RetrySweeper {
    store: Arc<LogStore>,
    interval: Duration,
    initial_delay: Duration,
}

impl RetrySweeper {
    #[must_use]
    pub const fn new(store: Arc<LogStore>) -> Self {
        Self {
            store,
            interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            initial_delay: Duration::from_secs(DEFAULT_INITIAL_DELAY_SECS),
        }
    }

    /// A zero interval keeps the default.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.interval = interval;
        }
        self
    }

    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Runs the sweeper until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            initial_delay_secs = self.initial_delay.as_secs(),
            "retry sweeper starting"
        );

        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                info!("retry sweeper shutting down");
                return;
            }
            () = tokio::time::sleep(self.initial_delay) => {}
        }

        // first tick completes immediately
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    info!("retry sweeper shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.store.sweep_all().await;
                }
            }
        }
    }
}
