//! # Delivery
//!
//! Sends device logs to the collector with at-least-once semantics: a
//! record that cannot be delivered immediately is queued per device and
//! kind, then retried by [`RetrySweeper`] until it succeeds or outlives its
//! retention window.

mod config;
mod key_locker;
mod sender;
mod store;
mod sweeper;

pub use crate::config::{DeliveryConfig, Retention};
pub use crate::sender::{BackendStatus, DeliveryOutcome, Sender};
pub use crate::store::{
    Delivered, LogStore, PendingCounts, PendingEntry, PendingSummary, QueueKey, Stored,
    SweepReport,
};
pub use crate::sweeper::{DEFAULT_INITIAL_DELAY_SECS, DEFAULT_SWEEP_INTERVAL_SECS, RetrySweeper};
