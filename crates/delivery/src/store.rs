//! In-memory pending queues, one per (device, log kind).

use std::collections::VecDeque;
use std::ops::AddAssign;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use device_log::{LogKind, LogRecord};
use serde::Serialize;
use telemetry::Clock;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::Retention;
use crate::key_locker::KeyLocker;
use crate::sender::{BackendStatus, Sender};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueKey {
    pub mdn: String,
    pub kind: LogKind,
}

impl QueueKey {
    #[must_use]
    pub fn new(mdn: impl Into<String>, kind: LogKind) -> Self {
        Self { mdn: mdn.into(), kind }
    }
}

/// A record waiting for redelivery.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEntry {
    pub record: LogRecord,
    pub enqueued_at: DateTime<Utc>,
    pub retry_count: u32,
    pub kind: LogKind,
}

/// How [`LogStore::store`] disposed of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stored {
    Delivered,
    Queued,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub key: QueueKey,
    pub retry_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub delivered: Vec<Delivered>,
    pub failed: usize,
    pub expired: usize,
}

impl AddAssign for SweepReport {
    fn add_assign(&mut self, other: Self) {
        self.delivered.extend(other.delivered);
        self.failed += other.failed;
        self.expired += other.expired;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingCounts {
    pub gps: usize,
    pub power: usize,
    pub geofence: usize,
}

impl PendingCounts {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.gps + self.power + self.geofence
    }

    fn add(&mut self, kind: LogKind, count: usize) {
        match kind {
            LogKind::Gps => self.gps += count,
            LogKind::Power => self.power += count,
            LogKind::Geofence => self.geofence += count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSummary {
    pub counts: PendingCounts,
    pub total: usize,
    pub backend_status: BackendStatus,
    pub last_connection_attempt: Option<DateTime<Utc>>,
}

struct Health {
    status: BackendStatus,
    checked_at: Option<DateTime<Utc>>,
}

/// Send-or-queue store with at-least-once redelivery.
///
/// A queue is drained by at most one sweep at a time; records stored while
/// a sweep is in flight land behind the entries the sweep writes back.
pub struct LogStore {
    sender: Sender,
    clock: Arc<dyn Clock>,
    retention: Retention,
    queues: DashMap<QueueKey, VecDeque<PendingEntry>>,
    drains: KeyLocker<QueueKey>,
    health: RwLock<Health>,
}

impl LogStore {
    #[must_use]
    pub fn new(sender: Sender, clock: Arc<dyn Clock>, retention: Retention) -> Self {
        Self {
            sender,
            clock,
            retention,
            queues: DashMap::new(),
            drains: KeyLocker::default(),
            health: RwLock::new(Health { status: BackendStatus::Unknown, checked_at: None }),
        }
    }

    /// Attempt immediate delivery, queueing the record on any failure.
    pub async fn store(&self, record: LogRecord) -> Stored {
        let outcome = self.sender.send(&record).await;
        if outcome.is_success() {
            info!(monotonic_counter.logs_delivered = 1, mdn = %record.mdn(), kind = %record.kind());
            return Stored::Delivered;
        }

        warn!(
            monotonic_counter.logs_queued = 1,
            mdn = %record.mdn(),
            kind = %record.kind(),
            %outcome,
            "delivery failed, queued for retry"
        );
        let key = QueueKey::new(record.mdn(), record.kind());
        let entry = PendingEntry {
            kind: record.kind(),
            record,
            enqueued_at: self.clock.now_utc(),
            retry_count: 0,
        };
        self.queues.entry(key).or_default().push_back(entry);
        Stored::Queued
    }

    /// Retry every pending queue once.
    pub async fn sweep_all(&self) -> SweepReport {
        let keys: Vec<QueueKey> = self.queues.iter().map(|queue| queue.key().clone()).collect();
        if !keys.is_empty() {
            self.health.write().await.checked_at = Some(self.clock.now_utc());
        }
        let mut report = SweepReport::default();
        for key in keys {
            report += self.sweep(&key).await;
        }

        if !report.delivered.is_empty() || report.failed > 0 || report.expired > 0 {
            info!(
                delivered = report.delivered.len(),
                failed = report.failed,
                expired = report.expired,
                "retry sweep complete"
            );
        }
        info!(gauge.pending_logs = self.pending_counts().total());
        report
    }

    async fn sweep(&self, key: &QueueKey) -> SweepReport {
        let _guard = self.drains.lock(key).await;
        let drained: Vec<PendingEntry> = match self.queues.get_mut(key) {
            Some(mut queue) => queue.drain(..).collect(),
            None => return SweepReport::default(),
        };

        let now = self.clock.now_utc();
        let max_age = self.retention.for_kind(key.kind);
        let mut report = SweepReport::default();
        let mut failed = VecDeque::new();

        for mut entry in drained {
            if now - entry.enqueued_at >= max_age {
                warn!(
                    monotonic_counter.logs_expired = 1,
                    mdn = %key.mdn,
                    kind = %key.kind,
                    retry_count = entry.retry_count,
                    "pending log expired"
                );
                report.expired += 1;
                continue;
            }

            let outcome = self.sender.send(&entry.record).await;
            if outcome.is_success() {
                info!(
                    monotonic_counter.logs_redelivered = 1,
                    mdn = %key.mdn,
                    kind = %key.kind,
                    retry_count = entry.retry_count
                );
                report.delivered.push(Delivered { key: key.clone(), retry_count: entry.retry_count });
            } else {
                entry.retry_count += 1;
                warn!(mdn = %key.mdn, kind = %key.kind, retry_count = entry.retry_count, %outcome, "retry failed");
                report.failed += 1;
                failed.push_back(entry);
            }
        }

        {
            let mut queue = self.queues.entry(key.clone()).or_default();
            failed.extend(queue.drain(..));
            *queue = failed;
        }
        self.queues.remove_if(key, |_, queue| queue.is_empty());
        report
    }

    /// Snapshot of every queued entry for `mdn`, oldest first per kind.
    #[must_use]
    pub fn pending(&self, mdn: &str) -> Vec<PendingEntry> {
        LogKind::ALL
            .iter()
            .filter_map(|kind| self.queues.get(&QueueKey::new(mdn, *kind)))
            .flat_map(|queue| queue.iter().cloned().collect::<Vec<_>>())
            .collect()
    }

    #[must_use]
    pub fn pending_counts(&self) -> PendingCounts {
        let mut counts = PendingCounts::default();
        for queue in &self.queues {
            counts.add(queue.key().kind, queue.len());
        }
        counts
    }

    /// Probe the collector and remember the result for [`Self::summary`].
    /// Sweeps also count as connection attempts.
    pub async fn check_backend(&self) -> BackendStatus {
        let status = self.sender.check_health().await;
        let mut health = self.health.write().await;
        health.status = status.clone();
        health.checked_at = Some(self.clock.now_utc());
        status
    }

    pub async fn summary(&self) -> PendingSummary {
        let counts = self.pending_counts();
        let health = self.health.read().await;
        PendingSummary {
            counts,
            total: counts.total(),
            backend_status: health.status.clone(),
            last_connection_attempt: health.checked_at,
        }
    }
}
