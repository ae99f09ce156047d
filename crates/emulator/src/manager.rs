//! # Emulator
//!
//! Owns the single device session: starts the sampler loop, routes every
//! produced record through the [`LogStore`], and remembers each device's
//! odometer and stop position so the next trip resumes where the last one
//! ended.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use delivery::{LogStore, Stored};
use device_log::{BatchEncoder, GeofenceEvent, LogRecord, Reading, Sample};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use route::{RoutePoint, RouteSource};
use telemetry::{Clock, Result, invalid_state, not_found};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::config::EmulatorConfig;
use crate::sampler::{Cadence, Sampler, Tick};
use crate::state::{DeviceProfile, Status};

#[derive(Debug, Clone, Copy)]
struct DeviceMemory {
    odometer: f64,
    last_stop: RoutePoint,
}

struct Session {
    mdn: String,
    sampler: Arc<Mutex<Sampler>>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Session {
    fn is_active(&self) -> bool {
        lock(&self.sampler).is_active()
    }
}

struct Inner {
    config: EmulatorConfig,
    clock: Arc<dyn Clock>,
    routes: RouteSource,
    encoder: BatchEncoder,
    store: Arc<LogStore>,
    session: tokio::sync::Mutex<Option<Session>>,
    memory: DashMap<String, DeviceMemory>,
    /// Sampler loops, flush deliveries and sweeps.
    tasks: TaskTracker,
}

#[derive(Clone)]
pub struct Emulator {
    inner: Arc<Inner>,
}

impl Emulator {
    #[must_use]
    pub fn new(
        config: EmulatorConfig, clock: Arc<dyn Clock>, routes: RouteSource, encoder: BatchEncoder,
        store: Arc<LogStore>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                clock,
                routes,
                encoder,
                store,
                session: tokio::sync::Mutex::new(None),
                memory: DashMap::new(),
                tasks: TaskTracker::new(),
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<LogStore> {
        &self.inner.store
    }

    /// Begin a trip for `profile.mdn` towards `destination` (or the
    /// configured default).
    ///
    /// A different device that is still running is stopped first.
    ///
    /// # Errors
    ///
    /// Returns [`telemetry::Error::InvalidState`] if this device is already
    /// active and [`telemetry::Error::RouteUnavailable`] if no route could be
    /// planned.
    pub async fn start(&self, profile: DeviceProfile, destination: Option<RoutePoint>) -> Result<()> {
        let mdn = profile.mdn.clone();
        let mut slot = self.inner.session.lock().await;

        if let Some(current) = slot.as_mut() {
            if current.is_active() {
                if current.mdn == mdn {
                    return Err(invalid_state!("device {mdn} is already running"));
                }
                info!(running = %current.mdn, mdn = %mdn, "stopping running device before start");
                self.inner.halt(current).await;
            } else if let Some(handle) = current.handle.take() {
                // a completed trip may still be delivering its final records
                self.inner.join(&current.mdn, handle).await;
            }
        }

        let memory = self.inner.memory.get(&mdn).map(|entry| *entry.value());
        let origin = memory.map_or_else(|| self.inner.seed_origin(), |memory| memory.last_stop);
        let odometer = memory.map_or(0.0, |memory| memory.odometer);
        let destination = destination.unwrap_or(self.inner.config.destination);

        let route = self
            .inner
            .routes
            .plan(origin, destination, self.inner.config.interval.as_secs_f64())
            .await?;

        let cadence = Cadence {
            interval: self.inner.config.interval,
            batch_size: self.inner.config.batch_size,
            send_interval: self.inner.config.send_interval,
        };
        let points = route.len();
        let sampler = Arc::new(Mutex::new(Sampler::new(
            profile,
            origin,
            odometer,
            route,
            cadence,
            self.inner.clock.now_utc(),
        )));

        let power_on = self.inner.encoder.power_on(
            &mdn,
            memory.map(|memory| memory.last_stop),
            odometer,
            &mut rand::thread_rng(),
        );
        self.inner.store.store(power_on.into()).await;

        let cancel = CancellationToken::new();
        let handle = self.inner.tasks.spawn(Arc::clone(&self.inner).run(
            mdn.clone(),
            Arc::clone(&sampler),
            cancel.clone(),
        ));
        *slot = Some(Session { mdn: mdn.clone(), sampler, cancel, handle: Some(handle) });

        info!(monotonic_counter.trips_started = 1, mdn = %mdn, points, "device started");
        Ok(())
    }

    /// Stop the running trip, keeping the device resumable.
    ///
    /// # Errors
    ///
    /// Returns [`telemetry::Error::InvalidState`] if the device is unknown or
    /// not active.
    pub async fn stop(&self, mdn: &str) -> Result<()> {
        let mut slot = self.inner.session.lock().await;
        let Some(session) = slot.as_mut().filter(|session| session.mdn == mdn) else {
            return Err(invalid_state!("device {mdn} is not running"));
        };
        if !session.is_active() {
            return Err(invalid_state!("device {mdn} is not active"));
        }

        self.inner.halt(session).await;
        info!(monotonic_counter.trips_stopped = 1, mdn = %mdn, "device stopped");
        Ok(())
    }

    /// Stop whatever is running, then wait up to the drain timeout for
    /// in-flight deliveries and sweeps. Used on process shutdown.
    pub async fn shutdown(&self) {
        {
            let mut slot = self.inner.session.lock().await;
            if let Some(session) = slot.as_mut() {
                if session.is_active() {
                    self.inner.halt(session).await;
                } else if let Some(handle) = session.handle.take() {
                    self.inner.join(&session.mdn, handle).await;
                }
            }
        }

        let tasks = &self.inner.tasks;
        tasks.close();
        if tokio::time::timeout(self.inner.config.drain_timeout, tasks.wait()).await.is_err() {
            warn!(in_flight = tasks.len(), "shutdown drain timed out");
        }
        tasks.reopen();
    }

    /// Snapshot of the device's state.
    ///
    /// # Errors
    ///
    /// Returns [`telemetry::Error::NotFound`] if the device has no session.
    pub async fn status(&self, mdn: &str) -> Result<Status> {
        let slot = self.inner.session.lock().await;
        let Some(session) = slot.as_ref().filter(|session| session.mdn == mdn) else {
            return Err(not_found!("device {mdn} not found"));
        };
        let mut status = lock(&session.sampler).status();
        status.power_on_time = self.inner.encoder.power_on_time(mdn);
        Ok(status)
    }

    /// Report a geofence crossing at the live position.
    ///
    /// # Errors
    ///
    /// Returns [`telemetry::Error::BadRequest`] for an event other than `1`
    /// or `2`, and [`telemetry::Error::InvalidState`] if the device is not
    /// active.
    pub async fn geofence(
        &self, mdn: &str, group_id: &str, point_id: &str, event: &str,
    ) -> Result<Stored> {
        let event = GeofenceEvent::try_from(event)?;
        let reading = self.active_reading(mdn).await?;
        let log = self.inner.encoder.geofence(
            mdn,
            &reading,
            group_id,
            point_id,
            event,
            &mut rand::thread_rng(),
        );
        Ok(self.inner.store.store(log.into()).await)
    }

    /// Generate and deliver a full synthetic GPS batch from the live
    /// position.
    ///
    /// # Errors
    ///
    /// Returns [`telemetry::Error::InvalidState`] if the device is not
    /// active.
    pub async fn synthetic_batch(&self, mdn: &str) -> Result<Stored> {
        let reading = self.active_reading(mdn).await?;
        let batch = self.inner.encoder.synthetic_batch(mdn, reading, &mut rand::thread_rng());
        Ok(self.inner.store.store(batch.log.into()).await)
    }

    async fn active_reading(&self, mdn: &str) -> Result<Reading> {
        let slot = self.inner.session.lock().await;
        let Some(session) = slot.as_ref().filter(|session| session.mdn == mdn) else {
            return Err(invalid_state!("device {mdn} is not running"));
        };
        let sampler = lock(&session.sampler);
        if !sampler.is_active() {
            return Err(invalid_state!("device {mdn} is not active"));
        }
        Ok(sampler.reading())
    }
}

impl Inner {
    fn seed_origin(&self) -> RoutePoint {
        let origin = self.config.default_origin;
        let jitter = self.config.seed_jitter_deg;
        if jitter <= 0.0 {
            return origin;
        }
        let mut rng = rand::thread_rng();
        RoutePoint::new(
            origin.latitude + rng.gen_range(-jitter..=jitter),
            origin.longitude + rng.gen_range(-jitter..=jitter),
        )
    }

    /// Wait up to the stop-join timeout for a sampler loop. A loop that
    /// overruns is left to finish under the task tracker.
    async fn join(&self, mdn: &str, handle: JoinHandle<()>) {
        if tokio::time::timeout(self.config.stop_join_timeout, handle).await.is_err() {
            warn!(mdn = %mdn, "sampler loop did not stop in time");
        }
    }

    /// Explicit stop: end the loop, remember, flush, power off.
    async fn halt(&self, session: &mut Session) {
        session.cancel.cancel();
        if let Some(handle) = session.handle.take() {
            self.join(&session.mdn, handle).await;
        }

        let stopped = {
            let mut sampler = lock(&session.sampler);
            sampler.stop().map(|samples| (samples, sampler.reading()))
        };
        // completed on its own while we were waiting
        let Some((samples, reading)) = stopped else {
            return;
        };

        self.remember(&session.mdn, &reading);
        self.flush(&session.mdn, &samples).await;
        self.power_off(&session.mdn, &reading).await;
        self.sweep_pending();
    }

    async fn run(
        self: Arc<Self>, mdn: String, sampler: Arc<Mutex<Sampler>>, cancel: CancellationToken,
    ) {
        let mut rng = StdRng::from_entropy();
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the first immediate tick
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => break,

                _ = interval.tick() => {
                    let now = self.clock.now_utc();
                    let tick = lock(&sampler).tick(now, &mut rng);
                    match tick {
                        Tick::Sampled => {}
                        Tick::Idle => break,
                        Tick::Flush(samples) => {
                            let log = self.encoder.encode_samples(&mdn, &samples, &mut rng);
                            let store = Arc::clone(&self.store);
                            self.tasks.spawn(async move {
                                store.store(log.into()).await;
                            });
                        }
                        Tick::Completed(samples) => {
                            info!(mdn = %mdn, "route exhausted");
                            let reading = lock(&sampler).reading();
                            self.remember(&mdn, &reading);
                            self.flush(&mdn, &samples).await;
                            self.power_off(&mdn, &reading).await;
                            self.sweep_pending();
                            info!(monotonic_counter.trips_completed = 1, mdn = %mdn, "trip complete");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn flush(&self, mdn: &str, samples: &[Sample]) {
        if samples.is_empty() {
            return;
        }
        let log = self.encoder.encode_samples(mdn, samples, &mut rand::thread_rng());
        self.store.store(LogRecord::from(log)).await;
    }

    async fn power_off(&self, mdn: &str, reading: &Reading) {
        let log = self.encoder.power_off(mdn, reading, &mut rand::thread_rng());
        self.store.store(log.into()).await;
    }

    /// Where the next trip for `mdn` resumes.
    fn remember(&self, mdn: &str, reading: &Reading) {
        self.memory.insert(
            mdn.to_string(),
            DeviceMemory { odometer: reading.odometer, last_stop: reading.position },
        );
    }

    /// Best-effort sweep that never holds up the caller.
    fn sweep_pending(&self) {
        let store = Arc::clone(&self.store);
        self.tasks.spawn(async move {
            store.sweep_all().await;
        });
    }
}

fn lock(sampler: &Mutex<Sampler>) -> MutexGuard<'_, Sampler> {
    sampler.lock().unwrap_or_else(PoisonError::into_inner)
}
