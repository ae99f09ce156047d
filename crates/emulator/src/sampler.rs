//! Per-tick advance and batch accumulation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use device_log::{Reading, Sample};
use rand::Rng;
use route::{RouteCursor, RoutePoint};

use crate::state::{DeviceProfile, Phase, Status, VehicleState};

const BATTERY_VOLTS: std::ops::RangeInclusive<f64> = 11.5..=14.5;

/// What a tick produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// The device is not active; nothing changed.
    Idle,
    Sampled,
    /// Batch threshold reached; the samples are handed off and the buffer
    /// is empty again.
    Flush(Vec<Sample>),
    /// The route is exhausted. Carries the final, possibly partial, batch.
    Completed(Vec<Sample>),
}

/// Sampler cadence.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    pub interval: Duration,
    pub batch_size: usize,
    pub send_interval: Duration,
}

#[derive(Debug)]
pub struct Sampler {
    state: VehicleState,
    cursor: RouteCursor,
    batch: Vec<Sample>,
    cadence: Cadence,
    last_tick: DateTime<Utc>,
    last_flush: DateTime<Utc>,
}

impl Sampler {
    #[must_use]
    pub fn new(
        profile: DeviceProfile, origin: RoutePoint, odometer: f64, route: Vec<RoutePoint>,
        cadence: Cadence, now: DateTime<Utc>,
    ) -> Self {
        Self {
            state: VehicleState::new(profile, origin, odometer),
            cursor: RouteCursor::new(route),
            batch: Vec::with_capacity(cadence.batch_size),
            cadence,
            last_tick: now,
            last_flush: now,
        }
    }

    /// Advance one waypoint and record a sample.
    pub fn tick(&mut self, now: DateTime<Utc>, rng: &mut impl Rng) -> Tick {
        if !self.state.is_active() {
            return Tick::Idle;
        }
        let Some(next) = self.cursor.next() else {
            return self.complete();
        };

        #[allow(clippy::cast_precision_loss)]
        let mut elapsed = (now - self.last_tick).num_milliseconds() as f64 / 1000.0;
        if elapsed <= 0.0 {
            elapsed = self.cadence.interval.as_secs_f64();
        }
        self.state.advance(next, elapsed);
        self.last_tick = now;

        self.batch.push(Sample {
            timestamp: now,
            latitude: self.state.position.latitude,
            longitude: self.state.position.longitude,
            speed: self.state.speed,
            heading: self.state.heading,
            battery: rng.gen_range(BATTERY_VOLTS),
            odometer: self.state.odometer,
        });

        if !self.cursor.has_next() {
            return self.complete();
        }

        let since_flush = (now - self.last_flush).to_std().unwrap_or_default();
        if self.batch.len() >= self.cadence.batch_size || since_flush >= self.cadence.send_interval {
            self.last_flush = now;
            return Tick::Flush(std::mem::take(&mut self.batch));
        }
        Tick::Sampled
    }

    fn complete(&mut self) -> Tick {
        self.state.phase = Phase::Completed;
        Tick::Completed(std::mem::take(&mut self.batch))
    }

    /// Mark the device idle and hand back the partial batch. `None` when the
    /// device was no longer active.
    pub fn stop(&mut self) -> Option<Vec<Sample>> {
        if !self.state.is_active() {
            return None;
        }
        self.state.phase = Phase::Idle;
        Some(std::mem::take(&mut self.batch))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.state.phase
    }

    #[must_use]
    pub const fn reading(&self) -> Reading {
        self.state.reading()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        Status {
            profile: self.state.profile.clone(),
            phase: self.state.phase,
            active: self.state.is_active(),
            latitude: self.state.position.latitude,
            longitude: self.state.position.longitude,
            speed: self.state.speed,
            heading: self.state.heading,
            odometer: self.state.odometer,
            route_index: self.cursor.index(),
            route_len: self.cursor.len(),
            pending_samples: self.batch.len(),
            power_on_time: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use route::geo::{bearing_deg, distance_m};

    use super::*;

    const A: RoutePoint = RoutePoint::new(37.5665, 126.9780);
    const B: RoutePoint = RoutePoint::new(37.5666, 126.9781);
    const C: RoutePoint = RoutePoint::new(37.5667, 126.9782);

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 1, 0, 0).unwrap()
    }

    fn cadence(batch_size: usize, send_interval_secs: u64) -> Cadence {
        Cadence {
            interval: Duration::from_secs(1),
            batch_size,
            send_interval: Duration::from_secs(send_interval_secs),
        }
    }

    fn sampler(route: Vec<RoutePoint>, cadence: Cadence) -> Sampler {
        Sampler::new(DeviceProfile::for_mdn("0101234"), A, 0.0, route, cadence, start())
    }

    fn at(secs: i64) -> DateTime<Utc> {
        start() + chrono::Duration::seconds(secs)
    }

    #[test]
    fn three_point_trip() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut sampler = sampler(vec![A, B, C, C], cadence(60, 60));

        assert_eq!(sampler.tick(at(1), &mut rng), Tick::Sampled);
        assert_eq!(sampler.tick(at(2), &mut rng), Tick::Sampled);
        let after_b = sampler.reading().heading;
        assert_eq!(sampler.tick(at(3), &mut rng), Tick::Sampled);
        let after_c = sampler.reading().heading;

        let expected = distance_m(A, B) + distance_m(B, C);
        assert!((sampler.reading().odometer - expected).abs() < 1e-6);
        assert!((14.0..=30.0).contains(&expected));

        let bearing = bearing_deg(A, B);
        assert!(bearing > 30.0 && bearing < 60.0);
        assert!(after_b > 0.0);
        assert!(after_c > after_b && after_c < bearing);
    }

    #[test]
    fn exhaustion_flushes_partial_batch() {
        let mut rng = StdRng::seed_from_u64(2);
        let route: Vec<RoutePoint> = (0..45)
            .map(|i| {
                let step = f64::from(i) * 0.000_05;
                RoutePoint::new(A.latitude + step, A.longitude + step)
            })
            .collect();
        let mut sampler = sampler(route, cadence(60, 60));

        let mut completed = None;
        for secs in 1..=45 {
            match sampler.tick(at(secs), &mut rng) {
                Tick::Sampled => {}
                Tick::Completed(batch) => {
                    completed = Some(batch);
                    break;
                }
                other => panic!("unexpected tick {other:?}"),
            }
        }

        let batch = completed.expect("route should be exhausted");
        assert_eq!(batch.len(), 45);
        assert!(!sampler.is_active());
        assert_eq!(sampler.phase(), Phase::Completed);
        assert_eq!(sampler.tick(at(46), &mut rng), Tick::Idle);
    }

    #[test]
    fn flushes_on_size() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut sampler = sampler(vec![A; 10], cadence(3, 60));

        assert_eq!(sampler.tick(at(1), &mut rng), Tick::Sampled);
        assert_eq!(sampler.tick(at(2), &mut rng), Tick::Sampled);
        let Tick::Flush(batch) = sampler.tick(at(3), &mut rng) else {
            panic!("expected a flush");
        };
        assert_eq!(batch.len(), 3);
        assert_eq!(sampler.status().pending_samples, 0);
    }

    #[test]
    fn flushes_on_time() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut sampler = sampler(vec![A; 10], cadence(60, 5));

        assert_eq!(sampler.tick(at(1), &mut rng), Tick::Sampled);
        let Tick::Flush(batch) = sampler.tick(at(5), &mut rng) else {
            panic!("expected a flush");
        };
        assert_eq!(batch.len(), 2);
        assert_eq!(sampler.tick(at(6), &mut rng), Tick::Sampled);
    }

    #[test]
    fn odometer_never_decreases() {
        let mut rng = StdRng::seed_from_u64(5);
        let route = route::RandomWalk::default().generate(A, 200, &mut rng);
        let mut sampler = sampler(route, cadence(60, 60));

        let mut last = sampler.reading().odometer;
        for secs in 1..=200 {
            let tick = sampler.tick(at(secs), &mut rng);
            let odometer = sampler.reading().odometer;
            assert!(odometer >= last);
            last = odometer;
            if let Tick::Flush(batch) | Tick::Completed(batch) = &tick {
                for sample in batch {
                    assert!((11.5..=14.5).contains(&sample.battery));
                    assert!((0.0..=120.0).contains(&sample.speed));
                }
            }
        }
    }

    #[test]
    fn stopped_sampler_is_inert() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut sampler = sampler(vec![A, B, C, C], cadence(60, 60));
        sampler.tick(at(1), &mut rng);
        sampler.tick(at(2), &mut rng);

        let partial = sampler.stop().expect("should be active");
        assert_eq!(partial.len(), 2);
        assert_eq!(sampler.phase(), Phase::Idle);

        let odometer = sampler.reading().odometer;
        assert_eq!(sampler.tick(at(3), &mut rng), Tick::Idle);
        assert!((sampler.reading().odometer - odometer).abs() < f64::EPSILON);
        assert_eq!(sampler.stop(), None);
    }
}
