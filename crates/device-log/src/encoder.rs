//! # Batch Encoder
//!
//! Turns sampler output, or a synthetic full batch, into wire records and
//! builds the single-position power and geofence records.

use std::sync::Arc;

use chrono::Duration;
use dashmap::DashMap;
use rand::Rng;
use route::geo::{bearing_deg, distance_m};
use route::{MAX_STEP_M, RandomWalk, RoutePoint};
use telemetry::Clock;
use tracing::warn;

use crate::config::EncoderConfig;
use crate::model::{
    GeofenceEvent, GeofenceLog, GpsEntry, GpsLog, GpsStatus, PowerLog, Reading, Sample,
};

/// Largest odometer value the `sum` field can carry.
pub const MAX_ODOMETER_M: f64 = 9_999_999.0;
/// Entries in a full GPS batch, one per second.
pub const BATCH_SECONDS: usize = 60;

const GPS_TIME: &str = "%Y%m%d%H%M";
const EVENT_TIME: &str = "%Y%m%d%H%M%S";

/// Output of [`BatchEncoder::synthetic_batch`].
#[derive(Debug, Clone)]
pub struct SyntheticBatch {
    pub log: GpsLog,
    /// Reading after the last generated second.
    pub last: Reading,
}

pub struct BatchEncoder {
    config: EncoderConfig,
    clock: Arc<dyn Clock>,
    /// Most recent power-on time per device, echoed by the next power-off.
    power_on_times: DashMap<String, String>,
}

impl BatchEncoder {
    #[must_use]
    pub fn new(config: EncoderConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock, power_on_times: DashMap::new() }
    }

    /// GPS record from sampler output, one entry per sample in order.
    pub fn encode_samples(&self, mdn: &str, samples: &[Sample], rng: &mut impl Rng) -> GpsLog {
        let status = self.config.live_fix.draw(rng);
        let c_list = samples
            .iter()
            .enumerate()
            .map(|(sec, sample)| {
                let reading = Reading {
                    position: RoutePoint::new(sample.latitude, sample.longitude),
                    speed: sample.speed,
                    heading: sample.heading,
                    odometer: sample.odometer,
                };
                gps_entry(sec, status, &reading, sample.battery)
            })
            .collect();

        self.gps_log(mdn, c_list)
    }

    /// Full 60-second GPS batch generated by random walk from `from`.
    ///
    /// The fix status is drawn once for the whole batch. With
    /// [`GpsStatus::NoDevice`] the vehicle does not move and every entry
    /// carries zeroed position fields.
    pub fn synthetic_batch(&self, mdn: &str, from: Reading, rng: &mut impl Rng) -> SyntheticBatch {
        let status = self.config.synthetic_fix.draw(rng);
        let walk = RandomWalk::default();
        let mut current = from;
        let mut c_list = Vec::with_capacity(BATCH_SECONDS);

        for sec in 0..BATCH_SECONDS {
            if !status.zeroes_position() {
                let next = walk.step(current.position, rng);
                let distance = distance_m(current.position, next);
                if distance > 0.0 {
                    current.heading = bearing_deg(current.position, next);
                }
                current.speed = distance * 3.6;
                if distance <= MAX_STEP_M {
                    current.odometer += distance;
                }
                current.position = next;
            }
            let battery = rng.gen_range(11.5..=14.5);
            c_list.push(gps_entry(sec, status, &current, battery));
        }

        SyntheticBatch { log: self.gps_log(mdn, c_list), last: current }
    }

    /// Power-on record. Position is the last stop position; a device that
    /// has never stopped reports an invalid fix with no position.
    pub fn power_on(
        &self, mdn: &str, last_stop: Option<RoutePoint>, odometer: f64, rng: &mut impl Rng,
    ) -> PowerLog {
        let on_time = self.clock.local_now().format(EVENT_TIME).to_string();
        let (gcd, lat, lon) = match last_stop {
            Some(point) => (
                valid_or_previous(rng),
                micro_degrees(point.latitude),
                micro_degrees(point.longitude),
            ),
            None => (GpsStatus::Invalid, "0".to_string(), "0".to_string()),
        };

        self.power_on_times.insert(mdn.to_string(), on_time.clone());

        PowerLog {
            mdn: mdn.to_string(),
            ids: self.config.ids.clone(),
            on_time,
            off_time: String::new(),
            gcd,
            lat,
            lon,
            ang: "0".to_string(),
            spd: "0".to_string(),
            sum: odometer_field(odometer),
        }
    }

    /// Power-off record at the live position, echoing the remembered
    /// power-on time.
    pub fn power_off(&self, mdn: &str, reading: &Reading, rng: &mut impl Rng) -> PowerLog {
        let now = self.clock.local_now();
        let on_time = if let Some((_, on_time)) = self.power_on_times.remove(mdn) {
            on_time
        } else {
            warn!(mdn = %mdn, "no power-on time recorded, using one hour ago");
            (now - Duration::hours(1)).format(EVENT_TIME).to_string()
        };

        PowerLog {
            mdn: mdn.to_string(),
            ids: self.config.ids.clone(),
            on_time,
            off_time: now.format(EVENT_TIME).to_string(),
            gcd: valid_or_previous(rng),
            lat: micro_degrees(reading.position.latitude),
            lon: micro_degrees(reading.position.longitude),
            ang: whole(reading.heading),
            spd: whole(reading.speed),
            sum: odometer_field(reading.odometer),
        }
    }

    /// Most recent power-on time for a device, if it has not yet been
    /// consumed by a power-off.
    #[must_use]
    pub fn power_on_time(&self, mdn: &str) -> Option<String> {
        self.power_on_times.get(mdn).map(|entry| entry.value().clone())
    }

    pub fn geofence(
        &self, mdn: &str, reading: &Reading, group_id: &str, point_id: &str,
        event: GeofenceEvent, rng: &mut impl Rng,
    ) -> GeofenceLog {
        let gcd = if rng.gen_bool(0.95) {
            GpsStatus::Valid
        } else if rng.gen_bool(0.9) {
            GpsStatus::Invalid
        } else {
            GpsStatus::NoDevice
        };
        let (lat, lon, ang, spd) = position_fields(gcd, reading);

        GeofenceLog {
            mdn: mdn.to_string(),
            ids: self.config.ids.clone(),
            o_time: self.clock.local_now().format(EVENT_TIME).to_string(),
            geo_grp_id: group_id.to_string(),
            geo_p_id: point_id.to_string(),
            evt_val: event,
            gcd,
            lat,
            lon,
            ang,
            spd,
            sum: odometer_field(reading.odometer),
        }
    }

    fn gps_log(&self, mdn: &str, c_list: Vec<GpsEntry>) -> GpsLog {
        GpsLog {
            mdn: mdn.to_string(),
            ids: self.config.ids.clone(),
            o_time: self.clock.local_now().format(GPS_TIME).to_string(),
            c_cnt: c_list.len().to_string(),
            c_list,
        }
    }
}

fn gps_entry(sec: usize, status: GpsStatus, reading: &Reading, battery: f64) -> GpsEntry {
    let (lat, lon, ang, spd) = position_fields(status, reading);
    GpsEntry {
        sec: sec.to_string(),
        gcd: status,
        lat,
        lon,
        ang,
        spd,
        sum: odometer_field(reading.odometer),
        bat: battery_field(battery),
    }
}

fn position_fields(status: GpsStatus, reading: &Reading) -> (String, String, String, String) {
    if status.zeroes_position() {
        return ("0".to_string(), "0".to_string(), "0".to_string(), "0".to_string());
    }
    (
        micro_degrees(reading.position.latitude),
        micro_degrees(reading.position.longitude),
        whole(reading.heading),
        whole(reading.speed),
    )
}

fn valid_or_previous(rng: &mut impl Rng) -> GpsStatus {
    if rng.gen_bool(0.95) { GpsStatus::Valid } else { GpsStatus::Previous }
}

#[allow(clippy::cast_possible_truncation)]
fn micro_degrees(degrees: f64) -> String {
    ((degrees * 1_000_000.0).round() as i64).to_string()
}

#[allow(clippy::cast_possible_truncation)]
fn whole(value: f64) -> String {
    (value.trunc() as i64).to_string()
}

#[allow(clippy::cast_possible_truncation)]
fn odometer_field(meters: f64) -> String {
    (meters.clamp(0.0, MAX_ODOMETER_M) as i64).to_string()
}

#[allow(clippy::cast_possible_truncation)]
fn battery_field(volts: f64) -> String {
    ((volts * 10.0) as i64).to_string()
}
