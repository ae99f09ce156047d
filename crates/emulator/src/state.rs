//! Simulated vehicle attributes and the per-tick motion model.

use device_log::Reading;
use route::geo::{bearing_deg, distance_m};
use route::{MAX_STEP_M, RoutePoint};
use serde::Serialize;
use tracing::warn;

pub const MAX_SPEED_KMH: f64 = 120.0;

const SPEED_KEEP: f64 = 0.7;
const HEADING_KEEP: f64 = 0.8;
const IDLE_DECAY: f64 = 0.9;

/// Identifiers supplied when a device starts; fixed for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub mdn: String,
    pub terminal_id: String,
    pub manufacturer_id: String,
    pub packet_version: String,
    pub device_id: String,
    pub firmware_version: String,
}

impl DeviceProfile {
    /// Profile used when a start request supplies only the device number.
    #[must_use]
    pub fn for_mdn(mdn: &str) -> Self {
        let chars: Vec<char> = mdn.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        Self {
            mdn: mdn.to_string(),
            terminal_id: format!("TERM-{tail}"),
            manufacturer_id: "1".to_string(),
            packet_version: "1".to_string(),
            device_id: "101".to_string(),
            firmware_version: "1.0.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Stopped explicitly; a new start resumes from the stop position.
    Idle,
    Active,
    /// Route exhausted.
    Completed,
}

#[derive(Debug, Clone)]
pub struct VehicleState {
    pub profile: DeviceProfile,
    pub position: RoutePoint,
    /// degrees, 0-360
    pub heading: f64,
    /// km/h
    pub speed: f64,
    /// meters, never decreases
    pub odometer: f64,
    pub phase: Phase,
}

impl VehicleState {
    #[must_use]
    pub const fn new(profile: DeviceProfile, position: RoutePoint, odometer: f64) -> Self {
        Self { profile, position, heading: 0.0, speed: 0.0, odometer, phase: Phase::Active }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    /// Move to `next`, `elapsed_secs` after the previous position.
    pub fn advance(&mut self, next: RoutePoint, elapsed_secs: f64) {
        let distance = distance_m(self.position, next);

        if distance > 0.0 {
            let bearing = bearing_deg(self.position, next);
            self.heading = smooth_heading(self.heading, bearing);
            let raw_kmh = distance / elapsed_secs * 3.6;
            self.speed = self.speed.mul_add(SPEED_KEEP, raw_kmh * (1.0 - SPEED_KEEP));

            if distance <= MAX_STEP_M {
                self.odometer += distance;
            } else {
                warn!(
                    mdn = %self.profile.mdn,
                    distance_m = distance,
                    "position jump exceeds step limit, odometer not advanced"
                );
            }
        } else {
            self.speed *= IDLE_DECAY;
        }

        self.speed = self.speed.clamp(0.0, MAX_SPEED_KMH);
        self.position = next;
    }

    #[must_use]
    pub const fn reading(&self) -> Reading {
        Reading {
            position: self.position,
            speed: self.speed,
            heading: self.heading,
            odometer: self.odometer,
        }
    }
}

/// 80/20 smoothing towards `bearing`; a swing of more than 180 degrees
/// snaps straight to the new bearing.
#[must_use]
pub fn smooth_heading(previous: f64, bearing: f64) -> f64 {
    if (bearing - previous).abs() > 180.0 {
        bearing
    } else {
        previous.mul_add(HEADING_KEEP, bearing * (1.0 - HEADING_KEEP))
    }
}

/// Consistent point-in-time view of a device.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(flatten)]
    pub profile: DeviceProfile,
    pub phase: Phase,
    pub active: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub odometer: f64,
    pub route_index: usize,
    pub route_len: usize,
    pub pending_samples: usize,
    pub power_on_time: Option<String>,
}
