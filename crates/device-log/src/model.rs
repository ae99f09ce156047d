//! Wire-format log records accepted by the collector.
//!
//! Every value on the wire is a string; coordinates are degrees × 1,000,000.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use route::RoutePoint;
use serde::{Deserialize, Serialize};

/// Fix status reported in the `gcd` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpsStatus {
    /// Valid fix.
    #[serde(rename = "A")]
    Valid,
    /// Receiver present, no valid fix.
    #[serde(rename = "V")]
    Invalid,
    /// No receiver installed.
    #[serde(rename = "0")]
    NoDevice,
    /// No current fix; position is the previous one.
    #[serde(rename = "P")]
    Previous,
}

impl GpsStatus {
    /// Whether position fields must be zeroed on the wire.
    #[must_use]
    pub const fn zeroes_position(self) -> bool {
        matches!(self, Self::NoDevice)
    }
}

/// Probability split for drawing a [`GpsStatus`]. Whatever is left after
/// `valid` and `invalid` is [`GpsStatus::NoDevice`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixProfile {
    pub valid: f64,
    pub invalid: f64,
}

impl FixProfile {
    #[must_use]
    pub const fn new(valid: f64, invalid: f64) -> Self {
        Self { valid, invalid }
    }

    /// Ratios bounded to `[0, 1]` with `valid + invalid <= 1`.
    #[must_use]
    pub fn clamped(valid: f64, invalid: f64) -> Self {
        let valid = if valid.is_nan() { 1.0 } else { valid.clamp(0.0, 1.0) };
        let invalid = if invalid.is_nan() { 0.0 } else { invalid.clamp(0.0, 1.0 - valid) };
        Self { valid, invalid }
    }

    /// Always a valid fix.
    #[must_use]
    pub const fn always_valid() -> Self {
        Self { valid: 1.0, invalid: 0.0 }
    }

    pub fn draw(&self, rng: &mut impl Rng) -> GpsStatus {
        let roll: f64 = rng.r#gen();
        if roll < self.valid {
            GpsStatus::Valid
        } else if roll < self.valid + self.invalid {
            GpsStatus::Invalid
        } else {
            GpsStatus::NoDevice
        }
    }
}

/// Protocol identifiers fixed by the collector's API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolIds {
    /// Terminal id, `A001` for vehicle control.
    pub tid: String,
    /// Manufacturer id.
    pub mid: String,
    /// Packet version.
    pub pv: String,
    /// Device id, `1` for GPS-only terminals.
    pub did: String,
}

impl Default for ProtocolIds {
    fn default() -> Self {
        Self {
            tid: "A001".to_string(),
            mid: "6".to_string(),
            pv: "5".to_string(),
            did: "1".to_string(),
        }
    }
}

/// One tick's observation, owned by the in-flight batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// km/h
    pub speed: f64,
    /// degrees, 0-360
    pub heading: f64,
    /// battery voltage in volts
    pub battery: f64,
    /// cumulative meters at this sample
    pub odometer: f64,
}

/// Live reading used for single-position records.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reading {
    pub position: RoutePoint,
    pub speed: f64,
    pub heading: f64,
    pub odometer: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpsEntry {
    pub sec: String,
    pub gcd: GpsStatus,
    pub lat: String,
    pub lon: String,
    pub ang: String,
    pub spd: String,
    pub sum: String,
    pub bat: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsLog {
    pub mdn: String,
    #[serde(flatten)]
    pub ids: ProtocolIds,
    /// `yyyyMMddHHmm`
    pub o_time: String,
    pub c_cnt: String,
    pub c_list: Vec<GpsEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerLog {
    pub mdn: String,
    #[serde(flatten)]
    pub ids: ProtocolIds,
    /// `yyyyMMddHHmmss`, empty when unknown
    pub on_time: String,
    /// `yyyyMMddHHmmss`, empty on power-on
    pub off_time: String,
    pub gcd: GpsStatus,
    pub lat: String,
    pub lon: String,
    pub ang: String,
    pub spd: String,
    pub sum: String,
}

impl PowerLog {
    #[must_use]
    pub fn is_power_on(&self) -> bool {
        !self.on_time.is_empty() && self.off_time.is_empty()
    }
}

/// Geofence event code carried in `evtVal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeofenceEvent {
    #[serde(rename = "1")]
    Enter,
    #[serde(rename = "2")]
    Exit,
}

impl TryFrom<&str> for GeofenceEvent {
    type Error = telemetry::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "1" => Ok(Self::Enter),
            "2" => Ok(Self::Exit),
            other => Err(telemetry::bad_request!("evtVal must be 1 or 2, got {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceLog {
    pub mdn: String,
    #[serde(flatten)]
    pub ids: ProtocolIds,
    /// `yyyyMMddHHmmss`
    pub o_time: String,
    pub geo_grp_id: String,
    pub geo_p_id: String,
    pub evt_val: GeofenceEvent,
    pub gcd: GpsStatus,
    pub lat: String,
    pub lon: String,
    pub ang: String,
    pub spd: String,
    pub sum: String,
}

/// Log kinds, one collector endpoint and one retention window each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Gps,
    Power,
    Geofence,
}

impl LogKind {
    pub const ALL: [Self; 3] = [Self::Gps, Self::Power, Self::Geofence];

    /// Collector path for this kind.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Gps => "/api/logs/gps",
            Self::Power => "/api/logs/power",
            Self::Geofence => "/api/logs/geofence",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gps => write!(f, "gps"),
            Self::Power => write!(f, "power"),
            Self::Geofence => write!(f, "geofence"),
        }
    }
}

/// A record ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LogRecord {
    Gps(GpsLog),
    Power(PowerLog),
    Geofence(GeofenceLog),
}

impl LogRecord {
    #[must_use]
    pub const fn kind(&self) -> LogKind {
        match self {
            Self::Gps(_) => LogKind::Gps,
            Self::Power(_) => LogKind::Power,
            Self::Geofence(_) => LogKind::Geofence,
        }
    }

    #[must_use]
    pub fn mdn(&self) -> &str {
        match self {
            Self::Gps(log) => &log.mdn,
            Self::Power(log) => &log.mdn,
            Self::Geofence(log) => &log.mdn,
        }
    }

    /// JSON body posted to the collector.
    ///
    /// # Errors
    ///
    /// Returns [`telemetry::Error::InvalidFormat`] if serialization fails.
    pub fn to_json(&self) -> telemetry::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl From<GpsLog> for LogRecord {
    fn from(log: GpsLog) -> Self {
        Self::Gps(log)
    }
}

impl From<PowerLog> for LogRecord {
    fn from(log: PowerLog) -> Self {
        Self::Power(log)
    }
}

impl From<GeofenceLog> for LogRecord {
    fn from(log: GeofenceLog) -> Self {
        Self::Geofence(log)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    use super::*;

    #[test]
    fn power_wire_shape() {
        let log = PowerLog {
            mdn: "0101234".to_string(),
            ids: ProtocolIds::default(),
            on_time: "20250301100000".to_string(),
            off_time: String::new(),
            gcd: GpsStatus::Previous,
            lat: "37566500".to_string(),
            lon: "126978000".to_string(),
            ang: "0".to_string(),
            spd: "0".to_string(),
            sum: "1200".to_string(),
        };
        let value = serde_json::to_value(LogRecord::from(log)).unwrap();

        assert_eq!(
            value,
            json!({
                "mdn": "0101234", "tid": "A001", "mid": "6", "pv": "5", "did": "1",
                "onTime": "20250301100000", "offTime": "", "gcd": "P",
                "lat": "37566500", "lon": "126978000", "ang": "0", "spd": "0", "sum": "1200"
            })
        );
    }

    #[test]
    fn geofence_wire_names() {
        let log = GeofenceLog {
            mdn: "0101234".to_string(),
            ids: ProtocolIds::default(),
            o_time: "20250301100000".to_string(),
            geo_grp_id: "G1".to_string(),
            geo_p_id: "P7".to_string(),
            evt_val: GeofenceEvent::Exit,
            gcd: GpsStatus::Valid,
            lat: "0".to_string(),
            lon: "0".to_string(),
            ang: "0".to_string(),
            spd: "0".to_string(),
            sum: "0".to_string(),
        };
        let value = serde_json::to_value(&log).unwrap();

        assert_eq!(value["geoGrpId"], "G1");
        assert_eq!(value["geoPId"], "P7");
        assert_eq!(value["evtVal"], "2");
        assert_eq!(value["oTime"], "20250301100000");
    }

    #[test]
    fn event_codes() {
        assert_eq!(GeofenceEvent::try_from("1").unwrap(), GeofenceEvent::Enter);
        assert_eq!(GeofenceEvent::try_from("2").unwrap(), GeofenceEvent::Exit);
        assert!(matches!(GeofenceEvent::try_from("3"), Err(telemetry::Error::BadRequest(_))));
    }

    #[test]
    fn fix_profile_split() {
        let mut rng = StdRng::seed_from_u64(42);
        let profile = FixProfile::new(0.90, 0.08);
        let draws: Vec<GpsStatus> = (0..10_000).map(|_| profile.draw(&mut rng)).collect();
        let valid = draws.iter().filter(|s| **s == GpsStatus::Valid).count();
        let none = draws.iter().filter(|s| **s == GpsStatus::NoDevice).count();

        assert!((8_700..9_300).contains(&valid), "got {valid}");
        assert!((100..400).contains(&none), "got {none}");
        assert!((0..100).all(|_| FixProfile::always_valid().draw(&mut rng) == GpsStatus::Valid));
    }

    #[test]
    fn kind_paths() {
        assert_eq!(LogKind::Gps.path(), "/api/logs/gps");
        assert_eq!(LogKind::Power.path(), "/api/logs/power");
        assert_eq!(LogKind::Geofence.path(), "/api/logs/geofence");
        assert_eq!(LogKind::Geofence.to_string(), "geofence");
    }
}
