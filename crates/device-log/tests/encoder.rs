#![allow(missing_docs)]

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use device_log::{
    BATCH_SECONDS, BatchEncoder, EncoderConfig, FixProfile, GpsLog, GpsStatus, LogRecord,
    ProtocolIds, Reading, Sample,
};
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use route::RoutePoint;
use route::geo::distance_m;
use telemetry::ManualClock;

fn encoder(synthetic_fix: FixProfile) -> BatchEncoder {
    let start = Utc.with_ymd_and_hms(2025, 3, 1, 1, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start, chrono_tz::Asia::Seoul));
    let config = EncoderConfig {
        ids: ProtocolIds::default(),
        live_fix: FixProfile::always_valid(),
        synthetic_fix,
    };
    BatchEncoder::new(config, clock)
}

fn samples(count: usize) -> Vec<Sample> {
    let start = Utc.with_ymd_and_hms(2025, 3, 1, 1, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let step = i as f64;
            Sample {
                timestamp: start + Duration::seconds(i64::try_from(i).unwrap()),
                latitude: 0.000_013_7f64.mul_add(step, 37.566_512_3),
                longitude: 0.000_021_1f64.mul_add(step, 126.978_049_9),
                speed: 30.0,
                heading: 45.0,
                battery: 12.5,
                odometer: 2.5 * step,
            }
        })
        .collect()
}

#[test]
fn samples_survive_the_wire() {
    let mut rng = StdRng::seed_from_u64(11);
    let input = samples(45);
    let log = encoder(FixProfile::always_valid()).encode_samples("0101234", &input, &mut rng);

    let body = LogRecord::from(log).to_json().expect("should serialize");
    let decoded: GpsLog = serde_json::from_slice(&body).expect("should deserialize");

    assert_eq!(decoded.c_cnt, "45");
    assert_eq!(decoded.c_list.len(), 45);
    for (i, (entry, sample)) in decoded.c_list.iter().zip(&input).enumerate() {
        assert_eq!(entry.sec, i.to_string());
        #[allow(clippy::cast_possible_truncation)]
        let lat = (sample.latitude * 1e6).round() as i64;
        #[allow(clippy::cast_possible_truncation)]
        let lon = (sample.longitude * 1e6).round() as i64;
        assert_eq!(entry.lat, lat.to_string());
        assert_eq!(entry.lon, lon.to_string());
    }
}

#[test]
fn synthetic_batch_is_plausible() {
    let mut rng = StdRng::seed_from_u64(5);
    let from = Reading {
        position: RoutePoint::new(37.5665, 126.9780),
        speed: 0.0,
        heading: 0.0,
        odometer: 1_000.0,
    };
    let batch = encoder(FixProfile::always_valid()).synthetic_batch("0101234", from, &mut rng);

    assert_eq!(batch.log.c_list.len(), BATCH_SECONDS);
    assert_eq!(batch.log.c_cnt, "60");
    assert_eq!(batch.log.o_time, "202503011000");

    let mut last_sum = 1_000;
    for (sec, entry) in batch.log.c_list.iter().enumerate() {
        assert_eq!(entry.sec, sec.to_string());
        assert_eq!(entry.gcd, GpsStatus::Valid);
        let sum: i64 = entry.sum.parse().unwrap();
        assert!(sum >= last_sum);
        last_sum = sum;
        let bat: i64 = entry.bat.parse().unwrap();
        assert!((115..=145).contains(&bat));
    }

    assert!(batch.last.odometer >= from.odometer);
    // 60 steps of at most ~16 m
    assert!(distance_m(from.position, batch.last.position) < 60.0 * 16.0);
}

#[test]
fn no_device_batch_is_zeroed() {
    let mut rng = StdRng::seed_from_u64(5);
    let from = Reading {
        position: RoutePoint::new(37.5665, 126.9780),
        speed: 40.0,
        heading: 90.0,
        odometer: 777.0,
    };
    let batch = encoder(FixProfile::new(0.0, 0.0)).synthetic_batch("0101234", from, &mut rng);

    assert_eq!(batch.log.c_list.len(), BATCH_SECONDS);
    for entry in &batch.log.c_list {
        assert_eq!(entry.gcd, GpsStatus::NoDevice);
        assert_eq!(entry.lat, "0");
        assert_eq!(entry.lon, "0");
        assert_eq!(entry.ang, "0");
        assert_eq!(entry.spd, "0");
        assert_eq!(entry.sum, "777");
    }
    assert_eq!(batch.last, from);
}
