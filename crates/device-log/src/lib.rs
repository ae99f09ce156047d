//! Device log records and batch encoding.
//!
//! Records mirror the collector's wire format field for field; the
//! [`BatchEncoder`] owns every scaling and status rule so the rest of the
//! emulator only deals in degrees, meters and km/h.

mod config;
mod encoder;
mod model;

pub use crate::config::EncoderConfig;
pub use crate::encoder::{BATCH_SECONDS, BatchEncoder, MAX_ODOMETER_M, SyntheticBatch};
pub use crate::model::*;
