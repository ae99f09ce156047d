//! # Emulator
//!
//! Simulates one GPS-tracked vehicle: a background loop advances the
//! vehicle along a planned route once per tick and hands batches of samples
//! to the delivery store.

mod config;
mod manager;
mod sampler;
mod state;

pub use crate::config::{EmulatorConfig, secs_f64};
pub use crate::manager::Emulator;
pub use crate::sampler::{Cadence, Sampler, Tick};
pub use crate::state::{DeviceProfile, MAX_SPEED_KMH, Phase, Status, VehicleState, smooth_heading};
