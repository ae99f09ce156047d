//! # Telemetry Core
//!
//! Error taxonomy, host provider traits and configuration helpers shared by
//! the emulator crates.

mod env;
mod error;
mod provider;

pub use crate::env::*;
pub use crate::error::*;
pub use crate::provider::*;
