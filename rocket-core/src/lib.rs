// lib.rs
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[macro_use]
mod macros;

pub mod config;
pub mod drivers;
pub mod error;
pub mod filter;
pub mod log;
pub mod logger;
pub mod pressure;
pub mod scheduler;
pub mod state_machine;
pub mod storage;
pub mod types;

#[cfg(any(test, feature = "std"))]
pub mod mock;

pub use config::{DetectionThresholds, LoggerConfig};
pub use drivers::{Barometer, Imu, ImuReading, NonVolatileStore, RemovableStorage};
pub use error::{DumpError, InitError, RecordError, StoreError};
pub use filter::LandingFilter;
pub use logger::FlightLogger;
pub use pressure::{Calibration, Compensated, Osr, RawConversion};
pub use scheduler::{Clock, Pacer};
pub use state_machine::*;
pub use storage::{StoreLayout, TelemetryStore, RECORD_STRIDE};
pub use types::*;
