//! Build-time configuration of the logger.

use crate::pressure::{Osr, SEA_LEVEL_PRESSURE_PA};
use embassy_time::Duration;

pub const DEFAULT_SAMPLES_PER_SECOND: u32 = 100;

/// Tick period while waiting on the pad.
pub const IDLE_PERIOD: Duration = Duration::from_hz(40);

/// Tick period once the flight has been dumped.
pub const END_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct LoggerConfig {
    /// Records written per second while Active.
    pub samples_per_second: u32,
    pub sea_level_pa: f32,
    pub idle_period: Duration,
    pub end_period: Duration,
    pub temperature_osr: Osr,
    pub pressure_osr: Osr,
    pub thresholds: DetectionThresholds,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            samples_per_second: DEFAULT_SAMPLES_PER_SECOND,
            sea_level_pa: SEA_LEVEL_PRESSURE_PA,
            idle_period: IDLE_PERIOD,
            end_period: END_PERIOD,
            temperature_osr: Osr::Osr4096,
            pressure_osr: Osr::Osr4096,
            thresholds: DetectionThresholds::default(),
        }
    }
}

/// Guards of the launch and landing transitions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionThresholds {
    /// Minimum climb between two idle ticks (m).
    pub launch_climb_m: f32,
    /// Acceleration on the body y axis that must be exceeded at launch.
    pub launch_accel_y: f32,
    /// Landing is only considered this close to the liftoff altitude (m).
    pub landing_radius_m: f32,
    /// Total acceleration at or below which the vehicle is unpowered.
    pub landing_accel: f32,
    /// Maximum distance between altitude and its rolling average (m).
    pub landing_settle_m: f32,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            launch_climb_m: 0.2,
            launch_accel_y: 10.0,
            landing_radius_m: 10.0,
            landing_accel: 10.0,
            landing_settle_m: 0.3,
        }
    }
}
