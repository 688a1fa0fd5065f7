//! Contracts for the hardware collaborators the flight logger drives.
//!
//! The bus-level drivers (BMI160 over I2C, MS5611, MB85RS2MTA FRAM and the
//! SD card over SPI) implement these traits elsewhere. The logger takes
//! exclusive ownership of one of each for the whole session.

use crate::pressure::{Calibration, Osr, RawConversion};
use crate::types::Vec3;
use core::fmt::Debug;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImuReading {
    /// m/s^2 (or g, depending on the configured range)
    pub acceleration: Vec3,
    /// deg/s
    pub angular_rate: Vec3,
}

pub trait Imu {
    type Error: Debug;

    fn init(&mut self) -> Result<(), Self::Error>;

    fn read_imu(&mut self) -> Result<ImuReading, Self::Error>;
}

pub trait Barometer {
    type Error: Debug;

    /// Resets the device and reads its PROM.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Calibration read during `init`.
    fn calibration(&self) -> &Calibration;

    /// Runs a pressure (D1) then a temperature (D2) conversion.
    fn read_raw(&mut self, temp_osr: Osr, pressure_osr: Osr)
        -> Result<RawConversion, Self::Error>;
}

/// Byte-addressed memory that survives power loss.
pub trait NonVolatileStore {
    type Error: Debug;

    fn init(&mut self) -> Result<(), Self::Error>;

    /// Size in bytes.
    fn capacity(&self) -> u32;

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error>;

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), Self::Error>;
}

/// Removable medium the flight is dumped to after landing.
///
/// Only one file is open at a time. Text goes through `core::fmt::Write`, so
/// the serializer does not care whether it writes to a card or to memory.
pub trait RemovableStorage {
    type Error: Debug;
    type File: core::fmt::Write;

    fn init(&mut self) -> Result<(), Self::Error>;

    fn file_exists(&mut self, name: &str) -> bool;

    /// Creates `name`, truncating any existing file.
    fn create_file(&mut self, name: &str) -> Result<Self::File, Self::Error>;

    fn close_file(&mut self, file: Self::File) -> Result<(), Self::Error>;
}
