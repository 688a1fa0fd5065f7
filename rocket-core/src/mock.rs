//! In-memory collaborators for tests and host simulation.
//!
//! Each mock can be told to fail its `init` or a number of subsequent
//! operations, which is how the fault paths of the logger are exercised.

use crate::drivers::{Barometer, Imu, ImuReading, NonVolatileStore, RemovableStorage};
use crate::pressure::{Calibration, Osr, RawConversion};
use crate::scheduler::Clock;
use embassy_time::Duration;
use std::collections::{BTreeMap, VecDeque};
use std::string::String;
use std::vec::Vec;

/// Raw temperature conversion of the datasheet example (20.07 C).
pub const DATASHEET_D2: u32 = 8_569_150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    InitFailed,
    Bus,
    OutOfRange,
}

/// Raw conversions that compensate to the pressure at `altitude_m`.
///
/// Temperature is pinned to the datasheet's D2, which stays above 20 C so
/// the second-order terms are zero and the first-order formula inverts
/// exactly. The result is within one pascal of the requested pressure.
pub fn raw_for_altitude(altitude_m: f32, sea_level_pa: f32, cal: &Calibration) -> RawConversion {
    let ratio = 1.0 - altitude_m as f64 / 44_330.0;
    let pressure_pa = sea_level_pa as f64 * ratio.max(0.0).powf(1.0 / 0.190_294);
    raw_for_pressure(pressure_pa.round() as i64, cal)
}

/// Raw conversions that compensate to exactly `pressure_pa`.
pub fn raw_for_pressure(pressure_pa: i64, cal: &Calibration) -> RawConversion {
    let d2 = DATASHEET_D2;
    let d_t = d2 as i64 - cal.coefficient(5);
    let off = cal.coefficient(2) + cal.coefficient(4) * d_t / 128;
    let sens = cal.coefficient(1) + cal.coefficient(3) * d_t / 256;

    // Aim at the middle of the bucket that truncates to `pressure_pa`.
    let target = (pressure_pa * 32_768 + off + 16_384) as i128 * 2_097_152;
    let d1 = (target + sens as i128 - 1) / sens as i128;
    RawConversion {
        d1: d1.clamp(0, u32::MAX as i128) as u32,
        d2,
    }
}

/// IMU returning queued readings, then repeating the last one.
#[derive(Debug, Default)]
pub struct MockImu {
    readings: VecDeque<ImuReading>,
    last: ImuReading,
    pub fail_init: bool,
    failing_reads: u32,
    pub reads: u32,
}

impl MockImu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reading(&mut self, reading: ImuReading) {
        self.readings.clear();
        self.last = reading;
    }

    pub fn push_readings<T: IntoIterator<Item = ImuReading>>(&mut self, readings: T) {
        self.readings.extend(readings);
    }

    /// The next `count` reads fail.
    pub fn fail_reads(&mut self, count: u32) {
        self.failing_reads = count;
    }
}

impl Imu for MockImu {
    type Error = MockError;

    fn init(&mut self) -> Result<(), MockError> {
        if self.fail_init {
            return Err(MockError::InitFailed);
        }
        Ok(())
    }

    fn read_imu(&mut self) -> Result<ImuReading, MockError> {
        self.reads += 1;
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(MockError::Bus);
        }
        if let Some(reading) = self.readings.pop_front() {
            self.last = reading;
        }
        Ok(self.last)
    }
}

/// Barometer flying through queued altitudes, then holding the last one.
#[derive(Debug)]
pub struct MockBarometer {
    calibration: Calibration,
    sea_level_pa: f32,
    altitudes: VecDeque<f32>,
    last: f32,
    pub fail_init: bool,
    failing_reads: u32,
    /// Oversampling ratios of the last conversion.
    pub last_osr: Option<(Osr, Osr)>,
}

impl MockBarometer {
    pub fn new(sea_level_pa: f32) -> Self {
        Self {
            calibration: Calibration::datasheet_example(),
            sea_level_pa,
            altitudes: VecDeque::new(),
            last: 0.0,
            fail_init: false,
            failing_reads: 0,
            last_osr: None,
        }
    }

    pub fn set_altitude(&mut self, altitude_m: f32) {
        self.altitudes.clear();
        self.last = altitude_m;
    }

    pub fn push_altitudes<T: IntoIterator<Item = f32>>(&mut self, altitudes: T) {
        self.altitudes.extend(altitudes);
    }

    pub fn fail_reads(&mut self, count: u32) {
        self.failing_reads = count;
    }
}

impl Barometer for MockBarometer {
    type Error = MockError;

    fn init(&mut self) -> Result<(), MockError> {
        if self.fail_init {
            return Err(MockError::InitFailed);
        }
        Ok(())
    }

    fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    fn read_raw(&mut self, temp_osr: Osr, pressure_osr: Osr) -> Result<RawConversion, MockError> {
        self.last_osr = Some((temp_osr, pressure_osr));
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(MockError::Bus);
        }
        if let Some(altitude) = self.altitudes.pop_front() {
            self.last = altitude;
        }
        Ok(raw_for_altitude(self.last, self.sea_level_pa, &self.calibration))
    }
}

/// Byte-addressed RAM standing in for the FRAM.
#[derive(Debug)]
pub struct RamStore {
    bytes: Vec<u8>,
    pub fail_init: bool,
    pub fail_writes: bool,
    pub fail_reads: bool,
    pub writes: u32,
}

impl RamStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: std::vec![0xFF; capacity],
            fail_init: false,
            fail_writes: false,
            fail_reads: false,
            writes: 0,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn range(&self, offset: u32, len: usize) -> Result<core::ops::Range<usize>, MockError> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(MockError::OutOfRange)?;
        if end > self.bytes.len() {
            return Err(MockError::OutOfRange);
        }
        Ok(start..end)
    }
}

impl NonVolatileStore for RamStore {
    type Error = MockError;

    fn init(&mut self) -> Result<(), MockError> {
        if self.fail_init {
            return Err(MockError::InitFailed);
        }
        Ok(())
    }

    fn capacity(&self) -> u32 {
        self.bytes.len() as u32
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), MockError> {
        if self.fail_writes {
            return Err(MockError::Bus);
        }
        let range = self.range(offset, bytes.len())?;
        self.bytes[range].copy_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), MockError> {
        if self.fail_reads {
            return Err(MockError::Bus);
        }
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }
}

/// An open file of a [`MemoryCard`].
#[derive(Debug)]
pub struct MemoryFile {
    name: String,
    contents: String,
    fail_writes: bool,
}

impl core::fmt::Write for MemoryFile {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        if self.fail_writes {
            return Err(core::fmt::Error);
        }
        self.contents.push_str(s);
        Ok(())
    }
}

/// A removable medium keeping closed files in memory.
#[derive(Debug, Default)]
pub struct MemoryCard {
    files: BTreeMap<String, String>,
    pub fail_init: bool,
    pub fail_create: bool,
    pub fail_writes: bool,
    pub fail_close: bool,
}

impl MemoryCard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file as if it was already on the card.
    pub fn insert(&mut self, name: &str, contents: &str) {
        self.files.insert(name.into(), contents.into());
    }

    pub fn file(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }
}

impl RemovableStorage for MemoryCard {
    type Error = MockError;
    type File = MemoryFile;

    fn init(&mut self) -> Result<(), MockError> {
        if self.fail_init {
            return Err(MockError::InitFailed);
        }
        Ok(())
    }

    fn file_exists(&mut self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    fn create_file(&mut self, name: &str) -> Result<MemoryFile, MockError> {
        if self.fail_create {
            return Err(MockError::Bus);
        }
        Ok(MemoryFile {
            name: name.into(),
            contents: String::new(),
            fail_writes: self.fail_writes,
        })
    }

    fn close_file(&mut self, file: MemoryFile) -> Result<(), MockError> {
        // Whatever was written stays on the card even if the close fails.
        self.files.insert(file.name, file.contents);
        if self.fail_close {
            return Err(MockError::Bus);
        }
        Ok(())
    }
}

/// Clock that only moves when the loop idles.
#[derive(Debug, Clone, Copy)]
pub struct ManualClock {
    pub now: Duration,
    pub step: Duration,
}

impl ManualClock {
    pub fn new(step: Duration) -> Self {
        Self {
            now: Duration::from_ticks(0),
            step,
        }
    }
}

impl Clock for ManualClock {
    fn now(&mut self) -> Duration {
        self.now
    }

    fn idle(&mut self) {
        self.now += self.step;
    }
}
