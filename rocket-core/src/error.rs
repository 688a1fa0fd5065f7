//! Error types for the flight logger.

use core::fmt;

/// Startup failures. All of them are fatal: there is no retry and no
/// degraded mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// The barometer did not answer or its PROM could not be read
    Barometer,
    /// The IMU did not answer
    Imu,
    /// The non-volatile store did not answer
    Store,
    /// The removable medium could not be mounted
    Card,
    /// Samples per second must be non-zero
    InvalidSampleRate,
    /// The store cannot hold a single record
    StoreTooSmall,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::Barometer => write!(f, "failed to initialize barometer"),
            InitError::Imu => write!(f, "failed to initialize IMU"),
            InitError::Store => write!(f, "failed to initialize non-volatile store"),
            InitError::Card => write!(f, "failed to initialize removable medium"),
            InitError::InvalidSampleRate => write!(f, "samples per second must be non-zero"),
            InitError::StoreTooSmall => write!(f, "store is smaller than one record"),
        }
    }
}

/// Record encode/decode failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    Encode,
    Decode,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Encode => write!(f, "record does not fit its stride"),
            RecordError::Decode => write!(f, "record bytes are malformed"),
        }
    }
}

/// Telemetry store access failures, generic over the device error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError<E> {
    /// The access would run past the end of the store
    OutOfBounds { offset: u32 },
    Record(RecordError),
    Device(E),
}

impl<E> From<RecordError> for StoreError<E> {
    fn from(e: RecordError) -> Self {
        StoreError::Record(e)
    }
}

impl<E: fmt::Debug> fmt::Display for StoreError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::OutOfBounds { offset } => {
                write!(f, "record at offset {} exceeds store capacity", offset)
            }
            StoreError::Record(e) => write!(f, "{}", e),
            StoreError::Device(e) => write!(f, "store device error: {:?}", e),
        }
    }
}

/// Failures while replaying the store to the removable medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DumpError {
    /// The dump file could not be created
    Create,
    /// A line could not be written to the dump file
    Write,
    /// A record could not be read back from the store
    Read { index: u32 },
    /// The dump file could not be closed
    Close,
}

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpError::Create => write!(f, "failed to create dump file"),
            DumpError::Write => write!(f, "failed to write dump file"),
            DumpError::Read { index } => write!(f, "failed to read record {}", index),
            DumpError::Close => write!(f, "failed to close dump file"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InitError {}

#[cfg(feature = "std")]
impl std::error::Error for DumpError {}
