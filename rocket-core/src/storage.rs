//! Telemetry store addressing.
//!
//! Records are laid out back to back from offset 0 with a constant stride.
//! The layout computes how many fit; [`TelemetryStore`] bounds-checks every
//! access so the device is never written past its capacity.

use crate::drivers::NonVolatileStore;
use crate::error::{RecordError, StoreError};
use crate::types::Snapshot;
use embassy_time::Duration;

/// Encoded size of one [`Snapshot`]: nine little-endian `f32`.
pub const RECORD_STRIDE: u32 = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoreLayout {
    capacity: u32,
    stride: u32,
    max_samples: u32,
}

impl StoreLayout {
    /// `stride` must be non-zero.
    pub const fn new(capacity: u32, stride: u32) -> Self {
        Self {
            capacity,
            stride,
            max_samples: capacity / stride,
        }
    }

    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    pub const fn stride(&self) -> u32 {
        self.stride
    }

    /// How many whole records fit in the store.
    pub const fn max_samples(&self) -> u32 {
        self.max_samples
    }

    /// Byte offset of record `index`, or `None` if it does not fit.
    pub const fn offset_of(&self, index: u32) -> Option<u32> {
        if index < self.max_samples {
            Some(index * self.stride)
        } else {
            None
        }
    }

    /// How long the store lasts when one record is written every `interval`.
    pub fn max_active_duration(&self, interval: Duration) -> Duration {
        Duration::from_ticks(interval.as_ticks() * self.max_samples as u64)
    }

    fn fits(&self, offset: u32) -> bool {
        offset
            .checked_add(self.stride)
            .is_some_and(|end| end <= self.capacity)
    }
}

pub fn encode_record(
    snapshot: &Snapshot,
    buf: &mut [u8; RECORD_STRIDE as usize],
) -> Result<(), RecordError> {
    let used = postcard::to_slice(snapshot, buf).map_err(|_| RecordError::Encode)?;
    if used.len() != RECORD_STRIDE as usize {
        return Err(RecordError::Encode);
    }
    Ok(())
}

pub fn decode_record(buf: &[u8; RECORD_STRIDE as usize]) -> Result<Snapshot, RecordError> {
    postcard::from_bytes(buf).map_err(|_| RecordError::Decode)
}

/// A non-volatile device viewed as an array of fixed-stride records.
pub struct TelemetryStore<S: NonVolatileStore> {
    device: S,
    layout: StoreLayout,
}

impl<S: NonVolatileStore> TelemetryStore<S> {
    /// Wraps an uninitialized device. The layout is fixed by [`Self::init`].
    pub fn new(device: S) -> Self {
        Self {
            device,
            layout: StoreLayout::new(0, RECORD_STRIDE),
        }
    }

    /// Initializes the device and derives the layout from its capacity.
    pub fn init(&mut self) -> Result<StoreLayout, S::Error> {
        self.device.init()?;
        self.layout = StoreLayout::new(self.device.capacity(), RECORD_STRIDE);
        Ok(self.layout)
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn write_record(
        &mut self,
        offset: u32,
        snapshot: &Snapshot,
    ) -> Result<(), StoreError<S::Error>> {
        if !self.layout.fits(offset) {
            return Err(StoreError::OutOfBounds { offset });
        }
        let mut buf = [0u8; RECORD_STRIDE as usize];
        encode_record(snapshot, &mut buf)?;
        self.device.write(offset, &buf).map_err(StoreError::Device)
    }

    pub fn read_record(&mut self, index: u32) -> Result<Snapshot, StoreError<S::Error>> {
        let offset = self
            .layout
            .offset_of(index)
            .ok_or(StoreError::OutOfBounds {
                offset: index.saturating_mul(self.layout.stride),
            })?;
        let mut buf = [0u8; RECORD_STRIDE as usize];
        self.device
            .read(offset, &mut buf)
            .map_err(StoreError::Device)?;
        Ok(decode_record(&buf)?)
    }

    pub fn device(&self) -> &S {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut S {
        &mut self.device
    }
}
