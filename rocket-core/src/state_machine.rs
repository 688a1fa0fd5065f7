use crate::config::{DetectionThresholds, LoggerConfig};
use crate::error::InitError;
use crate::filter::LandingFilter;
use crate::storage::StoreLayout;
use crate::types::{length, FlightPhase, Snapshot};
use embassy_time::Duration;

/// What the executor has to do after a call to [`FlightSession::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlightAction {
    None,
    /// Write `snapshot` to the store at `offset`.
    Record { offset: u32, snapshot: Snapshot },
    /// Replay records `0..sample_count` to the card.
    Dump { sample_count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    pub from: FlightPhase,
    pub to: FlightPhase,
    pub action: FlightAction,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// All state of one power cycle.
///
/// `step` is the whole flight logic: it decides transitions and the action
/// for a tick but performs no I/O. The executor reports the outcome of the
/// I/O back through `abandon_record` and `finish_dump`.
pub struct FlightSession {
    /// The current operational phase.
    pub phase: FlightPhase,
    /// Snapshot of the tick being processed.
    pub current: Snapshot,
    /// Snapshot of the previous tick.
    pub previous: Snapshot,
    /// Set until the first snapshot has seeded `previous`.
    pub first_tick: bool,
    /// Records written this flight.
    pub sample_count: u32,
    pub samples_per_second: u32,
    /// Tick period while Active.
    pub active_period: Duration,
    pub idle_period: Duration,
    pub end_period: Duration,
    /// Store capacity in records.
    pub max_samples: u32,
    /// How long the store lasts at the active rate.
    pub max_active_duration: Duration,
    /// Altitude captured at the Idle -> Active transition.
    pub liftoff_altitude: f32,
    /// Byte offset of the next record.
    pub write_offset: u32,
    /// Byte size of one record.
    pub stride: u32,
    pub landing_filter: LandingFilter,
    pub thresholds: DetectionThresholds,
    /// Sensor reads that failed and were replaced by the last good value.
    pub sensor_faults: u32,
}

impl FlightSession {
    /// Constructs a session in the Boot phase. It does nothing until
    /// [`Self::start`] has sized it against the store.
    pub fn new(config: &LoggerConfig) -> Self {
        Self {
            phase: FlightPhase::Boot,
            current: Snapshot::new(),
            previous: Snapshot::new(),
            first_tick: true,
            sample_count: 0,
            samples_per_second: config.samples_per_second,
            active_period: config.idle_period,
            idle_period: config.idle_period,
            end_period: config.end_period,
            max_samples: 0,
            max_active_duration: Duration::from_ticks(0),
            liftoff_altitude: 0.0,
            write_offset: 0,
            stride: 0,
            landing_filter: LandingFilter::new(),
            thresholds: config.thresholds,
            sensor_faults: 0,
        }
    }

    /// Derives the capacity limits from `layout` and starts waiting for launch.
    pub fn start(&mut self, layout: StoreLayout) -> Result<(), InitError> {
        // Faster than the tick rate would give a zero period.
        let sps = self.samples_per_second as u64;
        if sps == 0 || sps > embassy_time::TICK_HZ {
            return Err(InitError::InvalidSampleRate);
        }
        if layout.max_samples() == 0 {
            return Err(InitError::StoreTooSmall);
        }

        self.active_period = Duration::from_hz(sps);
        self.stride = layout.stride();
        self.max_samples = layout.max_samples();
        self.max_active_duration = layout.max_active_duration(self.active_period);
        self.phase = FlightPhase::Idle;
        Ok(())
    }

    /// Tick period for the current phase.
    pub fn target_period(&self) -> Duration {
        match self.phase {
            FlightPhase::Boot | FlightPhase::Idle => self.idle_period,
            FlightPhase::Active | FlightPhase::Dump => self.active_period,
            FlightPhase::End | FlightPhase::Error => self.end_period,
        }
    }

    /// Advances the state machine by one tick with a fresh snapshot.
    pub fn step(&mut self, snapshot: Snapshot) -> Transition {
        self.current = snapshot;

        // Avoid a spurious climb on the first tick after a cold start.
        if self.first_tick {
            self.previous = self.current;
            self.first_tick = false;
        }

        let from = self.phase;
        let action = match self.phase {
            FlightPhase::Boot | FlightPhase::End | FlightPhase::Error => FlightAction::None,
            FlightPhase::Idle => {
                if self.launch_detected() {
                    self.write_offset = 0;
                    self.liftoff_altitude = self.current.altitude_m;
                    self.phase = FlightPhase::Active;
                }
                FlightAction::None
            }
            FlightPhase::Active => {
                let offset = self.write_offset;
                self.write_offset += self.stride;
                self.sample_count += 1;

                // Running out of space ends the flight regardless of physics.
                if self.sample_count >= self.max_samples || self.landing_detected() {
                    self.phase = FlightPhase::Dump;
                }
                FlightAction::Record {
                    offset,
                    snapshot: self.current,
                }
            }
            FlightPhase::Dump => FlightAction::Dump {
                sample_count: self.sample_count,
            },
        };

        self.previous = self.current;

        Transition {
            from,
            to: self.phase,
            action,
        }
    }

    /// The record of the last `Record` action never reached the store.
    /// Recording stops and the flight is dumped as far as it got.
    pub fn abandon_record(&mut self) {
        self.sample_count = self.sample_count.saturating_sub(1);
        self.write_offset = self.write_offset.saturating_sub(self.stride);
        self.phase = FlightPhase::Dump;
    }

    /// Reports the outcome of the last `Dump` action.
    pub fn finish_dump(&mut self, success: bool) {
        self.phase = if success {
            FlightPhase::End
        } else {
            FlightPhase::Error
        };
    }

    fn launch_detected(&self) -> bool {
        let climb = self.current.altitude_m - self.previous.altitude_m;
        climb >= self.thresholds.launch_climb_m
            && self.current.acceleration[1] > self.thresholds.launch_accel_y
    }

    /// Landed means: near the liftoff altitude, unpowered, and altitude
    /// sitting on its rolling average. The filter is only fed near the ground.
    fn landing_detected(&mut self) -> bool {
        let altitude = self.current.altitude_m;
        let lift_delta = libm::fabsf(self.liftoff_altitude - altitude);
        if lift_delta > self.thresholds.landing_radius_m {
            return false;
        }

        let accel = length(&self.current.acceleration);
        let average = self.landing_filter.process_entry(altitude);
        accel <= self.thresholds.landing_accel
            && libm::fabsf(average - altitude) < self.thresholds.landing_settle_m
    }
}

#[cfg(test)]
mod tests;
