//! The flight logger: owns the collaborators and runs the session.
//!
//! [`FlightSession`] decides, this module does the I/O. Every tick samples
//! the sensors, steps the session and carries out the returned action
//! against the store or the card.

use crate::config::LoggerConfig;
use crate::drivers::{Barometer, Imu, NonVolatileStore, RemovableStorage};
use crate::error::{DumpError, InitError};
use crate::log::{select_dump_name, write_header, LogBuffer, BENCH_FILE_NAME, MAX_LOG_LINE_LEN};
use crate::pressure::{altitude_from_pressure, compensate, mbar_to_pascal};
use crate::scheduler::{Clock, Pacer};
use crate::state_machine::{FlightAction, FlightSession, Transition};
use crate::storage::TelemetryStore;
use crate::types::{FlightPhase, Snapshot};
use core::fmt::Write;
use embassy_time::Duration;

pub struct FlightLogger<I, B, N, R>
where
    I: Imu,
    B: Barometer,
    N: NonVolatileStore,
    R: RemovableStorage,
{
    imu: I,
    barometer: B,
    store: TelemetryStore<N>,
    card: R,
    config: LoggerConfig,
    session: FlightSession,
}

impl<I, B, N, R> FlightLogger<I, B, N, R>
where
    I: Imu,
    B: Barometer,
    N: NonVolatileStore,
    R: RemovableStorage,
{
    pub fn new(imu: I, barometer: B, store: N, card: R, config: LoggerConfig) -> Self {
        Self {
            imu,
            barometer,
            store: TelemetryStore::new(store),
            card,
            session: FlightSession::new(&config),
            config,
        }
    }

    /// Brings up the collaborators in order and sizes the session against
    /// the store. Any failure is fatal and leaves the logger in Boot.
    pub fn init(&mut self) -> Result<(), InitError> {
        info!("Initializing flight logger");

        if let Err(e) = self.imu.init() {
            log::error!("IMU init failed: {:?}", e);
            return Err(InitError::Imu);
        }
        if let Err(e) = self.barometer.init() {
            log::error!("Barometer init failed: {:?}", e);
            return Err(InitError::Barometer);
        }
        let layout = match self.store.init() {
            Ok(layout) => layout,
            Err(e) => {
                log::error!("Store init failed: {:?}", e);
                return Err(InitError::Store);
            }
        };
        if let Err(e) = self.card.init() {
            log::error!("Card init failed: {:?}", e);
            return Err(InitError::Card);
        }

        if let Err(e) = self.session.start(layout) {
            error!("Startup failed: {}", e);
            return Err(e);
        }

        let s = &self.session;
        info!("Samples per second: {}", s.samples_per_second);
        info!("Active period: {} us", s.active_period.as_micros());
        info!(
            "Store capacity: {} bytes, {} bytes per record",
            layout.capacity(),
            s.stride
        );
        info!(
            "Max samples: {}, max active time: {} ms",
            s.max_samples,
            s.max_active_duration.as_millis()
        );
        Ok(())
    }

    /// Reads both sensors into a snapshot stamped with `now`.
    ///
    /// A sensor that fails keeps its last good values in the snapshot.
    pub fn sample(&mut self, now: Duration) -> Snapshot {
        let mut snapshot = self.session.current;
        snapshot.timestamp_s = now.as_micros() as f32 / 1_000_000.0;

        match self
            .barometer
            .read_raw(self.config.temperature_osr, self.config.pressure_osr)
        {
            Ok(raw) => {
                let out = compensate(raw, self.barometer.calibration());
                snapshot.temperature_c = out.temperature_c;
                snapshot.altitude_m = altitude_from_pressure(
                    mbar_to_pascal(out.pressure_mbar),
                    self.config.sea_level_pa,
                );
            }
            Err(e) => {
                self.session.sensor_faults += 1;
                log::warn!("Barometer read failed, holding last altitude: {:?}", e);
            }
        }

        match self.imu.read_imu() {
            Ok(reading) => {
                snapshot.acceleration = reading.acceleration;
                snapshot.angular_rate = reading.angular_rate;
            }
            Err(e) => {
                self.session.sensor_faults += 1;
                log::warn!("IMU read failed, holding last reading: {:?}", e);
            }
        }

        snapshot
    }

    /// One pass of the flight loop at `now` (time since the run started).
    pub fn tick(&mut self, now: Duration) -> Transition {
        let snapshot = self.sample(now);
        let mut transition = self.session.step(snapshot);

        match transition.action {
            FlightAction::None => {}
            FlightAction::Record { offset, snapshot } => {
                if let Err(e) = self.store.write_record(offset, &snapshot) {
                    log::error!("Store write at offset {} failed: {}", offset, e);
                    self.session.abandon_record();
                    transition.to = self.session.phase;
                }
            }
            FlightAction::Dump { sample_count } => {
                let card = &mut self.card;
                let name = select_dump_name(|n| card.file_exists(n));
                let success = match self.dump_to(&name, sample_count) {
                    Ok(lines) => {
                        info!("Dumped {} records to {}", lines, name.as_str());
                        true
                    }
                    Err(e) => {
                        error!("Dump to {} failed: {}", name.as_str(), e);
                        false
                    }
                };
                self.session.finish_dump(success);
                transition.to = self.session.phase;
            }
        }

        if transition.changed() {
            info!(
                "Phase change: {} -> {}",
                transition.from.name(),
                transition.to.name()
            );
        }
        transition
    }

    /// Writes the header and records `0..sample_count` to `name` on the
    /// card. The file is closed even when replaying fails part way.
    pub fn dump_to(&mut self, name: &str, sample_count: u32) -> Result<u32, DumpError> {
        let mut file = match self.card.create_file(name) {
            Ok(file) => file,
            Err(e) => {
                log::error!("Cannot create {}: {:?}", name, e);
                return Err(DumpError::Create);
            }
        };

        let replayed = replay(&mut self.store, &mut file, sample_count);
        let closed = self.card.close_file(file);

        let lines = replayed?;
        if let Err(e) = closed {
            log::error!("Cannot close {}: {:?}", name, e);
            return Err(DumpError::Close);
        }
        Ok(lines)
    }

    /// Runs the flight loop until the session reaches End or Error.
    pub fn run<C: Clock>(&mut self, clock: &mut C) -> FlightPhase {
        if self.session.phase == FlightPhase::Boot {
            error!("Flight loop started before init");
            return FlightPhase::Boot;
        }

        let epoch = clock.now();
        let mut pacer = Pacer::new();
        loop {
            let now = since(clock, epoch);
            let period = self.session.target_period();
            let Some(elapsed) = pacer.poll(now, period) else {
                clock.idle();
                continue;
            };

            if let Some(late) = Pacer::overrun(elapsed, period) {
                warn!("Loop overrun: tick is late by {} us", late.as_micros());
            }

            let transition = self.tick(now);
            if transition.to.is_terminal() {
                return transition.to;
            }
        }
    }

    /// Records unconditionally at the active rate for `run_time` (or until
    /// the store is full) and dumps the result to the bench file.
    pub fn run_bench<C: Clock>(&mut self, clock: &mut C, run_time: Duration) -> Result<u32, DumpError> {
        info!("Bench recording for {} ms", run_time.as_millis());

        let period = self.session.active_period;
        let epoch = clock.now();
        let mut pacer = Pacer::new();
        let mut count = 0;
        while count < self.session.max_samples {
            let now = since(clock, epoch);
            if now >= run_time {
                break;
            }
            if pacer.poll(now, period).is_none() {
                clock.idle();
                continue;
            }

            let snapshot = self.sample(now);
            self.session.current = snapshot;
            let offset = count * self.session.stride;
            if let Err(e) = self.store.write_record(offset, &snapshot) {
                log::error!("Store write at offset {} failed: {}", offset, e);
                break;
            }
            count += 1;
        }

        debug!("Bench recorded {} samples", count);
        self.session.sample_count = count;
        let result = self.dump_to(BENCH_FILE_NAME, count);
        self.session.finish_dump(result.is_ok());
        result
    }

    pub fn session(&self) -> &FlightSession {
        &self.session
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn store_mut(&mut self) -> &mut TelemetryStore<N> {
        &mut self.store
    }

    pub fn card(&self) -> &R {
        &self.card
    }

    pub fn card_mut(&mut self) -> &mut R {
        &mut self.card
    }

    pub fn imu_mut(&mut self) -> &mut I {
        &mut self.imu
    }

    pub fn barometer_mut(&mut self) -> &mut B {
        &mut self.barometer
    }
}

fn since<C: Clock>(clock: &mut C, epoch: Duration) -> Duration {
    clock
        .now()
        .checked_sub(epoch)
        .unwrap_or(Duration::from_ticks(0))
}

fn replay<S: NonVolatileStore, W: Write>(
    store: &mut TelemetryStore<S>,
    sink: &mut W,
    sample_count: u32,
) -> Result<u32, DumpError> {
    write_header(sink).map_err(|_| DumpError::Write)?;
    let mut line = LogBuffer::<MAX_LOG_LINE_LEN>::new();
    for index in 0..sample_count {
        let record = match store.read_record(index) {
            Ok(record) => record,
            Err(e) => {
                log::error!("Store read of record {} failed: {}", index, e);
                return Err(DumpError::Read { index });
            }
        };
        line.clear();
        line.write_snapshot(&record).map_err(|_| DumpError::Write)?;
        sink.write_str(line.as_str()).map_err(|_| DumpError::Write)?;
    }
    Ok(sample_count)
}
