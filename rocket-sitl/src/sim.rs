//! Synthetic flight and the simulated sensors that observe it.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, NormalError};
use rocket_core::mock::raw_for_altitude;
use rocket_core::{Barometer, Calibration, Clock, Imu, ImuReading, Osr, RawConversion};
use embassy_time::Duration;
use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

pub const GRAVITY: f32 = 9.81;

/// Vertical flight: wait on the pad, burn, coast to apogee, descend under
/// a parachute at constant speed, then sit on the pad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightProfile {
    pub pad_altitude: f32,
    pub apogee_agl: f32,
    /// Time on the pad before ignition (s).
    pub ignition_s: f32,
    /// Net upward acceleration while the motor burns (m/s^2).
    pub burn_accel: f32,
    /// Parachute descent rate (m/s).
    pub descent_rate: f32,
}

/// Where the vehicle is and what an accelerometer would read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightSample {
    pub altitude: f32,
    /// Specific force along the body y axis (m/s^2).
    pub specific_force: f32,
}

impl FlightProfile {
    pub fn new(pad_altitude: f32, apogee_agl: f32) -> Self {
        Self {
            pad_altitude,
            apogee_agl: apogee_agl.max(1.0),
            ignition_s: 2.0,
            burn_accel: 50.0,
            descent_rate: 8.0,
        }
    }

    /// Burn time that puts apogee at `apogee_agl`.
    pub fn burn_time(&self) -> f32 {
        let a = self.burn_accel;
        (2.0 * self.apogee_agl / (a * (1.0 + a / GRAVITY))).sqrt()
    }

    pub fn apogee_time(&self) -> f32 {
        let tb = self.burn_time();
        self.ignition_s + tb + self.burn_accel * tb / GRAVITY
    }

    pub fn landing_time(&self) -> f32 {
        self.apogee_time() + self.apogee_agl / self.descent_rate
    }

    pub fn at(&self, t: f32) -> FlightSample {
        let pad = self.pad_altitude;
        let tb = self.burn_time();
        let v_burnout = self.burn_accel * tb;
        let h_burnout = 0.5 * self.burn_accel * tb * tb;

        let (agl, specific_force) = if t < self.ignition_s || t >= self.landing_time() {
            (0.0, GRAVITY)
        } else if t < self.ignition_s + tb {
            let tau = t - self.ignition_s;
            (0.5 * self.burn_accel * tau * tau, self.burn_accel + GRAVITY)
        } else if t < self.apogee_time() {
            let tau = t - self.ignition_s - tb;
            (h_burnout + v_burnout * tau - 0.5 * GRAVITY * tau * tau, 0.0)
        } else {
            let tau = t - self.apogee_time();
            (self.apogee_agl - self.descent_rate * tau, GRAVITY)
        };

        FlightSample {
            altitude: pad + agl.max(0.0),
            specific_force,
        }
    }
}

/// Virtual time shared by the loop and the sensors.
///
/// Idling advances time by a fixed step, so a flight runs as fast as the
/// host can tick it.
#[derive(Debug, Clone)]
pub struct SimClock {
    now: Rc<Cell<Duration>>,
    step: Duration,
}

impl SimClock {
    pub fn new(step: Duration) -> Self {
        Self {
            now: Rc::new(Cell::new(Duration::from_ticks(0))),
            step,
        }
    }

    pub fn seconds(&self) -> f32 {
        self.now.get().as_micros() as f32 / 1_000_000.0
    }
}

impl Clock for SimClock {
    fn now(&mut self) -> Duration {
        self.now.get()
    }

    fn idle(&mut self) {
        self.now.set(self.now.get() + self.step);
    }
}

/// Additive gaussian noise, or none when the deviation is zero.
struct Noise {
    rng: StdRng,
    normal: Option<Normal<f32>>,
}

impl Noise {
    fn new(std_dev: f32, seed: u64) -> Result<Self, NormalError> {
        let normal = if std_dev > 0.0 {
            Some(Normal::new(0.0, std_dev)?)
        } else {
            None
        };
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            normal,
        })
    }

    fn sample(&mut self) -> f32 {
        match &self.normal {
            Some(normal) => normal.sample(&mut self.rng),
            None => 0.0,
        }
    }
}

pub struct SimImu {
    profile: FlightProfile,
    clock: SimClock,
    noise: Noise,
}

impl SimImu {
    pub fn new(
        profile: FlightProfile,
        clock: SimClock,
        accel_noise: f32,
        seed: u64,
    ) -> Result<Self, NormalError> {
        Ok(Self {
            profile,
            clock,
            noise: Noise::new(accel_noise, seed)?,
        })
    }
}

impl Imu for SimImu {
    type Error = Infallible;

    fn init(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn read_imu(&mut self) -> Result<ImuReading, Infallible> {
        let sample = self.profile.at(self.clock.seconds());
        let n = &mut self.noise;
        Ok(ImuReading {
            acceleration: [n.sample(), sample.specific_force + n.sample(), n.sample()],
            angular_rate: [n.sample(), n.sample(), n.sample()],
        })
    }
}

pub struct SimBarometer {
    profile: FlightProfile,
    clock: SimClock,
    sea_level_pa: f32,
    calibration: Calibration,
    noise: Noise,
}

impl SimBarometer {
    pub fn new(
        profile: FlightProfile,
        clock: SimClock,
        sea_level_pa: f32,
        altitude_noise: f32,
        seed: u64,
    ) -> Result<Self, NormalError> {
        Ok(Self {
            profile,
            clock,
            sea_level_pa,
            calibration: Calibration::datasheet_example(),
            noise: Noise::new(altitude_noise, seed)?,
        })
    }
}

impl Barometer for SimBarometer {
    type Error = Infallible;

    fn init(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    fn read_raw(&mut self, _temp_osr: Osr, _pressure_osr: Osr) -> Result<RawConversion, Infallible> {
        let altitude = self.profile.at(self.clock.seconds()).altitude + self.noise.sample();
        Ok(raw_for_altitude(altitude, self.sea_level_pa, &self.calibration))
    }
}
