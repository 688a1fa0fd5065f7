// types.rs

/// Three-axis vector as produced by the IMU (x, y, z).
pub type Vec3 = [f32; 3];

/// Euclidean length of a three-axis vector.
pub fn length(v: &Vec3) -> f32 {
    libm::sqrtf(v[0] * v[0] + v[1] * v[1] + v[2] * v[2])
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlightPhase {
    Boot = 0,   // Collaborators not yet initialized
    Idle = 1,   // On the pad, waiting for liftoff
    Active = 2, // Recording to the store
    Dump = 3,   // Copying the store to the card
    End = 4,    // Flight is over
    Error = 5,  // Dump could not create its file
}

impl FlightPhase {
    pub const fn name(self) -> &'static str {
        match self {
            FlightPhase::Boot => "Boot",
            FlightPhase::Idle => "Idle",
            FlightPhase::Active => "Active",
            FlightPhase::Dump => "Dump",
            FlightPhase::End => "End",
            FlightPhase::Error => "Error",
        }
    }

    /// Phases the run loop never leaves.
    pub const fn is_terminal(self) -> bool {
        matches!(self, FlightPhase::End | FlightPhase::Error)
    }
}

/// One telemetry record.
///
/// Every field is an `f32`, so the postcard encoding has a constant size
/// (see [`crate::storage::RECORD_STRIDE`]). Adding a field changes the
/// stride and with it the store capacity math.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Snapshot {
    /// Seconds since the session started.
    pub timestamp_s: f32,
    pub altitude_m: f32,
    pub temperature_c: f32,
    pub acceleration: Vec3,
    /// deg/s
    pub angular_rate: Vec3,
}

impl Snapshot {
    pub const fn new() -> Self {
        Self {
            timestamp_s: 0.0,
            altitude_m: 0.0,
            temperature_c: 0.0,
            acceleration: [0.0; 3],
            angular_rate: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_single_axis() {
        assert_eq!(length(&[50.0, 0.0, 0.0]), 50.0);
    }

    #[test]
    fn test_length_three_axes() {
        assert!((length(&[2.0, 3.0, 6.0]) - 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(FlightPhase::End.is_terminal());
        assert!(FlightPhase::Error.is_terminal());
        assert!(!FlightPhase::Dump.is_terminal());
        assert!(!FlightPhase::Boot.is_terminal());
    }
}
