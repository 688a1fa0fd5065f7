//! Barometric pressure model for the MS5611.
//!
//! Turns the sensor's raw 24-bit conversions into temperature-compensated
//! pressure using the datasheet's second-order algorithm, and pressure into
//! altitude with the standard barometric formula (good up to ~9000 m).
//!
//! All fixed-point intermediates are `i64` with truncating division. The
//! `C1 * dT`-style products overflow 32 bits for in-range inputs.

/// Reference sea-level pressure used for altitude. Not calibrated per flight.
pub const SEA_LEVEL_PRESSURE_PA: f32 = 101_500.0;

const DT_MIN: i64 = -16_776_960;
const DT_MAX: i64 = 16_777_216;
const OFF_MIN: i64 = -8_589_672_450;
const OFF_MAX: i64 = 12_884_705_280;
const SENS_MIN: i64 = -4_294_836_225;
const SENS_MAX: i64 = 6_442_352_640;

/// The ADC produces 24-bit results; anything above is bus noise.
const ADC_MASK: u32 = 0x00FF_FFFF;

/// Oversampling ratio requested from the barometer for one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Osr {
    Osr256,
    Osr512,
    Osr1024,
    Osr2048,
    Osr4096,
}

/// Factory calibration coefficients, stored pre-scaled.
///
/// C1, C2 and C5 are multiplied by 2^15, 2^16 and 2^8 when the PROM words
/// are read. The only constructor applies that scaling, so a `Calibration`
/// can never be scaled twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    coefficients: [i64; 7],
}

impl Calibration {
    /// Builds the calibration from the seven raw PROM words (word 0 is the
    /// factory reserved word, words 1..=6 are C1..C6).
    pub const fn from_prom(words: [u16; 7]) -> Self {
        Self {
            coefficients: [
                words[0] as i64,
                words[1] as i64 * 32_768,
                words[2] as i64 * 65_536,
                words[3] as i64,
                words[4] as i64,
                words[5] as i64 * 256,
                words[6] as i64,
            ],
        }
    }

    /// The example coefficients printed in the MS5611 datasheet.
    pub const fn datasheet_example() -> Self {
        Self::from_prom([1, 40_127, 36_924, 23_317, 23_282, 33_464, 28_312])
    }

    /// Coefficient `index` in its scaled form.
    pub const fn coefficient(&self, index: usize) -> i64 {
        self.coefficients[index]
    }
}

/// One pair of raw ADC conversions: D1 (pressure) and D2 (temperature).
///
/// Both are 24-bit readings. [`compensate`] ignores the upper byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawConversion {
    pub d1: u32,
    pub d2: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Compensated {
    pub pressure_mbar: f32,
    pub temperature_c: f32,
}

/// Second-order temperature-compensated pressure and temperature.
pub fn compensate(raw: RawConversion, cal: &Calibration) -> Compensated {
    let c = &cal.coefficients;

    let d1 = (raw.d1 & ADC_MASK) as i64;
    let d2 = (raw.d2 & ADC_MASK) as i64;

    let d_t = (d2 - c[5]).clamp(DT_MIN, DT_MAX);
    let mut temp = 2000 + d_t * c[6] / 8_388_608;

    let (t2, off2, sens2) = if temp < 2000 {
        let t2 = d_t * d_t / 2_147_483_648;
        let base = 5 * (temp - 2000) * (temp - 2000);
        let mut off2 = base / 2;
        let mut sens2 = base / 4;
        if temp < -1500 {
            let low = (temp + 1500) * (temp + 1500);
            off2 += 7 * low;
            sens2 += 11 * low / 2;
        }
        (t2, off2, sens2)
    } else {
        (0, 0, 0)
    };

    temp -= t2;

    let off = (c[2] + c[4] * d_t / 128).clamp(OFF_MIN, OFF_MAX) - off2;
    let sens = (c[1] + c[3] * d_t / 256).clamp(SENS_MIN, SENS_MAX) - sens2;
    let p = (d1 * sens / 2_097_152 - off) / 32_768;

    Compensated {
        pressure_mbar: p as f32 * 0.01,
        temperature_c: temp as f32 * 0.01,
    }
}

pub fn mbar_to_pascal(mbar: f32) -> f32 {
    mbar * 100.0
}

/// Altitude in meters above the `sea_level_pa` reference.
pub fn altitude_from_pressure(pressure_pa: f32, sea_level_pa: f32) -> f32 {
    44_330.0 * (1.0 - libm::powf(pressure_pa / sea_level_pa, 0.190_294))
}
