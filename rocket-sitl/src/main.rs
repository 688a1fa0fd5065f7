mod card;
mod sim;

use card::DirectoryCard;
use clap::Parser;
use embassy_time::Duration;
use log::{error, info};
use rocket_core::config::DEFAULT_SAMPLES_PER_SECOND;
use rocket_core::mock::RamStore;
use rocket_core::pressure::SEA_LEVEL_PRESSURE_PA;
use rocket_core::{FlightLogger, FlightPhase, LoggerConfig};
use sim::{FlightProfile, SimBarometer, SimClock, SimImu};
use std::error::Error;
use std::path::PathBuf;

/// MB85RS2MTA: 2 Mbit.
const FRAM_BYTES: usize = 262_144;

#[derive(Parser, Debug)]
#[command(name = "rocket-sitl")]
#[command(about = "Flies a synthetic trajectory through the flight logger")]
#[command(version)]
struct Args {
    /// Directory standing in for the SD card
    #[arg(short, long, default_value = "sitl-card")]
    output_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_SAMPLES_PER_SECOND)]
    samples_per_second: u32,

    #[arg(long, default_value_t = SEA_LEVEL_PRESSURE_PA)]
    sea_level_pa: f32,

    /// Size of the simulated non-volatile store in bytes
    #[arg(long, default_value_t = FRAM_BYTES)]
    store_bytes: usize,

    // ── Flight ────────────────────────────────────────────────
    #[arg(long, default_value_t = 150.0)]
    pad_altitude: f32,

    /// Apogee above the pad (m)
    #[arg(long, default_value_t = 300.0)]
    apogee: f32,

    // ── Sensors ───────────────────────────────────────────────
    /// Standard deviation of the altitude noise (m)
    #[arg(long, default_value_t = 0.0)]
    baro_noise: f32,

    /// Standard deviation of the accelerometer and gyro noise
    #[arg(long, default_value_t = 0.0)]
    imu_noise: f32,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Bench mode: record for this many seconds regardless of flight phase
    #[arg(long)]
    bench: Option<f32>,

    /// Virtual time advanced per idle poll (us)
    #[arg(long, default_value_t = 100)]
    step_us: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let phase = fly(&args)?;
    if phase != FlightPhase::End {
        error!("Flight ended in {:?}", phase);
        return Err(format!("flight ended in {}", phase.name()).into());
    }
    Ok(())
}

fn fly(args: &Args) -> Result<FlightPhase, Box<dyn Error>> {
    let config = LoggerConfig {
        samples_per_second: args.samples_per_second,
        sea_level_pa: args.sea_level_pa,
        ..LoggerConfig::default()
    };
    let profile = FlightProfile::new(args.pad_altitude, args.apogee);
    let mut clock = SimClock::new(Duration::from_micros(args.step_us.max(1)));

    let imu = SimImu::new(profile, clock.clone(), args.imu_noise, args.seed)?;
    let barometer = SimBarometer::new(
        profile,
        clock.clone(),
        args.sea_level_pa,
        args.baro_noise,
        args.seed.wrapping_add(1),
    )?;
    let card = DirectoryCard::new(args.output_dir.clone());

    let mut logger = FlightLogger::new(imu, barometer, RamStore::new(args.store_bytes), card, config);
    logger.init()?;

    info!(
        "Simulated apogee {:.1} m at t={:.2}s, landing at t={:.2}s",
        profile.pad_altitude + profile.apogee_agl,
        profile.apogee_time(),
        profile.landing_time()
    );

    let phase = match args.bench {
        Some(seconds) => {
            let run_time = Duration::from_micros((seconds.max(0.0) * 1_000_000.0) as u64);
            let records = logger.run_bench(&mut clock, run_time)?;
            info!("Bench run wrote {} records", records);
            logger.session().phase
        }
        None => logger.run(&mut clock),
    };

    let session = logger.session();
    info!(
        "Finished in {} at t={:.2}s: {} records, {} sensor faults",
        phase.name(),
        clock.seconds(),
        session.sample_count,
        session.sensor_faults
    );
    Ok(phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rocket-sitl-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn args(dir: &Path, extra: &[&str]) -> Args {
        let dir = dir.to_string_lossy().into_owned();
        let mut argv = vec!["rocket-sitl", "--output-dir", dir.as_str(), "--step-us", "1000"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_full_flight_is_dumped() {
        let dir = scratch_dir("flight");
        let phase = fly(&args(&dir, &[])).unwrap();
        assert_eq!(phase, FlightPhase::End);

        let dump = fs::read_to_string(dir.join("Log_0.csv")).unwrap();
        let rows: Vec<&str> = dump.lines().collect();
        assert_eq!(rows[0], rocket_core::log::CSV_HEADER);
        // Launch to landing is a bit over 40 s at 100 Hz.
        assert!(rows.len() > 4_000, "only {} rows", rows.len());

        let peak = rows[1..]
            .iter()
            .filter_map(|r| r.split(',').nth(1)?.parse::<f32>().ok())
            .fold(f32::MIN, f32::max);
        assert!((peak - 450.0).abs() < 1.0, "peak {}", peak);

        // A second flight on the same card takes the next slot.
        fly(&args(&dir, &[])).unwrap();
        assert!(dir.join("Log_1.csv").exists());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_small_store_ends_in_flight() {
        let dir = scratch_dir("small");
        let phase = fly(&args(&dir, &["--store-bytes", "3600"])).unwrap();
        assert_eq!(phase, FlightPhase::End);
        let dump = fs::read_to_string(dir.join("Log_0.csv")).unwrap();
        assert_eq!(dump.lines().count(), 101);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_bench_mode() {
        let dir = scratch_dir("bench");
        let phase = fly(&args(&dir, &["--bench", "0.5"])).unwrap();
        assert_eq!(phase, FlightPhase::End);
        let dump = fs::read_to_string(dir.join("RunTest.csv")).unwrap();
        assert_eq!(dump.lines().count(), 51);
        fs::remove_dir_all(dir).unwrap();
    }
}
