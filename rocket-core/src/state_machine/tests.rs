// state_machine/tests.rs
#[cfg(test)]
mod tests {
    use crate::config::LoggerConfig;
    use crate::error::InitError;
    use crate::storage::{StoreLayout, RECORD_STRIDE};
    use crate::{FlightAction, FlightPhase, FlightSession, Snapshot};

    const PAD_ALTITUDE: f32 = 150.0;

    fn snapshot(altitude_m: f32, acceleration: [f32; 3]) -> Snapshot {
        Snapshot {
            altitude_m,
            acceleration,
            ..Snapshot::new()
        }
    }

    fn resting(altitude_m: f32) -> Snapshot {
        snapshot(altitude_m, [0.0, 9.8, 0.0])
    }

    fn session_with_capacity(max_samples: u32) -> FlightSession {
        let mut sm = FlightSession::new(&LoggerConfig::default());
        sm.start(StoreLayout::new(max_samples * RECORD_STRIDE, RECORD_STRIDE))
            .unwrap();
        sm
    }

    /// A session that has just left the pad at `PAD_ALTITUDE`.
    fn active_session(max_samples: u32) -> FlightSession {
        let mut sm = session_with_capacity(max_samples);
        sm.step(resting(PAD_ALTITUDE));
        sm.step(snapshot(PAD_ALTITUDE + 0.5, [0.0, 30.0, 0.0]));
        assert_eq!(sm.phase, FlightPhase::Active);
        sm
    }

    #[test]
    fn test_initial_state() {
        let sm = FlightSession::new(&LoggerConfig::default());
        assert_eq!(sm.phase, FlightPhase::Boot);
        assert!(sm.first_tick);
    }

    #[test]
    fn test_boot_ignores_ticks() {
        let mut sm = FlightSession::new(&LoggerConfig::default());
        let t = sm.step(snapshot(PAD_ALTITUDE + 5.0, [0.0, 50.0, 0.0]));
        assert_eq!(t.to, FlightPhase::Boot);
        assert_eq!(t.action, FlightAction::None);
    }

    #[test]
    fn test_start_derives_limits() {
        let sm = session_with_capacity(250);
        assert_eq!(sm.phase, FlightPhase::Idle);
        assert_eq!(sm.max_samples, 250);
        assert_eq!(sm.stride, RECORD_STRIDE);
        assert_eq!(sm.max_active_duration.as_millis(), 2_500);
        assert_eq!(sm.target_period(), sm.idle_period);
    }

    #[test]
    fn test_start_rejects_bad_config() {
        let mut config = LoggerConfig::default();
        config.samples_per_second = 0;
        let mut sm = FlightSession::new(&config);
        assert_eq!(
            sm.start(StoreLayout::new(1000, RECORD_STRIDE)),
            Err(InitError::InvalidSampleRate)
        );

        let mut sm = FlightSession::new(&LoggerConfig::default());
        assert_eq!(
            sm.start(StoreLayout::new(RECORD_STRIDE - 1, RECORD_STRIDE)),
            Err(InitError::StoreTooSmall)
        );
        assert_eq!(sm.phase, FlightPhase::Boot);
    }

    #[test]
    fn test_start_rejects_rate_above_tick_rate() {
        let mut config = LoggerConfig::default();
        config.samples_per_second = (embassy_time::TICK_HZ + 1) as u32;
        let mut sm = FlightSession::new(&config);
        assert_eq!(
            sm.start(StoreLayout::new(1000, RECORD_STRIDE)),
            Err(InitError::InvalidSampleRate)
        );

        config.samples_per_second = embassy_time::TICK_HZ as u32;
        let mut sm = FlightSession::new(&config);
        assert_eq!(sm.start(StoreLayout::new(1000, RECORD_STRIDE)), Ok(()));
        assert_eq!(sm.active_period, embassy_time::Duration::from_ticks(1));
    }

    #[test]
    fn test_first_tick_seeds_previous() {
        let mut sm = session_with_capacity(10);
        // A cold start far above the zeroed previous snapshot is not a climb.
        let t = sm.step(snapshot(PAD_ALTITUDE, [0.0, 30.0, 0.0]));
        assert_eq!(t.to, FlightPhase::Idle);
        assert!(!sm.first_tick);
    }

    #[test]
    fn test_launch_detection() {
        let mut sm = session_with_capacity(10);
        sm.step(resting(PAD_ALTITUDE));
        sm.write_offset = 7 * RECORD_STRIDE;

        let t = sm.step(snapshot(PAD_ALTITUDE + 0.25, [0.0, 10.5, 0.0]));
        assert_eq!(t.from, FlightPhase::Idle);
        assert_eq!(t.to, FlightPhase::Active);
        assert!(t.changed());
        assert_eq!(t.action, FlightAction::None);
        assert_eq!(sm.write_offset, 0);
        assert_eq!(sm.liftoff_altitude, PAD_ALTITUDE + 0.25);
        assert_eq!(sm.target_period(), sm.active_period);
    }

    #[test]
    fn test_launch_climb_boundary() {
        let mut sm = session_with_capacity(10);
        sm.step(resting(0.0));
        // 0.2 - 0.0 is exactly the threshold in f32.
        let t = sm.step(snapshot(0.2, [0.0, 10.5, 0.0]));
        assert_eq!(t.to, FlightPhase::Active);

        let mut sm = session_with_capacity(10);
        sm.step(resting(0.0));
        let t = sm.step(snapshot(0.19, [0.0, 10.5, 0.0]));
        assert_eq!(t.to, FlightPhase::Idle);
    }

    #[test]
    fn test_climb_alone_does_not_launch() {
        let mut sm = session_with_capacity(10);
        sm.step(resting(PAD_ALTITUDE));
        let t = sm.step(snapshot(PAD_ALTITUDE + 1.0, [0.0, 10.0, 0.0]));
        assert_eq!(t.to, FlightPhase::Idle);
    }

    #[test]
    fn test_acceleration_alone_does_not_launch() {
        let mut sm = session_with_capacity(10);
        sm.step(resting(PAD_ALTITUDE));
        let t = sm.step(snapshot(PAD_ALTITUDE + 0.1, [0.0, 40.0, 0.0]));
        assert_eq!(t.to, FlightPhase::Idle);
    }

    #[test]
    fn test_guards_must_hold_on_same_tick() {
        let mut sm = session_with_capacity(10);
        sm.step(resting(PAD_ALTITUDE));
        // Climb on one tick, thrust on the next with no further climb.
        sm.step(snapshot(PAD_ALTITUDE + 1.0, [0.0, 9.0, 0.0]));
        let t = sm.step(snapshot(PAD_ALTITUDE + 1.0, [0.0, 40.0, 0.0]));
        assert_eq!(t.to, FlightPhase::Idle);
    }

    #[test]
    fn test_active_records_sequential_offsets() {
        let mut sm = active_session(100);
        for i in 0..3u32 {
            let snap = snapshot(PAD_ALTITUDE + 50.0 + i as f32, [0.0, 30.0, 0.0]);
            let t = sm.step(snap);
            assert_eq!(
                t.action,
                FlightAction::Record {
                    offset: i * RECORD_STRIDE,
                    snapshot: snap
                }
            );
            assert_eq!(t.to, FlightPhase::Active);
        }
        assert_eq!(sm.sample_count, 3);
        assert_eq!(sm.write_offset, 3 * RECORD_STRIDE);
    }

    #[test]
    fn test_capacity_exhaustion_boundary() {
        let max = 4;
        let mut sm = active_session(max);
        for i in 1..max {
            let t = sm.step(snapshot(PAD_ALTITUDE + 100.0, [0.0, 30.0, 0.0]));
            assert_eq!(t.to, FlightPhase::Active, "write {} must not end recording", i);
        }
        let t = sm.step(snapshot(PAD_ALTITUDE + 100.0, [0.0, 30.0, 0.0]));
        assert!(matches!(t.action, FlightAction::Record { .. }));
        assert_eq!(t.to, FlightPhase::Dump);
        assert_eq!(sm.sample_count, max);
        assert_eq!(sm.write_offset, max * RECORD_STRIDE);
    }

    #[test]
    fn test_capacity_wins_over_landing() {
        let mut sm = active_session(1);
        // The single write both fills the store and looks like a landing.
        let t = sm.step(resting(PAD_ALTITUDE));
        assert_eq!(t.to, FlightPhase::Dump);
        assert_eq!(sm.sample_count, 1);
    }

    #[test]
    fn test_landing_waits_for_filter_warm_up() {
        let mut sm = active_session(1000);

        // Up and back down, far from the pad.
        for alt in [60.0, 300.0, 120.0, 40.0] {
            let t = sm.step(snapshot(PAD_ALTITUDE + alt, [0.0, 3.0, 0.0]));
            assert_eq!(t.to, FlightPhase::Active);
        }

        // Five qualifying ticks on the ground.
        for tick in 1..=4 {
            let t = sm.step(resting(PAD_ALTITUDE + 2.0));
            assert_eq!(t.to, FlightPhase::Active, "landed early on tick {}", tick);
        }
        let t = sm.step(resting(PAD_ALTITUDE + 2.0));
        assert_eq!(t.to, FlightPhase::Dump);
        assert!(matches!(t.action, FlightAction::Record { .. }));
    }

    #[test]
    fn test_no_landing_while_powered() {
        let mut sm = active_session(1000);
        for _ in 0..10 {
            let t = sm.step(snapshot(PAD_ALTITUDE + 1.0, [0.0, 12.0, 0.0]));
            assert_eq!(t.to, FlightPhase::Active);
        }
    }

    #[test]
    fn test_no_landing_far_from_pad() {
        let mut sm = active_session(1000);
        for _ in 0..10 {
            let t = sm.step(resting(PAD_ALTITUDE + 11.0));
            assert_eq!(t.to, FlightPhase::Active);
        }
    }

    #[test]
    fn test_landing_at_radius_boundary() {
        // Liftoff at PAD_ALTITUDE + 0.5, so this rests exactly 10 m away.
        let mut sm = active_session(1000);
        for tick in 1..=4 {
            let t = sm.step(resting(PAD_ALTITUDE + 10.5));
            assert_eq!(t.to, FlightPhase::Active, "landed early on tick {}", tick);
        }
        let t = sm.step(resting(PAD_ALTITUDE + 10.5));
        assert_eq!(t.to, FlightPhase::Dump);
    }

    #[test]
    fn test_dump_action_and_outcome() {
        let mut sm = active_session(2);
        sm.step(resting(PAD_ALTITUDE + 20.0));
        sm.step(resting(PAD_ALTITUDE + 20.0));
        assert_eq!(sm.phase, FlightPhase::Dump);

        let t = sm.step(resting(PAD_ALTITUDE));
        assert_eq!(t.action, FlightAction::Dump { sample_count: 2 });

        sm.finish_dump(true);
        assert_eq!(sm.phase, FlightPhase::End);
        assert_eq!(sm.target_period(), sm.end_period);
        assert_eq!(sm.step(resting(PAD_ALTITUDE)).action, FlightAction::None);
    }

    #[test]
    fn test_failed_dump_is_terminal() {
        let mut sm = active_session(1);
        sm.step(resting(PAD_ALTITUDE));
        sm.step(resting(PAD_ALTITUDE));
        sm.finish_dump(false);
        assert_eq!(sm.phase, FlightPhase::Error);
        let t = sm.step(snapshot(PAD_ALTITUDE + 5.0, [0.0, 50.0, 0.0]));
        assert_eq!(t.to, FlightPhase::Error);
        assert_eq!(t.action, FlightAction::None);
    }

    #[test]
    fn test_abandon_record_rolls_back() {
        let mut sm = active_session(100);
        sm.step(resting(PAD_ALTITUDE + 30.0));
        sm.step(resting(PAD_ALTITUDE + 31.0));
        sm.abandon_record();
        assert_eq!(sm.sample_count, 1);
        assert_eq!(sm.write_offset, RECORD_STRIDE);
        assert_eq!(sm.phase, FlightPhase::Dump);
    }

    #[test]
    fn test_previous_tracks_last_tick() {
        let mut sm = session_with_capacity(10);
        sm.step(resting(PAD_ALTITUDE));
        sm.step(resting(PAD_ALTITUDE + 0.1));
        assert_eq!(sm.previous.altitude_m, PAD_ALTITUDE + 0.1);
    }
}
