//! Integration tests for the playback engine
//!
//! - Interpolation never overshoots the bracketing frames
//! - Looping wraps to the start and reproduces the first pose
//! - Session override and restore of the rider configuration

mod common;

use chrono::Utc;
use common::builders::SessionBuilder;
use common::assert_float_eq;
use proptest::prelude::*;
use ridevis_rs::config::{Dimensions, RiderConfig};
use ridevis_rs::pose;
use ridevis_rs::session::{EngineState, Frame, PlaybackEngine, Session, SessionConfig};
use ridevis_rs::types::{Stance, TelemetrySample};
use std::time::Duration;

fn session_from(steps: &[(f64, f64)]) -> Session {
    let mut t = 0.0;
    let frames = steps
        .iter()
        .enumerate()
        .map(|(i, &(dt, value))| {
            if i > 0 {
                t += dt;
            }
            Frame::new(t, TelemetrySample::new(value.abs(), value, -value, 0.0, 0.0))
        })
        .collect();
    Session::new("prop", Utc::now(), SessionConfig::from(RiderConfig::default()), frames).unwrap()
}

/// Reference bracket by linear search
fn bracket(frames: &[Frame], t: f64) -> (f64, f64) {
    let last = frames.len() - 1;
    if t <= frames[0].t_ms {
        let v = frames[0].sample.lean_deg;
        return (v, v);
    }
    if t >= frames[last].t_ms {
        let v = frames[last].sample.lean_deg;
        return (v, v);
    }
    let i = frames
        .windows(2)
        .position(|w| w[0].t_ms <= t && t < w[1].t_ms)
        .unwrap_or(last - 1);
    let (a, b) = (frames[i].sample.lean_deg, frames[i + 1].sample.lean_deg);
    (a.min(b), a.max(b))
}

fn steps_strategy() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((1.0f64..200.0, -40.0f64..40.0), 2..40)
}

proptest! {
    #[test]
    fn prop_interpolation_never_overshoots(
        steps in steps_strategy(),
        queries in prop::collection::vec(0.0f64..=1.0, 1..30),
    ) {
        let session = session_from(&steps);
        let mut engine = PlaybackEngine::new();
        let mut rider = RiderConfig::default();
        engine.load_session(&session, None, &mut rider).unwrap();

        // Arbitrary order, so both forward scans and restarts are covered
        for q in queries {
            let t = q * session.duration_ms();
            let sample = engine.sample_at(t).unwrap();
            let (lo, hi) = bracket(&session.frames, t);
            prop_assert!(sample.lean_deg >= lo - 1e-9 && sample.lean_deg <= hi + 1e-9,
                "lean {} outside [{}, {}] at t={}", sample.lean_deg, lo, hi, t);
        }
    }

    #[test]
    fn prop_tick_stays_within_duration(
        steps in steps_strategy(),
        deltas in prop::collection::vec(0u64..500, 1..50),
    ) {
        let session = session_from(&steps);
        let mut engine = PlaybackEngine::new();
        let mut rider = RiderConfig::default();
        engine.load_session(&session, None, &mut rider).unwrap();

        for ms in deltas {
            engine.tick(Duration::from_millis(ms));
            prop_assert!(engine.current_time_ms() >= 0.0);
            prop_assert!(engine.current_time_ms() < session.duration_ms());
        }
    }
}

#[test]
fn test_loop_wraps_to_first_pose() {
    let session = SessionBuilder::new("loop")
        .interval_ms(100.0)
        .leans(&[(10.0, 12.0), (40.0, -6.0), (70.0, 3.0)])
        .build();
    let mut engine = PlaybackEngine::new();
    let mut rider = RiderConfig::default();
    engine.load_session(&session, None, &mut rider).unwrap();

    engine.tick(Duration::from_millis(150));
    assert_float_eq(engine.current_time_ms(), 150.0, 1e-9);

    let sample = engine.tick(Duration::from_millis(100)).unwrap();
    assert_eq!(engine.current_time_ms(), 0.0);
    assert_eq!(engine.scan_index(), 0);

    let first = session.frames[0].sample;
    assert_eq!(sample, first);
    let wrapped = pose::solve(&sample, &rider.dims, rider.stance);
    let expected = pose::solve(&first, &rider.dims, rider.stance);
    assert_eq!(wrapped.segments(), expected.segments());
}

#[test]
fn test_speed_applies_to_next_tick() {
    let session = SessionBuilder::new("speed")
        .leans(&[(0.0, 0.0), (0.0, 10.0), (0.0, 20.0), (0.0, 30.0), (0.0, 40.0), (0.0, 50.0)])
        .build();
    let mut engine = PlaybackEngine::new();
    let mut rider = RiderConfig::default();
    engine.load_session(&session, None, &mut rider).unwrap();

    engine.tick(Duration::from_millis(100));
    engine.set_speed(2.0);
    assert_float_eq(engine.current_time_ms(), 100.0, 1e-9);
    engine.tick(Duration::from_millis(100));
    assert_float_eq(engine.current_time_ms(), 300.0, 1e-9);
    assert_float_eq(engine.current_sample().unwrap().lean_deg, 30.0, 1e-9);
}

#[test]
fn test_session_override_restored_on_exit() {
    let dims = Dimensions {
        standing_height: 1.0,
        ..Default::default()
    };
    let session = SessionBuilder::new("override")
        .dims(dims)
        .stance(Stance::Regular)
        .leans(&[(0.0, 0.0), (10.0, 5.0)])
        .build();

    let mut engine = PlaybackEngine::new();
    engine.connect_live();
    let mut rider = RiderConfig::default();
    engine.load_session(&session, Some("abc".into()), &mut rider).unwrap();

    assert_eq!(engine.state(), EngineState::PlayingRecorded);
    assert_eq!(rider.stance, Stance::Regular);
    assert_eq!(rider.dims.standing_height, 1.0);
    assert!(!engine.apply_live(TelemetrySample::default()));

    assert!(!engine.toggle_play());
    assert_eq!(engine.state(), EngineState::PausedRecorded);

    assert!(engine.exit_to_live(&mut rider));
    assert_eq!(rider, RiderConfig::default());
    assert_eq!(engine.state(), EngineState::Live);
    assert!(engine.apply_live(TelemetrySample::new(1.0, 2.0, 3.0, 4.0, 5.0)));
}
