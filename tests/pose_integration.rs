//! Integration tests for the pose solver
//!
//! - Neutral symmetry for any squat depth and stance
//! - The worked 50 % squat / 15° lean example
//! - Grounding and totality over the whole input range

mod common;

use common::assert_float_eq;
use proptest::prelude::*;
use ridevis_rs::config::Dimensions;
use ridevis_rs::pose::{self, Landmark};
use ridevis_rs::types::{Stance, TelemetrySample};

const PAIRS: [(Landmark, Landmark); 5] = [
    (Landmark::LeftFoot, Landmark::RightFoot),
    (Landmark::LeftKnee, Landmark::RightKnee),
    (Landmark::LeftShoulder, Landmark::RightShoulder),
    (Landmark::LeftElbow, Landmark::RightElbow),
    (Landmark::LeftHand, Landmark::RightHand),
];

fn stance_strategy() -> impl Strategy<Value = Stance> {
    prop_oneof![Just(Stance::Goofy), Just(Stance::Regular)]
}

#[test]
fn test_neutral_pose_is_symmetric() {
    let pose = pose::solve(&TelemetrySample::default(), &Dimensions::default(), Stance::Goofy);
    for (left, right) in PAIRS {
        let l = pose.landmark(left);
        let r = pose.landmark(right);
        assert_float_eq(l.x, r.x, 1e-9);
        assert_float_eq(l.y, -r.y, 1e-9);
        assert_float_eq(l.z, r.z, 1e-9);
    }
    assert_float_eq(pose.hip.x, 0.0, 1e-12);
    assert_float_eq(pose.hip.y, 0.0, 1e-12);
}

#[test]
fn test_half_squat_quarter_lean_scenario() {
    let dims = Dimensions::default();
    let sample = TelemetrySample::new(50.0, 15.0, 0.0, 0.0, 0.0);
    let pose = pose::solve(&sample, &dims, Stance::Goofy);

    assert_float_eq(pose.edge_norm, 0.5, 1e-12);
    assert!(pose.hip.z > dims.min_height && pose.hip.z < dims.standing_height);
    assert!(pose.hip_shift < 0.0);
    assert_float_eq(pose.hip_shift, -0.5 * 0.5 * dims.max_hip_shift, 1e-12);
    assert_float_eq(pose.knee_angle_deg, 120.0, 1e-12);
}

#[test]
fn test_every_bone_has_a_segment() {
    let pose = pose::solve(
        &TelemetrySample::new(30.0, -8.0, 20.0, 5.0, -3.0),
        &Dimensions::default(),
        Stance::Regular,
    );
    let segments = pose.segments();
    assert_eq!(segments.len(), pose::Bone::ALL.len());
    assert_eq!(pose.renderable_segments().count(), segments.len());
}

proptest! {
    #[test]
    fn prop_neutral_symmetry_any_squat(squat in 0.0f64..=100.0, stance in stance_strategy()) {
        let sample = TelemetrySample::new(squat, 0.0, 0.0, 0.0, 0.0);
        let pose = pose::solve(&sample, &Dimensions::default(), stance);
        for (left, right) in PAIRS {
            let l = pose.landmark(left);
            let r = pose.landmark(right);
            prop_assert!((l.x - r.x).abs() < 1e-9);
            prop_assert!((l.y + r.y).abs() < 1e-9);
            prop_assert!((l.z - r.z).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_board_rests_on_ground(
        squat in 0.0f64..=100.0,
        lean in -45.0f64..=45.0,
        slope in -20.0f64..=20.0,
        rot in -90.0f64..=90.0,
        stance in stance_strategy(),
    ) {
        let sample = TelemetrySample::new(squat, lean, rot, 0.0, 0.0).with_slope(slope);
        let pose = pose::solve(&sample, &Dimensions::default(), stance);

        let lowest = pose.board.iter().map(|c| c.z).fold(f64::INFINITY, f64::min);
        prop_assert!(lowest.abs() < 1e-9);
        prop_assert!(pose.edge_norm.abs() <= 1.0);
        for segment in pose.segments() {
            prop_assert!(segment.start.coords.iter().all(|v| v.is_finite()));
            prop_assert!(segment.end.coords.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn prop_hip_lowers_with_squat(a in 0.0f64..=100.0, b in 0.0f64..=100.0) {
        let dims = Dimensions::default();
        let pa = pose::solve(&TelemetrySample::new(a, 0.0, 0.0, 0.0, 0.0), &dims, Stance::Goofy);
        let pb = pose::solve(&TelemetrySample::new(b, 0.0, 0.0, 0.0, 0.0), &dims, Stance::Goofy);
        if a < b {
            prop_assert!(pa.hip.z >= pb.hip.z);
        }
        prop_assert!(pa.hip.z <= dims.standing_height + 1e-12);
        prop_assert!(pa.hip.z >= dims.min_height - 1e-12);
    }
}
