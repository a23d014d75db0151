//! Procedural arm placement.
//!
//! This is a heuristic, not inverse kinematics: each arm segment direction
//! is a weighted blend of a relaxed "hang down and out" posture, an edge
//! counterbalance, a flare proportional to torso twist, and a partial
//! counter-rotation against the torso yaw. The weight tables below are the
//! visual calibration of the rig; recorded sessions only replay with the
//! same look if they stay in sync.
//!
//! Composition order per segment: base direction, edge offset, rotation
//! flare, counter-rotation, normalize-and-scale, torso-to-world transform.

use nalgebra::{Matrix3, Point3, Vector3};

/// Fraction of torso yaw the arms lag behind
pub const COUNTER_ROTATION: f64 = 0.4;

/// Direction weights for one arm segment in torso-local space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmWeights {
    /// Forward (X) component at 0 % squat
    pub forward: f64,
    /// Added forward reach per unit squat
    pub squat_forward: f64,
    /// Outward (Y) component at 0 % squat
    pub outward: f64,
    /// Added outward reach per unit squat
    pub squat_outward: f64,
    /// Vertical (Z) component at 0 % squat
    pub down: f64,
    /// Arms rise by this much per unit squat
    pub squat_rise: f64,
    /// Counterbalance shift per unit edge, stance independent
    pub edge_forward: f64,
    /// Front arm rises / back arm drops per unit edge
    pub edge_height: f64,
    /// Outward flare per radian of torso twist
    pub flare: f64,
}

/// Shoulder to elbow
pub const UPPER_ARM: ArmWeights = ArmWeights {
    forward: -0.1,
    squat_forward: -0.15,
    outward: 0.15,
    squat_outward: 0.2,
    down: -0.85,
    squat_rise: 0.5,
    edge_forward: 0.2,
    edge_height: 0.15,
    flare: 0.15,
};

/// Elbow to hand
pub const FOREARM: ArmWeights = ArmWeights {
    forward: -0.2,
    squat_forward: -0.2,
    outward: 0.1,
    squat_outward: 0.15,
    down: -0.8,
    squat_rise: 0.3,
    edge_forward: 0.15,
    edge_height: 0.1,
    flare: 0.12,
};

/// Which arm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn sign(&self) -> f64 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }
}

/// Inputs shared by both arms for one solve
#[derive(Debug, Clone, Copy)]
pub struct ArmContext<'a> {
    pub stance_mul: f64,
    pub squat01: f64,
    pub edge_norm: f64,
    /// Torso yaw in radians
    pub yaw: f64,
    pub torso_rotation: &'a Matrix3<f64>,
    pub upper_arm_len: f64,
    pub forearm_len: f64,
}

/// Elbow and hand positions for one arm
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmPoints {
    pub elbow: Point3<f64>,
    pub hand: Point3<f64>,
}

/// Unnormalized torso-local direction for one segment
pub fn segment_direction(weights: &ArmWeights, side: Side, ctx: &ArmContext<'_>) -> Vector3<f64> {
    let side_mul = side.sign() * ctx.stance_mul;

    let mut dir = Vector3::new(
        (weights.forward + ctx.squat01 * weights.squat_forward) * ctx.stance_mul,
        side_mul * (weights.outward + ctx.squat01 * weights.squat_outward),
        weights.down + ctx.squat01 * weights.squat_rise,
    );

    dir.x += ctx.edge_norm * weights.edge_forward;
    dir.z += side.sign() * ctx.stance_mul * ctx.edge_norm * weights.edge_height;

    dir.y += side_mul * ctx.yaw.abs() * weights.flare;

    let (sin_r, cos_r) = (-ctx.yaw * COUNTER_ROTATION).sin_cos();
    let x = dir.x * cos_r - dir.y * sin_r;
    let y = dir.x * sin_r + dir.y * cos_r;
    dir.x = x;
    dir.y = y;

    dir
}

/// Scale a torso-local direction to `length` and move it into world space.
///
/// A zero direction stays zero, which the renderer sees as a degenerate
/// segment.
fn to_world(dir: Vector3<f64>, length: f64, torso_rotation: &Matrix3<f64>) -> Vector3<f64> {
    let scaled = dir
        .try_normalize(f64::EPSILON)
        .map(|unit| unit * length)
        .unwrap_or_else(Vector3::zeros);
    torso_rotation * scaled
}

/// Place one arm hanging from `shoulder`
pub fn place_arm(shoulder: &Point3<f64>, side: Side, ctx: &ArmContext<'_>) -> ArmPoints {
    let upper = segment_direction(&UPPER_ARM, side, ctx);
    let elbow = shoulder + to_world(upper, ctx.upper_arm_len, ctx.torso_rotation);

    let fore = segment_direction(&FOREARM, side, ctx);
    let hand = elbow + to_world(fore, ctx.forearm_len, ctx.torso_rotation);

    ArmPoints { elbow, hand }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(torso: &Matrix3<f64>) -> ArmContext<'_> {
        ArmContext {
            stance_mul: 1.0,
            squat01: 0.0,
            edge_norm: 0.0,
            yaw: 0.0,
            torso_rotation: torso,
            upper_arm_len: 0.28,
            forearm_len: 0.25,
        }
    }

    #[test]
    fn test_segment_lengths_match_config() {
        let torso = Matrix3::identity();
        let shoulder = Point3::new(0.0, 0.2, 1.4);
        let arm = place_arm(&shoulder, Side::Right, &ctx(&torso));
        assert!(((arm.elbow - shoulder).norm() - 0.28).abs() < 1e-12);
        assert!(((arm.hand - arm.elbow).norm() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_relaxed_arm_hangs_down_and_out() {
        let torso = Matrix3::identity();
        let c = ctx(&torso);
        let right = segment_direction(&UPPER_ARM, Side::Right, &c);
        let left = segment_direction(&UPPER_ARM, Side::Left, &c);
        assert!(right.z < 0.0);
        assert!(right.y > 0.0);
        assert_eq!(left.y, -right.y);
        assert_eq!(left.x, right.x);
    }

    #[test]
    fn test_edge_raises_one_arm_and_drops_the_other() {
        let torso = Matrix3::identity();
        let c = ArmContext {
            edge_norm: 1.0,
            ..ctx(&torso)
        };
        let right = segment_direction(&UPPER_ARM, Side::Right, &c);
        let left = segment_direction(&UPPER_ARM, Side::Left, &c);
        assert!(right.z > left.z);
        assert!((right.z - left.z - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_counter_rotation_opposes_yaw() {
        let torso = Matrix3::identity();
        let still = segment_direction(&UPPER_ARM, Side::Right, &ctx(&torso));
        let twisted = segment_direction(
            &UPPER_ARM,
            Side::Right,
            &ArmContext {
                yaw: 0.5,
                ..ctx(&torso)
            },
        );
        let angle = |v: &Vector3<f64>| v.y.atan2(v.x);
        // Flare widens the arm, then the whole horizontal component turns
        // back against the yaw by 40 % of it
        let flared = Vector3::new(still.x, still.y + 0.5 * UPPER_ARM.flare, still.z);
        assert!((angle(&twisted) - (angle(&flared) - 0.2)).abs() < 1e-12);
    }
}
