//! Pose solver
//!
//! Maps one [`TelemetrySample`] plus the rider's [`Dimensions`] and
//! [`Stance`] to a full skeleton of named 3D landmarks. The solver is a
//! pure function with no cross-frame memory; call it every tick.
//!
//! # Frame
//!
//! Z is up, Y runs along the board (travel axis) and X across it, the
//! direction the rider faces. The ground plane `z = 0` touches the lowest
//! board corner after edge and slope rotation, not the board centre.
//!
//! # Composition
//!
//! 1. Hip height interpolates between standing and minimum height by squat.
//! 2. Lean is normalized against max lean; it drives hip shift and arms.
//! 3. Board rotation = edge lean about Y after slope pitch about X.
//! 4. Stance flips every left/right offset through one multiplier.
//! 5. Feet, knees and hip are board-local offsets rotated with the board.
//! 6. Torso = board, then yaw, pitch, roll; head, shoulders and chest hang off it.
//! 7. Arms use the heuristic in [`arms`].
//!
//! Zero-length bones never raise errors; [`Segment::is_degenerate`] lets
//! renderers skip them.

pub mod arms;
pub mod carve;
pub mod rotation;

pub use arms::{ArmPoints, Side};
pub use carve::{flow_path, is_toeside, trail_ribbon, CarveState, Edge, TrailPoint, TurnDirection};

use nalgebra::{Matrix3, Point3, Vector3};

use crate::config::Dimensions;
use crate::types::{Stance, TelemetrySample};

/// Foot offset from the board centre along the travel axis (m)
pub const FOOT_SPACING: f64 = 0.25;
/// Sole height above the deck (m)
pub const FOOT_LIFT: f64 = 0.02;
/// Knee angle with legs extended (deg)
pub const KNEE_EXTENDED_DEG: f64 = 170.0;
/// Knee angle at full squat (deg)
pub const KNEE_SQUAT_DEG: f64 = 70.0;
/// Knee forward offset at 0 % squat (m)
pub const KNEE_FORWARD: f64 = 0.12;
/// Added knee forward offset at full squat (m)
pub const KNEE_FORWARD_SQUAT: f64 = 0.08;
/// Shoulder line height as a fraction of torso length
pub const SHOULDER_FRACTION: f64 = 0.85;
/// Chest marker height as a fraction of torso length
pub const CHEST_FRACTION: f64 = 0.6;
/// Length of the chest normal marker (m)
pub const CHEST_NORMAL_LEN: f64 = 0.3;
/// Bones shorter than this are reported as degenerate (m)
pub const DEGENERATE_EPSILON: f64 = 1e-9;

/// Lean normalized against max lean, clamped to [-1, 1]
pub fn edge_norm(lean_deg: f64, max_lean_deg: f64) -> f64 {
    if max_lean_deg <= 0.0 || !max_lean_deg.is_finite() {
        return 0.0;
    }
    (lean_deg / max_lean_deg).clamp(-1.0, 1.0)
}

/// Hip height above the deck for a squat percentage (m)
pub fn hip_height(squat_pct: f64, dims: &Dimensions) -> f64 {
    dims.standing_height - (squat_pct / 100.0) * (dims.standing_height - dims.min_height)
}

/// Knee angle for a squat percentage (deg)
pub fn knee_angle_deg(squat_pct: f64) -> f64 {
    KNEE_EXTENDED_DEG - (squat_pct / 100.0) * (KNEE_EXTENDED_DEG - KNEE_SQUAT_DEG)
}

/// Knee height above the foot for a two-bone leg with equal shin and thigh.
///
/// The law of cosines gives the foot-to-hip span for the knee angle; the
/// knee sits at half that span.
pub fn knee_height(shin_length: f64, knee_angle_deg: f64) -> f64 {
    let cos_knee = knee_angle_deg.to_radians().cos();
    let span_sq = 2.0 * shin_length * shin_length * (1.0 - cos_knee);
    span_sq.max(0.0).sqrt() / 2.0
}

/// Named skeletal landmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Landmark {
    LeftFoot,
    RightFoot,
    LeftKnee,
    RightKnee,
    Hip,
    Head,
    ShoulderCenter,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftHand,
    RightHand,
    Chest,
    ChestTip,
}

impl Landmark {
    /// Joints drawn as markers by the viewer
    pub const JOINTS: [Landmark; 10] = [
        Landmark::LeftFoot,
        Landmark::RightFoot,
        Landmark::LeftKnee,
        Landmark::RightKnee,
        Landmark::Hip,
        Landmark::Head,
        Landmark::LeftShoulder,
        Landmark::RightShoulder,
        Landmark::LeftElbow,
        Landmark::RightElbow,
    ];
}

/// Renderable bones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bone {
    LeftShin,
    RightShin,
    LeftThigh,
    RightThigh,
    Torso,
    Neck,
    Shoulders,
    LeftUpperArm,
    RightUpperArm,
    LeftForearm,
    RightForearm,
    ChestNormal,
}

impl Bone {
    pub const ALL: [Bone; 12] = [
        Bone::LeftShin,
        Bone::RightShin,
        Bone::LeftThigh,
        Bone::RightThigh,
        Bone::Torso,
        Bone::Neck,
        Bone::Shoulders,
        Bone::LeftUpperArm,
        Bone::RightUpperArm,
        Bone::LeftForearm,
        Bone::RightForearm,
        Bone::ChestNormal,
    ];

    /// Start and end landmarks
    pub fn endpoints(&self) -> (Landmark, Landmark) {
        match self {
            Bone::LeftShin => (Landmark::LeftFoot, Landmark::LeftKnee),
            Bone::RightShin => (Landmark::RightFoot, Landmark::RightKnee),
            Bone::LeftThigh => (Landmark::LeftKnee, Landmark::Hip),
            Bone::RightThigh => (Landmark::RightKnee, Landmark::Hip),
            Bone::Torso => (Landmark::Hip, Landmark::ShoulderCenter),
            Bone::Neck => (Landmark::ShoulderCenter, Landmark::Head),
            Bone::Shoulders => (Landmark::LeftShoulder, Landmark::RightShoulder),
            Bone::LeftUpperArm => (Landmark::LeftShoulder, Landmark::LeftElbow),
            Bone::RightUpperArm => (Landmark::RightShoulder, Landmark::RightElbow),
            Bone::LeftForearm => (Landmark::LeftElbow, Landmark::LeftHand),
            Bone::RightForearm => (Landmark::RightElbow, Landmark::RightHand),
            Bone::ChestNormal => (Landmark::Chest, Landmark::ChestTip),
        }
    }
}

/// A bone resolved to world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub bone: Bone,
    pub start: Point3<f64>,
    pub end: Point3<f64>,
}

impl Segment {
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// Start and end coincide; renderers skip these
    pub fn is_degenerate(&self) -> bool {
        self.length() < DEGENERATE_EPSILON
    }
}

/// Solver output: every landmark plus derived scalars
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    /// Board corners, counter-clockwise from the back-left corner
    pub board: [Point3<f64>; 4],
    pub left_foot: Point3<f64>,
    pub right_foot: Point3<f64>,
    pub left_knee: Point3<f64>,
    pub right_knee: Point3<f64>,
    pub hip: Point3<f64>,
    pub head: Point3<f64>,
    pub shoulder_center: Point3<f64>,
    pub left_shoulder: Point3<f64>,
    pub right_shoulder: Point3<f64>,
    pub left_elbow: Point3<f64>,
    pub right_elbow: Point3<f64>,
    pub left_hand: Point3<f64>,
    pub right_hand: Point3<f64>,
    pub chest: Point3<f64>,
    /// End of the outward chest normal
    pub chest_tip: Point3<f64>,
    pub knee_angle_deg: f64,
    /// Lateral hip offset in board space (m); negative shifts toward -X
    pub hip_shift: f64,
    pub edge_angle_rad: f64,
    /// Lean normalized to [-1, 1]
    pub edge_norm: f64,
    /// Vertical shift applied so the lowest board corner sits on z = 0
    pub ground_offset: f64,
    /// Combined torso orientation (board, yaw, pitch, roll)
    pub torso_rotation: Matrix3<f64>,
}

impl Pose {
    pub fn landmark(&self, landmark: Landmark) -> Point3<f64> {
        match landmark {
            Landmark::LeftFoot => self.left_foot,
            Landmark::RightFoot => self.right_foot,
            Landmark::LeftKnee => self.left_knee,
            Landmark::RightKnee => self.right_knee,
            Landmark::Hip => self.hip,
            Landmark::Head => self.head,
            Landmark::ShoulderCenter => self.shoulder_center,
            Landmark::LeftShoulder => self.left_shoulder,
            Landmark::RightShoulder => self.right_shoulder,
            Landmark::LeftElbow => self.left_elbow,
            Landmark::RightElbow => self.right_elbow,
            Landmark::LeftHand => self.left_hand,
            Landmark::RightHand => self.right_hand,
            Landmark::Chest => self.chest,
            Landmark::ChestTip => self.chest_tip,
        }
    }

    pub fn segment(&self, bone: Bone) -> Segment {
        let (a, b) = bone.endpoints();
        Segment {
            bone,
            start: self.landmark(a),
            end: self.landmark(b),
        }
    }

    /// Every bone, degenerate ones included
    pub fn segments(&self) -> Vec<Segment> {
        Bone::ALL.iter().map(|&b| self.segment(b)).collect()
    }

    /// Bones worth drawing
    pub fn renderable_segments(&self) -> impl Iterator<Item = Segment> + '_ {
        Bone::ALL
            .iter()
            .map(|&b| self.segment(b))
            .filter(|s| !s.is_degenerate())
    }

    /// Closed board outline (first corner repeated)
    pub fn board_outline(&self) -> [Point3<f64>; 5] {
        [
            self.board[0],
            self.board[1],
            self.board[2],
            self.board[3],
            self.board[0],
        ]
    }
}

fn point(v: Vector3<f64>) -> Point3<f64> {
    Point3::from(v)
}

/// Solve the rider pose for one telemetry sample
pub fn solve(sample: &TelemetrySample, dims: &Dimensions, stance: Stance) -> Pose {
    let squat01 = sample.squat_pct / 100.0;
    let stance_mul = stance.multiplier();

    // Hip height and edge-driven hip shift
    let hip_height = hip_height(sample.squat_pct, dims);
    let edge_norm = edge_norm(sample.lean_deg, dims.max_lean_deg);
    let hip_shift = -edge_norm * squat01 * dims.max_hip_shift;
    let edge_angle = sample.lean_deg.to_radians();

    // Board orientation, grounded on its lowest corner
    let board_rot = rotation::board(edge_angle, sample.slope_deg.to_radians());
    let half_w = dims.board_width / 2.0;
    let half_l = dims.board_length / 2.0;
    let corners = [
        Vector3::new(-half_w, -half_l, 0.0),
        Vector3::new(half_w, -half_l, 0.0),
        Vector3::new(half_w, half_l, 0.0),
        Vector3::new(-half_w, half_l, 0.0),
    ]
    .map(|c| board_rot * c);
    let ground_offset = corners.iter().map(|c| c.z).fold(f64::INFINITY, f64::min);
    let lift = Vector3::new(0.0, 0.0, ground_offset);
    let place = |local: Vector3<f64>| point(board_rot * local - lift);
    let board = corners.map(|c| point(c - lift));

    // Legs
    let knee_angle = knee_angle_deg(sample.squat_pct);
    let knee_forward = KNEE_FORWARD + squat01 * KNEE_FORWARD_SQUAT;
    let knee_z = knee_height(dims.shin_length, knee_angle);
    let knee_x = hip_shift - knee_forward * stance_mul;
    let foot_y = FOOT_SPACING * stance_mul;

    let left_foot = place(Vector3::new(0.0, -foot_y, FOOT_LIFT));
    let right_foot = place(Vector3::new(0.0, foot_y, FOOT_LIFT));
    let left_knee = place(Vector3::new(knee_x, -foot_y, knee_z));
    let right_knee = place(Vector3::new(knee_x, foot_y, knee_z));
    let hip = place(Vector3::new(hip_shift, 0.0, hip_height));

    // Torso
    let yaw = sample.torso_rot_deg.to_radians();
    let torso_rotation = rotation::torso(
        &board_rot,
        yaw,
        sample.pitch_deg.to_radians(),
        sample.roll_deg.to_radians(),
    );
    let torso_vec = torso_rotation * Vector3::new(0.0, 0.0, dims.torso_length);
    let head = hip + torso_vec;

    let shoulder_vec = torso_rotation * Vector3::new(0.0, dims.shoulder_spread, 0.0) * stance_mul;
    let shoulder_center = hip + torso_vec * SHOULDER_FRACTION;
    let left_shoulder = shoulder_center - shoulder_vec;
    let right_shoulder = shoulder_center + shoulder_vec;

    let chest = hip + torso_vec * CHEST_FRACTION;
    let chest_normal = torso_rotation * Vector3::new(-stance_mul, 0.0, 0.0) * CHEST_NORMAL_LEN;
    let chest_tip = chest + chest_normal;

    // Arms
    let arm_ctx = arms::ArmContext {
        stance_mul,
        squat01,
        edge_norm,
        yaw,
        torso_rotation: &torso_rotation,
        upper_arm_len: dims.upper_arm_len,
        forearm_len: dims.forearm_len,
    };
    let left_arm = arms::place_arm(&left_shoulder, Side::Left, &arm_ctx);
    let right_arm = arms::place_arm(&right_shoulder, Side::Right, &arm_ctx);

    Pose {
        board,
        left_foot,
        right_foot,
        left_knee,
        right_knee,
        hip,
        head,
        shoulder_center,
        left_shoulder,
        right_shoulder,
        left_elbow: left_arm.elbow,
        right_elbow: right_arm.elbow,
        left_hand: left_arm.hand,
        right_hand: right_arm.hand,
        chest,
        chest_tip,
        knee_angle_deg: knee_angle,
        hip_shift,
        edge_angle_rad: edge_angle,
        edge_norm,
        ground_offset,
        torso_rotation,
    }
}
