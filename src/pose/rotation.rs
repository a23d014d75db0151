//! Rotation matrices used by the solver.
//!
//! All angles are radians. Y is the board's travel axis, X points across
//! the board and Z is up.

use nalgebra::Matrix3;

/// Edge lean: rotation about the travel (Y) axis
pub fn edge(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, 0.0, -s, //
        0.0, 1.0, 0.0, //
        s, 0.0, c,
    )
}

/// Terrain slope: rotation about the lateral (X) axis, nose-down positive
pub fn slope(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, c, -s, //
        0.0, s, c,
    )
}

/// Torso yaw about the vertical (Z) axis
pub fn yaw(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, -s, 0.0, //
        s, c, 0.0, //
        0.0, 0.0, 1.0,
    )
}

/// Torso pitch about the travel (Y) axis
pub fn pitch(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, 0.0, s, //
        0.0, 1.0, 0.0, //
        -s, 0.0, c,
    )
}

/// Torso roll about the lateral (X) axis
pub fn roll(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, c, -s, //
        0.0, s, c,
    )
}

/// Board orientation: slope pitch applied first, then edge lean
pub fn board(edge_angle: f64, slope_angle: f64) -> Matrix3<f64> {
    edge(edge_angle) * slope(slope_angle)
}

/// Torso orientation: board, then yaw, pitch, roll
pub fn torso(board: &Matrix3<f64>, yaw_angle: f64, pitch_angle: f64, roll_angle: f64) -> Matrix3<f64> {
    board * yaw(yaw_angle) * pitch(pitch_angle) * roll(roll_angle)
}
