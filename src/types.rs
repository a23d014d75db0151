//! Core data types for RideVis-RS
//!
//! This module contains the value types shared by the pose solver, the
//! playback engine and the analytics pass.
//!
//! # Main Types
//!
//! - [`TelemetrySample`] - One instantaneous reading of the six body/board channels
//! - [`Stance`] - Goofy/regular foot-forward convention
//! - [`ConnectionStatus`] - State of the live telemetry link
//! - [`ImuStatus`] - Per-sensor connection flags reported by the live source
//!
//! # Channels
//!
//! | Channel           | Unit  | Range                            |
//! |-------------------|-------|----------------------------------|
//! | `squat_pct`       | %     | 0 (standing) .. 100 (full squat) |
//! | `lean_deg`        | deg   | signed, bounded by max lean      |
//! | `torso_rot_deg`   | deg   | signed yaw relative to the board |
//! | `pitch_deg`       | deg   | signed                           |
//! | `roll_deg`        | deg   | signed                           |
//! | `slope_deg`       | deg   | signed terrain pitch             |
//! | `board_accel_fwd` | m/s²  | optional, signed                 |

use serde::{Deserialize, Serialize};

/// Number of channels stored per recorded frame when acceleration is absent
pub const BASE_CHANNEL_COUNT: usize = 6;

/// Number of channels stored per recorded frame including forward acceleration
pub const FULL_CHANNEL_COUNT: usize = 7;

/// Linear interpolation between two scalars
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// A single instantaneous telemetry reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    /// Knee bend between standing (0) and minimum height (100)
    pub squat_pct: f64,
    /// Board edge angle; positive tilts the left edge down
    pub lean_deg: f64,
    /// Upper-body yaw relative to the travel axis
    #[serde(rename = "torsoRot")]
    pub torso_rot_deg: f64,
    /// Torso pitch layered on top of yaw
    #[serde(rename = "pitch")]
    pub pitch_deg: f64,
    /// Torso roll layered on top of pitch
    #[serde(rename = "roll")]
    pub roll_deg: f64,
    /// Terrain pitch under the board
    #[serde(default)]
    pub slope_deg: f64,
    /// Forward board acceleration, when the board IMU reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_accel_fwd: Option<f64>,
}

impl TelemetrySample {
    /// Create a sample from the five body channels (slope 0, no acceleration)
    pub fn new(squat_pct: f64, lean_deg: f64, torso_rot_deg: f64, pitch_deg: f64, roll_deg: f64) -> Self {
        Self {
            squat_pct,
            lean_deg,
            torso_rot_deg,
            pitch_deg,
            roll_deg,
            slope_deg: 0.0,
            board_accel_fwd: None,
        }
    }

    /// Set the terrain slope
    pub fn with_slope(mut self, slope_deg: f64) -> Self {
        self.slope_deg = slope_deg;
        self
    }

    /// Set the forward acceleration channel
    pub fn with_accel(mut self, accel: f64) -> Self {
        self.board_accel_fwd = Some(accel);
        self
    }

    /// Interpolate every channel between `a` and `b`.
    ///
    /// The optional acceleration channel interpolates only when both ends
    /// carry it; otherwise the earlier sample's value is kept.
    pub fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        let board_accel_fwd = match (a.board_accel_fwd, b.board_accel_fwd) {
            (Some(x), Some(y)) => Some(lerp(x, y, t)),
            (x, _) => x,
        };
        Self {
            squat_pct: lerp(a.squat_pct, b.squat_pct, t),
            lean_deg: lerp(a.lean_deg, b.lean_deg, t),
            torso_rot_deg: lerp(a.torso_rot_deg, b.torso_rot_deg, t),
            pitch_deg: lerp(a.pitch_deg, b.pitch_deg, t),
            roll_deg: lerp(a.roll_deg, b.roll_deg, t),
            slope_deg: lerp(a.slope_deg, b.slope_deg, t),
            board_accel_fwd,
        }
    }

    /// Channels in recorded-frame order
    pub fn to_channels(&self) -> Vec<f64> {
        let mut s = vec![
            self.squat_pct,
            self.lean_deg,
            self.torso_rot_deg,
            self.pitch_deg,
            self.roll_deg,
            self.slope_deg,
        ];
        if let Some(accel) = self.board_accel_fwd {
            s.push(accel);
        }
        s
    }

    /// Build a sample from recorded-frame channels.
    ///
    /// Returns `None` when fewer than the six base channels are present.
    pub fn from_channels(s: &[f64]) -> Option<Self> {
        if s.len() < BASE_CHANNEL_COUNT {
            return None;
        }
        Some(Self {
            squat_pct: s[0],
            lean_deg: s[1],
            torso_rot_deg: s[2],
            pitch_deg: s[3],
            roll_deg: s[4],
            slope_deg: s[5],
            board_accel_fwd: s.get(6).copied(),
        })
    }
}

/// Rider stance: which foot leads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Stance {
    /// Right foot forward
    #[default]
    Goofy,
    /// Left foot forward
    Regular,
}

impl Stance {
    /// Lateral mirror multiplier applied to every left/right offset
    pub fn multiplier(&self) -> f64 {
        match self {
            Stance::Goofy => 1.0,
            Stance::Regular => -1.0,
        }
    }

    pub fn from_is_goofy(is_goofy: bool) -> Self {
        if is_goofy {
            Stance::Goofy
        } else {
            Stance::Regular
        }
    }

    pub fn is_goofy(&self) -> bool {
        matches!(self, Stance::Goofy)
    }

    /// The opposite stance
    pub fn toggled(&self) -> Self {
        match self {
            Stance::Goofy => Stance::Regular,
            Stance::Regular => Stance::Goofy,
        }
    }

    /// Display name for the stance
    pub fn display_name(&self) -> &'static str {
        match self {
            Stance::Goofy => "Goofy",
            Stance::Regular => "Regular",
        }
    }
}

/// Connection status of the live telemetry link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Not connected; a reconnect may be pending
    #[default]
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Connected and receiving
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "OFFLINE"),
            ConnectionStatus::Connecting => write!(f, "Connecting..."),
            ConnectionStatus::Connected => write!(f, "LIVE"),
        }
    }
}

/// Sensor connection flags carried by live state messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImuStatus {
    pub board_connected: bool,
    pub body_connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_channels() {
        let a = TelemetrySample::new(0.0, -10.0, 0.0, 0.0, 0.0).with_slope(2.0);
        let b = TelemetrySample::new(100.0, 10.0, 20.0, 4.0, -4.0).with_slope(4.0);
        let mid = TelemetrySample::lerp(&a, &b, 0.5);
        assert_eq!(mid.squat_pct, 50.0);
        assert_eq!(mid.lean_deg, 0.0);
        assert_eq!(mid.torso_rot_deg, 10.0);
        assert_eq!(mid.pitch_deg, 2.0);
        assert_eq!(mid.roll_deg, -2.0);
        assert_eq!(mid.slope_deg, 3.0);
        assert_eq!(mid.board_accel_fwd, None);
    }

    #[test]
    fn test_lerp_accel_only_when_both_present() {
        let a = TelemetrySample::default().with_accel(1.0);
        let b = TelemetrySample::default().with_accel(3.0);
        assert_eq!(TelemetrySample::lerp(&a, &b, 0.5).board_accel_fwd, Some(2.0));

        let c = TelemetrySample::default();
        assert_eq!(TelemetrySample::lerp(&a, &c, 0.5).board_accel_fwd, Some(1.0));
        assert_eq!(TelemetrySample::lerp(&c, &a, 0.5).board_accel_fwd, None);
    }

    #[test]
    fn test_channels_round_trip() {
        let sample = TelemetrySample::new(12.5, -3.25, 7.0, 1.0, -1.0)
            .with_slope(4.5)
            .with_accel(0.75);
        let channels = sample.to_channels();
        assert_eq!(channels.len(), FULL_CHANNEL_COUNT);
        assert_eq!(TelemetrySample::from_channels(&channels), Some(sample));

        let no_accel = TelemetrySample::new(1.0, 2.0, 3.0, 4.0, 5.0);
        assert_eq!(no_accel.to_channels().len(), BASE_CHANNEL_COUNT);
        assert!(TelemetrySample::from_channels(&[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_stance() {
        assert_eq!(Stance::Goofy.multiplier(), 1.0);
        assert_eq!(Stance::Regular.multiplier(), -1.0);
        assert_eq!(Stance::from_is_goofy(false), Stance::Regular);
        assert_eq!(Stance::Regular.toggled(), Stance::Goofy);
        assert!(Stance::default().is_goofy());
    }

    #[test]
    fn test_sample_json_field_names() {
        let json = serde_json::to_value(TelemetrySample::new(1.0, 2.0, 3.0, 4.0, 5.0)).unwrap();
        assert_eq!(json["squatPct"], 1.0);
        assert_eq!(json["leanDeg"], 2.0);
        assert_eq!(json["torsoRot"], 3.0);
        assert_eq!(json["pitch"], 4.0);
        assert_eq!(json["roll"], 5.0);
        assert!(json.get("boardAccelFwd").is_none());
    }
}
