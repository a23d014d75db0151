//! Carve classification and the heading indicator.
//!
//! Classification is a pure sign test on lean with no hysteresis band, so
//! the label can flicker while the board hovers around flat.

use nalgebra::Point3;

use super::edge_norm;
use crate::types::Stance;

/// Points in the heading indicator polyline
pub const FLOW_PATH_POINTS: usize = 31;
/// Length of the heading indicator along the travel axis (m)
pub const FLOW_PATH_LENGTH: f64 = 1.2;
/// Distance ahead of the board centre where the indicator starts (m)
pub const FLOW_PATH_START: f64 = 0.5;
/// Lateral bend at full edge, as a fraction of the path length
pub const FLOW_PATH_CURVATURE: f64 = 0.8;

/// Segments in the replay trail ribbon
pub const TRAIL_SEGMENTS: usize = 30;
/// Length of the trail behind the board (m)
pub const TRAIL_LENGTH: f64 = 2.0;
/// Distance behind the board centre where the trail starts (m)
pub const TRAIL_START: f64 = 0.2;
/// Ground edge lift, keeps the ribbon off the grid
const TRAIL_GROUND_Z: f64 = 0.005;

/// True when the board is on its positive-lean edge
pub fn is_toeside(lean_deg: f64) -> bool {
    lean_deg > 0.0
}

/// Physical turn direction, independent of stance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
    Straight,
}

impl TurnDirection {
    pub fn display_name(&self) -> &'static str {
        match self {
            TurnDirection::Left => "TURNING LEFT",
            TurnDirection::Right => "TURNING RIGHT",
            TurnDirection::Straight => "STRAIGHT",
        }
    }
}

/// Which edge carries the board, relative to the rider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Toeside,
    Heelside,
}

impl Edge {
    pub fn display_name(&self) -> &'static str {
        match self {
            Edge::Toeside => "TOESIDE",
            Edge::Heelside => "HEELSIDE",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self {
            Edge::Toeside => "Toe Edge",
            Edge::Heelside => "Heel Edge",
        }
    }
}

/// Carve label for the telemetry card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarveState {
    pub direction: TurnDirection,
    /// `None` while the board is flat
    pub edge: Option<Edge>,
}

impl CarveState {
    /// Classify a lean reading.
    ///
    /// Positive lean (left edge down) turns left; it is the toe edge for a
    /// goofy rider and the heel edge for a regular one.
    pub fn classify(lean_deg: f64, stance: Stance) -> Self {
        let (positive, negative) = match stance {
            Stance::Goofy => (Edge::Toeside, Edge::Heelside),
            Stance::Regular => (Edge::Heelside, Edge::Toeside),
        };
        if lean_deg > 0.0 {
            Self {
                direction: TurnDirection::Left,
                edge: Some(positive),
            }
        } else if lean_deg < 0.0 {
            Self {
                direction: TurnDirection::Right,
                edge: Some(negative),
            }
        } else {
            Self {
                direction: TurnDirection::Straight,
                edge: None,
            }
        }
    }

    pub fn subtitle(&self) -> &'static str {
        self.edge.map(|e| e.subtitle()).unwrap_or("Flat Board")
    }
}

/// Curved heading indicator drawn on the ground ahead of the board.
///
/// Bends toward the turn: positive lean bends toward -X.
pub fn flow_path(lean_deg: f64, max_lean_deg: f64) -> Vec<Point3<f64>> {
    let curvature = edge_norm(lean_deg, max_lean_deg) * FLOW_PATH_CURVATURE;
    let steps = FLOW_PATH_POINTS - 1;
    (0..FLOW_PATH_POINTS)
        .map(|i| {
            let t = i as f64 / steps as f64;
            let y = FLOW_PATH_START + t * FLOW_PATH_LENGTH;
            let x = -curvature * t * t * FLOW_PATH_LENGTH;
            Point3::new(x, y, 0.01)
        })
        .collect()
}

/// One cross-section of the trail ribbon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    /// Edge on the ground
    pub ground: Point3<f64>,
    /// Edge at hip height, leaned with the board
    pub top: Point3<f64>,
    /// 1 at the board, fading to 0 at the tail
    pub alpha: f64,
}

/// Ribbon left behind the rider during replay.
///
/// Curves opposite to the heading indicator since it trails the board.
pub fn trail_ribbon(lean_deg: f64, hip_height: f64, max_lean_deg: f64) -> Vec<TrailPoint> {
    let curvature = edge_norm(lean_deg, max_lean_deg) * FLOW_PATH_CURVATURE;
    let lean = lean_deg.to_radians();
    let lean_offset = -lean.sin() * hip_height;
    let top_z = lean.cos() * hip_height;
    (0..=TRAIL_SEGMENTS)
        .map(|i| {
            let t = i as f64 / TRAIL_SEGMENTS as f64;
            let y = -TRAIL_START - t * TRAIL_LENGTH;
            let x = curvature * t * t * TRAIL_LENGTH;
            TrailPoint {
                ground: Point3::new(x, y, TRAIL_GROUND_Z),
                top: Point3::new(x + lean_offset, y, top_z),
                alpha: 1.0 - t,
            }
        })
        .collect()
}
