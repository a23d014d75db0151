//! Wire protocol for the live telemetry link
//!
//! Newline-delimited JSON, one object per line. Messages from the server
//! carry a `"type"` tag, requests from the viewer an `"action"` tag:
//!
//! ```text
//! <- {"type":"state","squatPct":30,"leanDeg":-4.5,"torsoRot":12,"pitch":3,"roll":-1,"boardConnected":true,"bodyConnected":true}
//! <- {"type":"config","dims":{"torsoLength":0.62},"ranges":{"maxLeanDeg":25},"isGoofy":false}
//! -> {"action":"set_stance","isGoofy":true}
//! -> {"action":"list_sessions"}
//! ```

use serde::{Deserialize, Serialize};

use crate::config::DimensionsUpdate;
use crate::error::Result;
use crate::session::{Session, SessionSummary};
use crate::types::{ImuStatus, TelemetrySample};

/// Lean range carried by config messages
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangesUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lean_deg: Option<f64>,
}

/// Partial rider configuration pushed by the server
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dims: Option<DimensionsUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranges: Option<RangesUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_goofy: Option<bool>,
}

/// One live telemetry reading with optional extras
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMessage {
    #[serde(default)]
    pub squat_pct: f64,
    #[serde(default)]
    pub lean_deg: f64,
    #[serde(default)]
    pub torso_rot: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub roll: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_accel_fwd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_goofy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_connected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_connected: Option<bool>,
}

impl StateMessage {
    /// Build the applied sample.
    ///
    /// Slope and acceleration are sticky: when a message omits them the
    /// previous sample's values carry over.
    pub fn merge_into(&self, previous: &TelemetrySample) -> TelemetrySample {
        TelemetrySample {
            squat_pct: self.squat_pct,
            lean_deg: self.lean_deg,
            torso_rot_deg: self.torso_rot,
            pitch_deg: self.pitch,
            roll_deg: self.roll,
            slope_deg: self.slope_deg.unwrap_or(previous.slope_deg),
            board_accel_fwd: self.board_accel_fwd.or(previous.board_accel_fwd),
        }
    }

    /// Sensor flags, when the message reports them
    pub fn imu_status(&self) -> Option<ImuStatus> {
        self.board_connected.map(|board_connected| ImuStatus {
            board_connected,
            body_connected: self.body_connected.unwrap_or(false),
        })
    }
}

impl From<&TelemetrySample> for StateMessage {
    fn from(sample: &TelemetrySample) -> Self {
        Self {
            squat_pct: sample.squat_pct,
            lean_deg: sample.lean_deg,
            torso_rot: sample.torso_rot_deg,
            pitch: sample.pitch_deg,
            roll: sample.roll_deg,
            slope_deg: Some(sample.slope_deg),
            board_accel_fwd: sample.board_accel_fwd,
            ..Default::default()
        }
    }
}

/// Server-to-viewer messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Config(ConfigMessage),
    State(StateMessage),
    SessionSaved {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    SessionList {
        #[serde(default)]
        sessions: Vec<SessionSummary>,
    },
    SessionData {
        session: Box<Session>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    SessionDeleted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
}

/// Viewer-to-server requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LinkRequest {
    SetStance {
        #[serde(rename = "isGoofy")]
        is_goofy: bool,
    },
    Calibrate,
    SaveSession {
        session: Box<Session>,
    },
    ListSessions,
    LoadSession {
        id: String,
    },
    DeleteSession {
        id: String,
    },
}

impl LinkRequest {
    /// Wire action name, for logging
    pub fn action(&self) -> &'static str {
        match self {
            LinkRequest::SetStance { .. } => "set_stance",
            LinkRequest::Calibrate => "calibrate",
            LinkRequest::SaveSession { .. } => "save_session",
            LinkRequest::ListSessions => "list_sessions",
            LinkRequest::LoadSession { .. } => "load_session",
            LinkRequest::DeleteSession { .. } => "delete_session",
        }
    }
}

/// Serialize a message as one newline-terminated line
pub fn encode_line<T: Serialize>(message: &T) -> Result<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Parse one inbound line; session payloads are validated
pub fn decode_inbound(line: &str) -> Result<InboundMessage> {
    let mut message: InboundMessage = serde_json::from_str(line.trim())?;
    if let InboundMessage::SessionData { session, .. } = &mut message {
        session.validate()?;
    }
    Ok(message)
}

/// Parse one request line (server side and tests)
pub fn decode_request(line: &str) -> Result<LinkRequest> {
    Ok(serde_json::from_str(line.trim())?)
}
