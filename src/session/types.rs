//! Session data types
//!
//! A [`Session`] serializes to the record format shared with the live
//! server:
//!
//! ```json
//! {
//!   "version": 1,
//!   "meta": { "name": "...", "createdAt": "...", "durationMs": 1234, "frameCount": 40 },
//!   "config": { "dims": { ... }, "isGoofy": true },
//!   "frames": [ { "t": 0, "s": [squat, lean, torsoRot, pitch, roll, slope, accel?] } ],
//!   "metrics": { ... }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analysis::SessionMetrics;
use crate::config::{Dimensions, RiderConfig};
use crate::error::{RideVisError, Result, ResultExt};
use crate::types::{Stance, TelemetrySample};

/// Record format version written by this crate
pub const SESSION_FORMAT_VERSION: u32 = 1;

/// One timestamped telemetry sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireFrame", try_from = "WireFrame")]
pub struct Frame {
    /// Offset from the start of the recording (ms)
    pub t_ms: f64,
    pub sample: TelemetrySample,
}

impl Frame {
    pub fn new(t_ms: f64, sample: TelemetrySample) -> Self {
        Self { t_ms, sample }
    }
}

/// Compact on-disk frame: `{t, s: [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFrame {
    t: f64,
    s: Vec<f64>,
}

impl From<Frame> for WireFrame {
    fn from(frame: Frame) -> Self {
        Self {
            t: frame.t_ms,
            s: frame.sample.to_channels(),
        }
    }
}

impl TryFrom<WireFrame> for Frame {
    type Error = RideVisError;

    fn try_from(wire: WireFrame) -> Result<Self> {
        let sample = TelemetrySample::from_channels(&wire.s).ok_or_else(|| {
            RideVisError::Session(format!(
                "frame at t={} has {} channel(s), expected at least 6",
                wire.t,
                wire.s.len()
            ))
        })?;
        Ok(Self {
            t_ms: wire.t,
            sample,
        })
    }
}

/// Descriptive metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last frame (ms)
    pub duration_ms: f64,
    pub frame_count: usize,
}

/// Rider configuration captured when recording started
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default)]
    pub dims: Dimensions,
    #[serde(default = "default_is_goofy")]
    pub is_goofy: bool,
}

fn default_is_goofy() -> bool {
    true
}

impl SessionConfig {
    pub fn stance(&self) -> Stance {
        Stance::from_is_goofy(self.is_goofy)
    }

    pub fn rider(&self) -> RiderConfig {
        RiderConfig::new(self.dims, self.stance())
    }
}

impl From<RiderConfig> for SessionConfig {
    fn from(rider: RiderConfig) -> Self {
        Self {
            dims: rider.dims,
            is_goofy: rider.stance.is_goofy(),
        }
    }
}

/// A finalized recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default = "default_version")]
    pub version: u32,
    pub meta: SessionMeta,
    pub config: SessionConfig,
    pub frames: Vec<Frame>,
    /// Computed once after recording stops
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SessionMetrics>,
}

fn default_version() -> u32 {
    SESSION_FORMAT_VERSION
}

impl Session {
    /// Build a session from frames, filling in duration and frame count.
    ///
    /// Fails if the frames are not sorted by time.
    pub fn new(
        name: impl Into<String>,
        created_at: DateTime<Utc>,
        config: SessionConfig,
        frames: Vec<Frame>,
    ) -> Result<Self> {
        let mut session = Self {
            version: SESSION_FORMAT_VERSION,
            meta: SessionMeta {
                name: name.into(),
                created_at,
                duration_ms: 0.0,
                frame_count: 0,
            },
            config,
            frames,
            metrics: None,
        };
        session.check_order()?;
        session.finalize();
        Ok(session)
    }

    /// Duration in milliseconds (last frame's timestamp)
    pub fn duration_ms(&self) -> f64 {
        self.frames.last().map(|f| f.t_ms).unwrap_or(0.0)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Iterate the samples without timestamps
    pub fn samples(&self) -> impl Iterator<Item = &TelemetrySample> {
        self.frames.iter().map(|f| &f.sample)
    }

    /// Recompute duration and frame count from the frames
    pub fn finalize(&mut self) {
        self.meta.duration_ms = self.duration_ms();
        self.meta.frame_count = self.frames.len();
    }

    fn check_order(&self) -> Result<()> {
        if let Some(bad) = self
            .frames
            .iter()
            .find(|f| !f.t_ms.is_finite())
        {
            return Err(RideVisError::Session(format!(
                "non-finite frame timestamp {}",
                bad.t_ms
            )));
        }
        if let Some(idx) = self
            .frames
            .windows(2)
            .position(|w| w[1].t_ms < w[0].t_ms)
        {
            return Err(RideVisError::Session(format!(
                "frames out of order at index {} ({} ms after {} ms)",
                idx + 1,
                self.frames[idx + 1].t_ms,
                self.frames[idx].t_ms
            )));
        }
        Ok(())
    }

    /// Check ordering and repair metadata that disagrees with the frames
    pub fn validate(&mut self) -> Result<()> {
        self.check_order()?;
        if self.meta.frame_count != self.frames.len()
            || self.meta.duration_ms != self.duration_ms()
        {
            tracing::warn!(
                "Session '{}' metadata disagrees with its frames, recomputing",
                self.meta.name
            );
            self.finalize();
        }
        Ok(())
    }

    /// Parse and validate a session from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let mut session: Self = serde_json::from_str(json)?;
        session.validate()?;
        Ok(session)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Save session to a file (pretty JSON)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write session {:?}", path))
    }

    /// Load session from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session {:?}", path))?;
        Self::from_json(&json).with_context(|| format!("Invalid session file {:?}", path))
    }
}

/// Listing entry returned by a session store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub meta: SessionMeta,
}
