//! Action and dialog state types for the frontend
//!
//! Panels never touch the controller directly: they return `AppAction`s
//! which the app applies after the frame's widgets are laid out.

use std::path::PathBuf;

use crate::controller::FinishedRecording;
use crate::types::{Stance, TelemetrySample};

/// Actions that any panel can emit
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    // Recording
    StartRecording,
    /// Timed recording, saved automatically when the timer runs out
    StartTimedRecording(u64),
    StopRecording,

    // Transport
    TogglePlay,
    /// Seek to a fraction of the loaded recording
    SeekProgress(f64),
    SetSpeed(f64),
    BackToLive,

    // Sessions
    RefreshSessions,
    PlaySession(String),
    DeleteSession(String),

    // Rider
    SetStance(Stance),
    Calibrate,
    /// Pose the rider from the sliders while no feed is connected
    SetManualSample(TelemetrySample),
    ResetManualSample,

    // Link
    SetLive(bool),

    // Files
    OpenCsv(PathBuf),
    ImportSession(PathBuf),
    ExportSession(PathBuf),
}

/// Summary window shown after a manual stop
#[derive(Debug, Clone)]
pub struct SummaryState {
    pub recording: FinishedRecording,
    /// Name typed by the user; empty saves under a dated default
    pub name: String,
}

impl SummaryState {
    pub fn new(recording: FinishedRecording) -> Self {
        Self {
            recording,
            name: String::new(),
        }
    }
}

/// Outcome of the summary window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryAction {
    Save,
    Discard,
}
