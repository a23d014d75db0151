//! Tick-loop controller
//!
//! [`RideController`] ties the pieces together on the UI thread: it drains
//! link events, feeds the playback engine and recording buffer, runs the
//! solver once per tick and forwards user actions to the telemetry source.
//! All mutable viewer state lives here; nothing is global.

use chrono::Local;
use nalgebra::Point3;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::analysis::{compute_metrics, SessionMetrics};
use crate::backend::{ConfigMessage, LinkEvent, LinkRequest, StateMessage, TelemetrySource};
use crate::config::{AnalyticsConfig, AppConfig, RiderConfig};
use crate::error::Result;
use crate::pose::{self, CarveState, Pose, TrailPoint};
use crate::session::{self, PlaybackEngine, RecordingBuffer, Session, SessionSummary};
use crate::types::{ConnectionStatus, ImuStatus, Stance, TelemetrySample};

/// Timed recording presets offered by the viewer (seconds)
pub const TIMED_RECORDING_PRESETS: [u64; 2] = [10, 30];

/// How long the calibrating indicator stays up after a calibrate request
pub const CALIBRATION_DISPLAY: Duration = Duration::from_secs(6);

/// A stopped recording with its analytics
#[derive(Debug, Clone)]
pub struct FinishedRecording {
    /// The session, metrics attached
    pub session: Session,
    /// `None` when the recording was too uniform to analyze
    pub metrics: Option<SessionMetrics>,
}

/// Default name for a manually saved recording
pub fn default_session_name() -> String {
    Local::now().format("%Y-%m-%d %H-%M-%S").to_string()
}

/// Viewer state and tick loop
pub struct RideController {
    source: Box<dyn TelemetrySource>,
    rider: RiderConfig,
    analytics: AnalyticsConfig,
    engine: PlaybackEngine,
    recorder: RecordingBuffer,
    /// Latest live sample (sticky channels carried forward)
    live_sample: TelemetrySample,
    pose: Pose,
    sessions: Vec<SessionSummary>,
    /// Full copy of the session loaded into playback
    loaded_session: Option<Session>,
    connection: ConnectionStatus,
    /// Whether the user wants the live link on
    live_enabled: bool,
    calibrating_until: Option<Instant>,
    imu: ImuStatus,
    last_metrics: Option<SessionMetrics>,
    last_error: Option<String>,
}

impl RideController {
    pub fn new(source: Box<dyn TelemetrySource>, config: &AppConfig) -> Self {
        let rider = config.rider;
        let live_sample = TelemetrySample::default();
        Self {
            source,
            rider,
            analytics: config.analytics,
            engine: PlaybackEngine::new().with_default_speed(config.playback.default_speed),
            recorder: RecordingBuffer::new(),
            live_sample,
            pose: pose::solve(&live_sample, &rider.dims, rider.stance),
            sessions: Vec::new(),
            loaded_session: None,
            connection: ConnectionStatus::Disconnected,
            live_enabled: config.link.enabled,
            calibrating_until: None,
            imu: ImuStatus::default(),
            last_metrics: None,
            last_error: None,
        }
    }

    // ==================== Accessors ====================

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Configuration currently driving the solver
    pub fn rider(&self) -> &RiderConfig {
        &self.rider
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn recorder(&self) -> &RecordingBuffer {
        &self.recorder
    }

    pub fn sessions(&self) -> &[SessionSummary] {
        &self.sessions
    }

    pub fn loaded_session(&self) -> Option<&Session> {
        self.loaded_session.as_ref()
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn imu(&self) -> ImuStatus {
        self.imu
    }

    pub fn live_enabled(&self) -> bool {
        self.live_enabled
    }

    /// True while a recent calibrate request is still settling
    pub fn is_calibrating(&self, now: Instant) -> bool {
        self.connection == ConnectionStatus::Connected
            && self.calibrating_until.is_some_and(|until| now < until)
    }

    /// Sliders drive the pose only in live mode without a connection
    pub fn manual_posing(&self) -> bool {
        !self.engine.is_recorded() && self.connection != ConnectionStatus::Connected
    }

    pub fn last_metrics(&self) -> Option<&SessionMetrics> {
        self.last_metrics.as_ref()
    }

    /// Take the most recent error for display
    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    /// Sample the pose is solved from
    pub fn current_sample(&self) -> TelemetrySample {
        if self.engine.is_recorded() {
            self.engine
                .current_sample()
                .copied()
                .unwrap_or(self.live_sample)
        } else {
            self.live_sample
        }
    }

    pub fn carve(&self) -> CarveState {
        CarveState::classify(self.current_sample().lean_deg, self.rider.stance)
    }

    pub fn flow_path(&self) -> Vec<Point3<f64>> {
        pose::flow_path(self.current_sample().lean_deg, self.rider.dims.max_lean_deg)
    }

    /// Fading ribbon behind the board, only while replaying a stored session
    pub fn trail(&self) -> Option<Vec<TrailPoint>> {
        if self.engine.active_session().is_none() {
            return None;
        }
        let sample = self.current_sample();
        Some(pose::trail_ribbon(
            sample.lean_deg,
            pose::hip_height(sample.squat_pct, &self.rider.dims),
            self.rider.dims.max_lean_deg,
        ))
    }

    fn resolve_pose(&mut self) {
        let sample = self.current_sample();
        self.pose = pose::solve(&sample, &self.rider.dims, self.rider.stance);
    }

    fn send(&mut self, request: LinkRequest) -> bool {
        let action = request.action();
        let sent = self.source.send(request);
        if !sent {
            tracing::warn!("Request '{}' could not be sent", action);
        }
        sent
    }

    fn report(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.last_error = Some(message);
    }

    // ==================== Events ====================

    /// Drain and handle every pending event; returns how many were handled
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.source.poll_event() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub fn handle_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Status(status) => self.handle_status(status),
            LinkEvent::Config(config) => self.handle_config(&config),
            LinkEvent::State(state) => self.handle_state(&state),
            LinkEvent::SessionSaved { id } => {
                tracing::info!("Session saved ({})", id.as_deref().unwrap_or("no id"));
                self.request_sessions();
            }
            LinkEvent::SessionDeleted { id } => {
                tracing::info!("Session deleted ({})", id.as_deref().unwrap_or("no id"));
                self.request_sessions();
            }
            LinkEvent::SessionList(sessions) => {
                tracing::debug!("Received {} session summaries", sessions.len());
                self.sessions = sessions;
            }
            LinkEvent::SessionData { session, id } => {
                if let Err(e) = self.play_session(*session, id) {
                    self.report(format!("Failed to load session: {}", e));
                }
            }
            LinkEvent::Error(message) => self.report(message),
        }
    }

    fn handle_status(&mut self, status: ConnectionStatus) {
        tracing::info!("Link status: {}", status);
        self.connection = status;
        if status == ConnectionStatus::Connected {
            self.engine.connect_live();
            self.request_sessions();
        }
    }

    /// Apply a config update to the live configuration, which is the
    /// stashed one while a session overrides it
    fn handle_config(&mut self, message: &ConfigMessage) {
        let target = match self.engine.stashed_config_mut() {
            Some(stashed) => stashed,
            None => &mut self.rider,
        };

        let mut updated = *target;
        if let Some(dims) = &message.dims {
            updated.dims.apply_update(dims);
        }
        if let Some(max_lean) = message.ranges.and_then(|r| r.max_lean_deg) {
            updated.dims.max_lean_deg = max_lean;
        }
        if let Some(is_goofy) = message.is_goofy {
            updated.stance = Stance::from_is_goofy(is_goofy);
        }

        match updated.dims.validate() {
            Ok(()) => {
                *target = updated;
                tracing::debug!("Applied config update");
            }
            Err(e) => {
                let message = format!("Rejected config update: {}", e);
                self.report(message);
            }
        }
    }

    fn handle_state(&mut self, state: &StateMessage) {
        if self.engine.is_recorded() {
            return;
        }

        let sample = state.merge_into(&self.live_sample);
        self.live_sample = sample;
        if let Some(is_goofy) = state.is_goofy {
            self.rider.stance = Stance::from_is_goofy(is_goofy);
        }
        if let Some(imu) = state.imu_status() {
            self.imu = imu;
        }
        self.engine.apply_live(sample);
        if self.recorder.is_recording() {
            self.recorder.push(sample);
        }
    }

    // ==================== Tick ====================

    /// Advance one frame.
    ///
    /// Fires an expired timed recording (saved under `"<n>s recording"`),
    /// advances playback and re-solves the pose. Returns the timed
    /// recording if one finished on this tick.
    pub fn tick(&mut self, delta: Duration, now: Instant) -> Option<FinishedRecording> {
        let finished = if self.recorder.deadline_elapsed(now) {
            self.finish_timed_recording()
        } else {
            None
        };

        self.engine.tick(delta);
        self.resolve_pose();
        finished
    }

    fn finish_timed_recording(&mut self) -> Option<FinishedRecording> {
        let secs = self
            .recorder
            .timed_length()
            .map(|d| d.as_secs())
            .unwrap_or_default();
        match self.stop_recording() {
            Ok(finished) => {
                self.save_session(finished.session.clone(), &format!("{}s recording", secs));
                Some(finished)
            }
            Err(e) => {
                self.report(format!("Timed recording discarded: {}", e));
                None
            }
        }
    }

    // ==================== Recording ====================

    pub fn start_recording(&mut self) {
        self.recorder.start(self.rider);
    }

    pub fn start_timed_recording(&mut self, secs: u64) {
        self.recorder
            .start_timed(self.rider, Duration::from_secs(secs));
    }

    /// Stop recording and compute the session's metrics
    pub fn stop_recording(&mut self) -> Result<FinishedRecording> {
        let mut session = self.recorder.stop()?;
        let metrics = compute_metrics(&session, &self.analytics);
        session.metrics = metrics.clone();
        self.last_metrics = metrics.clone();
        Ok(FinishedRecording { session, metrics })
    }

    /// Abandon the running recording
    pub fn cancel_recording(&mut self) {
        self.recorder.cancel();
    }

    // ==================== Sessions ====================

    /// Name and send a session for storage; an empty name gets a dated default
    pub fn save_session(&mut self, mut session: Session, name: &str) -> bool {
        let name = name.trim();
        session.meta.name = if name.is_empty() {
            default_session_name()
        } else {
            name.to_string()
        };
        tracing::info!("Saving session '{}'", session.meta.name);
        self.send(LinkRequest::SaveSession {
            session: Box::new(session),
        })
    }

    pub fn request_sessions(&mut self) -> bool {
        self.send(LinkRequest::ListSessions)
    }

    /// Ask the source for a stored session; playback starts when it arrives
    pub fn load_session(&mut self, id: &str) -> bool {
        self.send(LinkRequest::LoadSession { id: id.to_string() })
    }

    /// Delete a stored session, leaving playback first if it is the active one
    pub fn delete_session(&mut self, id: &str) -> bool {
        if self.engine.active_session_id() == Some(id) {
            self.back_to_live();
        }
        self.send(LinkRequest::DeleteSession { id: id.to_string() })
    }

    /// Start playing a session already in memory
    pub fn play_session(&mut self, session: Session, id: Option<String>) -> Result<()> {
        self.engine.load_session(&session, id, &mut self.rider)?;
        self.loaded_session = Some(session);
        self.resolve_pose();
        Ok(())
    }

    /// Import a session JSON file into playback
    pub fn open_session_file(&mut self, path: &Path) -> Result<()> {
        let session = Session::load_from_file(path)?;
        self.play_session(session, None)
    }

    /// Open a CSV recording into playback
    pub fn load_csv(&mut self, path: &Path) -> Result<()> {
        let recording = session::load_csv(path)?;
        self.engine.load_csv(recording, &mut self.rider);
        self.loaded_session = None;
        self.resolve_pose();
        Ok(())
    }

    /// Leave recorded playback and restore the live configuration
    pub fn back_to_live(&mut self) {
        if self.engine.exit_to_live(&mut self.rider) {
            self.loaded_session = None;
            self.resolve_pose();
        }
    }

    // ==================== Transport ====================

    pub fn seek(&mut self, t_ms: f64) {
        if self.engine.seek(t_ms).is_some() {
            self.resolve_pose();
        }
    }

    pub fn seek_progress(&mut self, progress: f64) {
        if self.engine.seek_progress(progress).is_some() {
            self.resolve_pose();
        }
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.engine.set_speed(speed);
    }

    pub fn toggle_play(&mut self) -> bool {
        self.engine.toggle_play()
    }

    // ==================== Rider ====================

    /// Change stance locally and tell the source.
    ///
    /// While a session overrides the configuration the change also lands in
    /// the stashed live configuration.
    pub fn set_stance(&mut self, stance: Stance) -> bool {
        self.rider.stance = stance;
        if let Some(stashed) = self.engine.stashed_config_mut() {
            stashed.stance = stance;
        }
        self.resolve_pose();
        self.send(LinkRequest::SetStance {
            is_goofy: stance.is_goofy(),
        })
    }

    pub fn toggle_stance(&mut self) -> bool {
        self.set_stance(self.rider.stance.toggled())
    }

    /// Ask the source to zero its sensors; the indicator shows while connected
    pub fn calibrate(&mut self) -> bool {
        let sent = self.send(LinkRequest::Calibrate);
        if sent {
            self.calibrating_until = Some(Instant::now() + CALIBRATION_DISPLAY);
        }
        sent
    }

    // ==================== Live Link ====================

    /// Turn the live link on or off.
    ///
    /// Turning it off drops the connection and stops reconnecting; the
    /// last live sample stays on screen for manual posing.
    pub fn set_live_enabled(&mut self, enabled: bool) -> bool {
        if !self.source.set_live(enabled) {
            self.report(format!(
                "Could not turn the live link {}",
                if enabled { "on" } else { "off" }
            ));
            return false;
        }
        tracing::info!("Live link {}", if enabled { "enabled" } else { "disabled" });
        self.live_enabled = enabled;
        if !enabled {
            self.connection = ConnectionStatus::Disconnected;
            self.imu = ImuStatus::default();
            self.calibrating_until = None;
        }
        true
    }

    // ==================== Manual Posing ====================

    /// Pose the rider by hand.
    ///
    /// Ignored while recorded data plays or a live feed is connected.
    pub fn set_manual_sample(&mut self, sample: TelemetrySample) -> bool {
        if !self.manual_posing() {
            return false;
        }
        self.live_sample = sample;
        self.engine.apply_live(sample);
        self.resolve_pose();
        true
    }

    /// Return every manual channel to neutral
    pub fn reset_manual_sample(&mut self) -> bool {
        self.set_manual_sample(TelemetrySample::default())
    }
}
