//! Playback engine driving the pose from live or recorded telemetry
//!
//! Recorded playback advances a time cursor by the wall-clock delta times
//! the speed multiplier, loops at the end of the recording and resolves the
//! sample at the cursor by linear interpolation. The frame index only moves
//! forward between seeks, so each tick costs amortized O(1).

use std::time::Duration;

use crate::config::RiderConfig;
use crate::error::{RideVisError, Result};
use crate::types::TelemetrySample;

use super::csv::CsvRecording;
use super::types::{Frame, Session};

/// Slowest playback speed
pub const MIN_SPEED: f64 = 0.1;
/// Fastest playback speed
pub const MAX_SPEED: f64 = 10.0;

/// Where the current telemetry comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    /// Nothing loaded, no live source yet
    #[default]
    Idle,
    /// Samples applied as they arrive
    Live,
    /// Replaying a CSV recording
    Csv,
    /// Replaying a stored session
    Session,
}

impl PlaybackMode {
    /// True for the CSV and session modes
    pub fn is_recorded(&self) -> bool {
        matches!(self, PlaybackMode::Csv | PlaybackMode::Session)
    }
}

/// Externally visible engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Live,
    PlayingRecorded,
    PausedRecorded,
}

impl EngineState {
    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            EngineState::Idle => "Idle",
            EngineState::Live => "Live",
            EngineState::PlayingRecorded => "Playing",
            EngineState::PausedRecorded => "Paused",
        }
    }
}

/// Session currently loaded into playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    /// Store id, if the session came from a store
    pub id: Option<String>,
    pub name: String,
}

/// Time-domain state machine over live or recorded telemetry
#[derive(Debug)]
pub struct PlaybackEngine {
    mode: PlaybackMode,
    /// Backing sequence for the recorded modes
    frames: Vec<Frame>,
    duration_ms: f64,
    /// Scan index; `frames[index].t_ms <= current_ms` once resolved
    index: usize,
    current_ms: f64,
    speed: f64,
    /// Speed applied when a session is loaded
    default_speed: f64,
    playing: bool,
    active_session: Option<ActiveSession>,
    /// Rider configuration overridden by a loaded session
    stashed: Option<RiderConfig>,
    /// Most recently applied or resolved sample
    current: Option<TelemetrySample>,
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackEngine {
    /// Create an idle engine
    pub fn new() -> Self {
        Self {
            mode: PlaybackMode::Idle,
            frames: Vec::new(),
            duration_ms: 0.0,
            index: 0,
            current_ms: 0.0,
            speed: 1.0,
            default_speed: 1.0,
            playing: false,
            active_session: None,
            stashed: None,
            current: None,
        }
    }

    /// Set the speed applied when a session is loaded
    pub fn with_default_speed(mut self, speed: f64) -> Self {
        self.default_speed = clamp_speed(speed).unwrap_or(1.0);
        self
    }

    // ==================== Queries ====================

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn state(&self) -> EngineState {
        match self.mode {
            PlaybackMode::Idle => EngineState::Idle,
            PlaybackMode::Live => EngineState::Live,
            PlaybackMode::Csv | PlaybackMode::Session if self.playing => {
                EngineState::PlayingRecorded
            }
            PlaybackMode::Csv | PlaybackMode::Session => EngineState::PausedRecorded,
        }
    }

    pub fn is_recorded(&self) -> bool {
        self.mode.is_recorded()
    }

    pub fn is_playing(&self) -> bool {
        self.is_recorded() && self.playing
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Cursor position (ms)
    pub fn current_time_ms(&self) -> f64 {
        self.current_ms
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Cursor position as a fraction of the duration
    pub fn progress(&self) -> f64 {
        if self.duration_ms > 0.0 {
            (self.current_ms / self.duration_ms).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn scan_index(&self) -> usize {
        self.index
    }

    pub fn current_sample(&self) -> Option<&TelemetrySample> {
        self.current.as_ref()
    }

    pub fn active_session(&self) -> Option<&ActiveSession> {
        self.active_session.as_ref()
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session.as_ref().and_then(|s| s.id.as_deref())
    }

    /// Rider configuration to restore when the loaded session is exited
    pub fn stashed_config_mut(&mut self) -> Option<&mut RiderConfig> {
        self.stashed.as_mut()
    }

    // ==================== Live ====================

    /// A live source connected: leave idle or CSV playback.
    ///
    /// A loaded session stays loaded.
    pub fn connect_live(&mut self) {
        match self.mode {
            PlaybackMode::Idle | PlaybackMode::Csv => {
                if self.mode == PlaybackMode::Csv {
                    tracing::info!("Live source connected, leaving CSV playback");
                }
                self.clear_track();
                self.mode = PlaybackMode::Live;
            }
            PlaybackMode::Live | PlaybackMode::Session => {}
        }
        self.playing = false;
    }

    /// Apply a live sample.
    ///
    /// Returns false, leaving the engine untouched, while recorded data is
    /// playing.
    pub fn apply_live(&mut self, sample: TelemetrySample) -> bool {
        match self.mode {
            PlaybackMode::Idle | PlaybackMode::Live => {
                self.mode = PlaybackMode::Live;
                self.current = Some(sample);
                true
            }
            PlaybackMode::Csv | PlaybackMode::Session => false,
        }
    }

    // ==================== Loading ====================

    /// Load a session, overriding `rider` with the session's snapshot.
    ///
    /// The first override stashes the caller's configuration; loading
    /// another session on top keeps that original stash.
    pub fn load_session(
        &mut self,
        session: &Session,
        id: Option<String>,
        rider: &mut RiderConfig,
    ) -> Result<()> {
        if session.frames.is_empty() {
            return Err(RideVisError::Session(format!(
                "session '{}' has no frames",
                session.meta.name
            )));
        }

        if self.stashed.is_none() {
            self.stashed = Some(*rider);
        }
        *rider = session.config.rider();

        self.frames = session.frames.clone();
        self.duration_ms = session.duration_ms();
        self.mode = PlaybackMode::Session;
        self.speed = self.default_speed;
        self.playing = true;
        self.active_session = Some(ActiveSession {
            id,
            name: session.meta.name.clone(),
        });
        self.seek(0.0);

        tracing::info!(
            "Loaded session '{}' ({} frames, {:.1}s)",
            session.meta.name,
            self.frames.len(),
            self.duration_ms / 1000.0
        );
        Ok(())
    }

    /// Load a CSV recording and start playing it.
    ///
    /// Exits a loaded session first, restoring its stashed configuration.
    pub fn load_csv(&mut self, recording: CsvRecording, rider: &mut RiderConfig) {
        self.restore_stash(rider);
        self.frames = recording.frames;
        self.duration_ms = recording.duration_ms;
        self.mode = PlaybackMode::Csv;
        self.playing = true;
        self.active_session = None;
        self.seek(0.0);
    }

    /// Leave recorded playback ("back to live").
    ///
    /// Restores the configuration a session overrode. Returns false when
    /// no recording was loaded.
    pub fn exit_to_live(&mut self, rider: &mut RiderConfig) -> bool {
        if !self.is_recorded() {
            return false;
        }
        if let Some(session) = self.active_session.take() {
            tracing::info!("Exiting session '{}'", session.name);
        }
        self.restore_stash(rider);
        self.clear_track();
        self.mode = PlaybackMode::Live;
        true
    }

    fn restore_stash(&mut self, rider: &mut RiderConfig) {
        if let Some(stashed) = self.stashed.take() {
            *rider = stashed;
        }
    }

    fn clear_track(&mut self) {
        self.frames.clear();
        self.duration_ms = 0.0;
        self.index = 0;
        self.current_ms = 0.0;
        self.playing = false;
        self.active_session = None;
    }

    // ==================== Transport ====================

    pub fn play(&mut self) {
        if self.is_recorded() {
            self.playing = true;
        }
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Toggle play/pause; returns the new playing flag
    pub fn toggle_play(&mut self) -> bool {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
        self.is_playing()
    }

    /// Set the speed multiplier for subsequent ticks.
    ///
    /// Clamped to [`MIN_SPEED`, `MAX_SPEED`]; non-finite values are ignored.
    pub fn set_speed(&mut self, speed: f64) {
        if let Some(speed) = clamp_speed(speed) {
            self.speed = speed;
        }
    }

    /// Move the cursor and resolve the sample there immediately
    pub fn seek(&mut self, t_ms: f64) -> Option<TelemetrySample> {
        if !self.is_recorded() {
            return None;
        }
        let t_ms = if t_ms.is_finite() { t_ms } else { 0.0 };
        self.current_ms = t_ms.clamp(0.0, self.duration_ms.max(0.0));
        self.index = 0;
        self.resolve()
    }

    /// Seek to a fraction of the duration
    pub fn seek_progress(&mut self, progress: f64) -> Option<TelemetrySample> {
        self.seek(progress.clamp(0.0, 1.0) * self.duration_ms)
    }

    /// Advance recorded playback by a wall-clock delta.
    ///
    /// Returns the newly resolved sample, or `None` when nothing advanced
    /// (live, idle or paused).
    pub fn tick(&mut self, delta: Duration) -> Option<TelemetrySample> {
        if !self.is_playing() || self.frames.is_empty() {
            return None;
        }

        self.current_ms += delta.as_secs_f64() * 1000.0 * self.speed;

        if self.current_ms >= self.duration_ms {
            self.current_ms = 0.0;
            self.index = 0;
        }

        self.resolve()
    }

    fn resolve(&mut self) -> Option<TelemetrySample> {
        let sample = self.sample_at(self.current_ms)?;
        self.current = Some(sample);
        Some(sample)
    }

    /// Interpolated sample at `t_ms` using the forward cursor.
    ///
    /// Times before the first or after the last frame clamp to that frame.
    /// Asking for a time behind the cursor restarts the scan.
    pub fn sample_at(&mut self, t_ms: f64) -> Option<TelemetrySample> {
        let len = self.frames.len();
        let first = self.frames.first()?;
        if len == 1 || t_ms <= first.t_ms {
            return Some(first.sample);
        }
        let last = &self.frames[len - 1];
        if t_ms >= last.t_ms {
            self.index = len - 2;
            return Some(last.sample);
        }

        if self.index > len - 2 || self.frames[self.index].t_ms > t_ms {
            self.index = 0;
        }
        while self.index < len - 2 && self.frames[self.index + 1].t_ms <= t_ms {
            self.index += 1;
        }

        let a = &self.frames[self.index];
        let b = &self.frames[self.index + 1];
        let span = b.t_ms - a.t_ms;
        let frac = if span > 0.0 {
            ((t_ms - a.t_ms) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Some(TelemetrySample::lerp(&a.sample, &b.sample, frac))
    }
}

fn clamp_speed(speed: f64) -> Option<f64> {
    speed.is_finite().then(|| speed.clamp(MIN_SPEED, MAX_SPEED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Dimensions;
    use crate::session::types::SessionConfig;
    use crate::types::Stance;
    use chrono::Utc;

    fn lean_frames(points: &[(f64, f64)]) -> Vec<Frame> {
        points
            .iter()
            .map(|&(t, lean)| Frame::new(t, TelemetrySample::new(0.0, lean, 0.0, 0.0, 0.0)))
            .collect()
    }

    fn session(points: &[(f64, f64)]) -> Session {
        let dims = Dimensions {
            torso_length: 0.5,
            ..Default::default()
        };
        Session::new(
            "test",
            Utc::now(),
            SessionConfig::from(RiderConfig::new(dims, Stance::Regular)),
            lean_frames(points),
        )
        .unwrap()
    }

    fn loaded(points: &[(f64, f64)]) -> (PlaybackEngine, RiderConfig) {
        let mut engine = PlaybackEngine::new();
        let mut rider = RiderConfig::default();
        engine
            .load_session(&session(points), Some("s1".into()), &mut rider)
            .unwrap();
        (engine, rider)
    }

    #[test]
    fn test_interpolates_between_frames() {
        let (mut engine, _) = loaded(&[(0.0, 0.0), (100.0, 10.0), (200.0, -10.0)]);
        let s = engine.tick(Duration::from_millis(50)).unwrap();
        assert!((s.lean_deg - 5.0).abs() < 1e-9);
        let s = engine.tick(Duration::from_millis(100)).unwrap();
        assert!((s.lean_deg - 0.0).abs() < 1e-9);
        assert_eq!(engine.scan_index(), 1);
    }

    #[test]
    fn test_loop_wraps_to_start() {
        let (mut engine, _) = loaded(&[(0.0, 3.0), (100.0, 10.0)]);
        let s = engine.tick(Duration::from_millis(120)).unwrap();
        assert_eq!(engine.current_time_ms(), 0.0);
        assert_eq!(engine.scan_index(), 0);
        assert_eq!(s.lean_deg, 3.0);
    }

    #[test]
    fn test_speed_scales_delta() {
        let (mut engine, _) = loaded(&[(0.0, 0.0), (1000.0, 10.0)]);
        engine.set_speed(2.0);
        engine.tick(Duration::from_millis(100));
        assert!((engine.current_time_ms() - 200.0).abs() < 1e-9);

        engine.set_speed(100.0);
        assert_eq!(engine.speed(), MAX_SPEED);
        engine.set_speed(f64::NAN);
        assert_eq!(engine.speed(), MAX_SPEED);
    }

    #[test]
    fn test_seek_resets_cursor_and_resolves() {
        let (mut engine, _) = loaded(&[(0.0, 0.0), (100.0, 10.0), (200.0, 20.0)]);
        engine.tick(Duration::from_millis(150));
        assert_eq!(engine.scan_index(), 1);

        let s = engine.seek(50.0).unwrap();
        assert!((s.lean_deg - 5.0).abs() < 1e-9);
        assert_eq!(engine.scan_index(), 0);

        engine.seek(10_000.0);
        assert_eq!(engine.current_time_ms(), 200.0);
        engine.seek(-5.0);
        assert_eq!(engine.current_time_ms(), 0.0);
    }

    #[test]
    fn test_zero_span_uses_earlier_frame() {
        let (mut engine, _) = loaded(&[(0.0, 0.0), (100.0, 4.0), (100.0, 8.0), (200.0, 8.0)]);
        let s = engine.seek(100.0).unwrap();
        assert!(s.lean_deg.is_finite());
    }

    #[test]
    fn test_clamps_outside_range() {
        let (mut engine, _) = loaded(&[(50.0, 2.0), (100.0, 4.0)]);
        assert_eq!(engine.sample_at(0.0).unwrap().lean_deg, 2.0);
        assert_eq!(engine.sample_at(500.0).unwrap().lean_deg, 4.0);
    }

    #[test]
    fn test_session_override_and_restore() {
        let mut engine = PlaybackEngine::new();
        let original = RiderConfig::default();
        let mut rider = original;
        engine
            .load_session(&session(&[(0.0, 0.0), (10.0, 1.0)]), None, &mut rider)
            .unwrap();
        assert_eq!(rider.stance, Stance::Regular);
        assert_eq!(rider.dims.torso_length, 0.5);

        // A second session keeps the first stash
        engine
            .load_session(&session(&[(0.0, 0.0), (10.0, 1.0)]), None, &mut rider)
            .unwrap();

        assert!(engine.exit_to_live(&mut rider));
        assert_eq!(rider, original);
        assert_eq!(engine.mode(), PlaybackMode::Live);
        assert!(!engine.exit_to_live(&mut rider));
    }

    #[test]
    fn test_live_samples_refused_during_playback() {
        let (mut engine, _) = loaded(&[(0.0, 0.0), (10.0, 1.0)]);
        assert!(!engine.apply_live(TelemetrySample::new(50.0, 0.0, 0.0, 0.0, 0.0)));
        assert_eq!(engine.current_sample().unwrap().squat_pct, 0.0);

        let mut live = PlaybackEngine::new();
        assert!(live.apply_live(TelemetrySample::new(50.0, 0.0, 0.0, 0.0, 0.0)));
        assert_eq!(live.state(), EngineState::Live);
        assert!(live.tick(Duration::from_millis(16)).is_none());
    }

    #[test]
    fn test_pause_stops_advancing() {
        let (mut engine, _) = loaded(&[(0.0, 0.0), (100.0, 10.0)]);
        assert!(!engine.toggle_play());
        assert_eq!(engine.state(), EngineState::PausedRecorded);
        assert!(engine.tick(Duration::from_millis(50)).is_none());
        assert_eq!(engine.current_time_ms(), 0.0);
        assert!(engine.toggle_play());
    }

    #[test]
    fn test_empty_session_rejected() {
        let mut engine = PlaybackEngine::new();
        let mut rider = RiderConfig::default();
        let mut empty = session(&[(0.0, 0.0), (10.0, 1.0)]);
        empty.frames.clear();
        assert!(engine.load_session(&empty, None, &mut rider).is_err());
        assert_eq!(engine.mode(), PlaybackMode::Idle);
        assert_eq!(rider, RiderConfig::default());
    }

    #[test]
    fn test_connect_live_leaves_csv() {
        let mut engine = PlaybackEngine::new();
        let mut rider = RiderConfig::default();
        engine.load_csv(
            CsvRecording {
                frames: lean_frames(&[(0.0, 0.0), (1000.0, 5.0)]),
                duration_ms: 1000.0,
                skipped_rows: 0,
            },
            &mut rider,
        );
        assert_eq!(engine.state(), EngineState::PlayingRecorded);
        engine.connect_live();
        assert_eq!(engine.mode(), PlaybackMode::Live);
        assert!(engine.frames().is_empty());
    }
}
