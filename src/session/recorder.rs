//! Recording buffer for capturing live telemetry into a session

use chrono::Utc;
use std::time::{Duration, Instant};

use crate::config::RiderConfig;
use crate::error::{RideVisError, Result};
use crate::types::TelemetrySample;

use super::types::{Frame, Session, SessionConfig};

/// Minimum frames for a recording to be kept
pub const MIN_RECORDING_FRAMES: usize = 2;

/// Append-only accumulator of live samples
#[derive(Debug, Default)]
pub struct RecordingBuffer {
    /// Set while recording
    started_at: Option<Instant>,
    /// Rider configuration captured at start
    config: Option<SessionConfig>,
    frames: Vec<Frame>,
    /// Auto-stop instant for timed recordings
    deadline: Option<Instant>,
    /// Requested length of a timed recording
    timed_length: Option<Duration>,
}

impl RecordingBuffer {
    /// Create an idle buffer
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Time since recording started
    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|start| start.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Length requested by [`start_timed`](Self::start_timed), if any
    pub fn timed_length(&self) -> Option<Duration> {
        self.timed_length
    }

    /// Start a new recording, snapshotting the rider configuration
    pub fn start(&mut self, rider: RiderConfig) {
        self.start_at(rider, Instant::now());
    }

    /// Start a new recording with an explicit start instant
    pub fn start_at(&mut self, rider: RiderConfig, now: Instant) {
        if self.is_recording() {
            tracing::warn!(
                "Restarting recording, discarding {} frame(s)",
                self.frames.len()
            );
        }
        self.frames.clear();
        self.config = Some(rider.into());
        self.started_at = Some(now);
        self.deadline = None;
        self.timed_length = None;
        tracing::info!("Recording started");
    }

    /// Start a recording that should stop after `length`
    pub fn start_timed(&mut self, rider: RiderConfig, length: Duration) {
        self.start_timed_at(rider, length, Instant::now());
    }

    pub fn start_timed_at(&mut self, rider: RiderConfig, length: Duration, now: Instant) {
        self.start_at(rider, now);
        self.deadline = Some(now + length);
        self.timed_length = Some(length);
        tracing::info!("Timed recording armed for {:?}", length);
    }

    /// True once a timed recording's deadline has passed
    pub fn deadline_elapsed(&self, now: Instant) -> bool {
        self.is_recording() && self.deadline.is_some_and(|d| now >= d)
    }

    /// Append a sample stamped with the time since start
    pub fn push(&mut self, sample: TelemetrySample) {
        let elapsed = self.elapsed();
        self.push_at(sample, elapsed);
    }

    /// Append a sample at `elapsed` since start, rounded to whole ms
    pub fn push_at(&mut self, sample: TelemetrySample, elapsed: Duration) {
        if !self.is_recording() {
            return;
        }
        let t_ms = (elapsed.as_secs_f64() * 1000.0).round();
        // Keep the sequence monotonic even if a caller passes an older instant
        let t_ms = self.frames.last().map_or(t_ms, |last| t_ms.max(last.t_ms));
        self.frames.push(Frame::new(t_ms, sample));
    }

    /// Finish recording.
    ///
    /// Clears any timed deadline. Fewer than two frames are discarded and
    /// reported as [`RideVisError::RecordingTooShort`].
    pub fn stop(&mut self) -> Result<Session> {
        let config = self.config.take();
        let was_recording = self.started_at.take().is_some();
        self.deadline = None;
        self.timed_length = None;
        let frames = std::mem::take(&mut self.frames);

        let Some(config) = config.filter(|_| was_recording) else {
            return Err(RideVisError::Session("no recording in progress".to_string()));
        };

        if frames.len() < MIN_RECORDING_FRAMES {
            tracing::warn!("Recording too short ({} frame(s)), discarding", frames.len());
            return Err(RideVisError::RecordingTooShort {
                frames: frames.len(),
            });
        }

        let session = Session::new(String::new(), Utc::now(), config, frames)?;
        tracing::info!(
            "Recording stopped: {} frames, {:.1}s",
            session.meta.frame_count,
            session.meta.duration_ms / 1000.0
        );
        Ok(session)
    }

    /// Abandon the recording without producing a session
    pub fn cancel(&mut self) {
        if self.is_recording() {
            tracing::info!("Recording cancelled");
        }
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Dimensions;
    use crate::types::Stance;

    fn rider() -> RiderConfig {
        RiderConfig::new(Dimensions::default(), Stance::Regular)
    }

    #[test]
    fn test_push_ignored_when_idle() {
        let mut buffer = RecordingBuffer::new();
        buffer.push_at(TelemetrySample::default(), Duration::from_millis(5));
        assert_eq!(buffer.frame_count(), 0);
    }

    #[test]
    fn test_stop_builds_session() {
        let mut buffer = RecordingBuffer::new();
        buffer.start(rider());
        buffer.push_at(TelemetrySample::default(), Duration::from_micros(400));
        buffer.push_at(TelemetrySample::default(), Duration::from_micros(33_600));
        let session = buffer.stop().unwrap();
        assert_eq!(session.frames[0].t_ms, 0.0);
        assert_eq!(session.frames[1].t_ms, 34.0);
        assert_eq!(session.meta.duration_ms, 34.0);
        assert!(!session.config.is_goofy);
        assert!(!buffer.is_recording());
    }

    #[test]
    fn test_too_short_is_discarded() {
        let mut buffer = RecordingBuffer::new();
        buffer.start(rider());
        buffer.push_at(TelemetrySample::default(), Duration::ZERO);
        assert!(matches!(
            buffer.stop(),
            Err(RideVisError::RecordingTooShort { frames: 1 })
        ));
        assert_eq!(buffer.frame_count(), 0);
    }

    #[test]
    fn test_stop_without_start() {
        let mut buffer = RecordingBuffer::new();
        assert!(matches!(buffer.stop(), Err(RideVisError::Session(_))));
    }

    #[test]
    fn test_timed_deadline() {
        let now = Instant::now();
        let mut buffer = RecordingBuffer::new();
        buffer.start_timed_at(rider(), Duration::from_secs(10), now);
        assert!(!buffer.deadline_elapsed(now + Duration::from_secs(9)));
        assert!(buffer.deadline_elapsed(now + Duration::from_secs(10)));
        assert_eq!(buffer.timed_length(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_manual_stop_clears_deadline() {
        let now = Instant::now();
        let mut buffer = RecordingBuffer::new();
        buffer.start_timed_at(rider(), Duration::from_secs(10), now);
        let _ = buffer.stop();
        assert!(!buffer.deadline_elapsed(now + Duration::from_secs(60)));
        assert_eq!(buffer.timed_length(), None);
    }

    #[test]
    fn test_restart_discards_frames() {
        let mut buffer = RecordingBuffer::new();
        buffer.start(rider());
        buffer.push_at(TelemetrySample::default(), Duration::ZERO);
        buffer.start(rider());
        assert_eq!(buffer.frame_count(), 0);
    }
}
