//! Test data builders for creating test objects

use chrono::{TimeZone, Utc};
use ridevis_rs::config::{Dimensions, RiderConfig};
use ridevis_rs::session::{Frame, Session, SessionConfig};
use ridevis_rs::types::{Stance, TelemetrySample};

/// Builder for recorded sessions at a fixed frame interval
pub struct SessionBuilder {
    name: String,
    interval_ms: f64,
    rider: RiderConfig,
    minute: u32,
    samples: Vec<TelemetrySample>,
}

impl SessionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            interval_ms: 100.0,
            rider: RiderConfig::default(),
            minute: 0,
            samples: Vec::new(),
        }
    }

    pub fn interval_ms(mut self, interval_ms: f64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn stance(mut self, stance: Stance) -> Self {
        self.rider.stance = stance;
        self
    }

    pub fn dims(mut self, dims: Dimensions) -> Self {
        self.rider.dims = dims;
        self
    }

    /// Creation time offset, for ordering tests
    pub fn minute(mut self, minute: u32) -> Self {
        self.minute = minute;
        self
    }

    pub fn sample(mut self, sample: TelemetrySample) -> Self {
        self.samples.push(sample);
        self
    }

    /// One frame per `(squat, lean)` pair
    pub fn leans(mut self, pairs: &[(f64, f64)]) -> Self {
        self.samples.extend(
            pairs
                .iter()
                .map(|&(squat, lean)| TelemetrySample::new(squat, lean, 0.0, 0.0, 0.0)),
        );
        self
    }

    pub fn build(self) -> Session {
        let frames = self
            .samples
            .into_iter()
            .enumerate()
            .map(|(i, s)| Frame::new(i as f64 * self.interval_ms, s))
            .collect();
        let created_at = Utc
            .with_ymd_and_hms(2025, 3, 1, 10, self.minute, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Session::new(self.name, created_at, SessionConfig::from(self.rider), frames)
            .expect("builder produces ordered frames")
    }
}

/// A lean sine wave: `cycles` full left/right carves over `n` frames
pub fn carving_leans(n: usize, cycles: f64, amplitude: f64, squat: f64) -> Vec<(f64, f64)> {
    (0..n)
        .map(|i| {
            let phase = i as f64 / n as f64 * cycles * std::f64::consts::TAU;
            let lean = amplitude * phase.sin();
            (squat + lean.abs(), lean)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_builder() {
        let session = SessionBuilder::new("test")
            .interval_ms(50.0)
            .leans(&[(0.0, 0.0), (10.0, 5.0), (20.0, -5.0)])
            .build();

        assert_eq!(session.frame_count(), 3);
        assert_eq!(session.duration_ms(), 100.0);
        assert_eq!(session.meta.name, "test");
    }
}
