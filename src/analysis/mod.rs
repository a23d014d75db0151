//! Session analytics
//!
//! A single batch pass over a finished recording producing the numbers
//! shown in the session summary:
//!
//! - Peak lean and turn count (sign changes outside a lean deadzone)
//! - Squat/carve synchrony (Pearson correlation of squat against |lean|)
//! - A composite 0-100 form score and a ride-style label
//! - Slope distribution and, when the board reports it, acceleration and
//!   an integrated speed estimate
//!
//! Values are stored unrounded; [`SessionMetrics::rounded`] is for display.

pub mod stats;

use serde::{Deserialize, Serialize};

use crate::config::AnalyticsConfig;
use crate::session::Session;
use crate::types::TelemetrySample;

/// Form score above which a ride is "flow state"
pub const FLOW_STATE_SCORE: f64 = 75.0;

const CARVE_WEIGHT: f64 = 0.3;
const SQUAT_WEIGHT: f64 = 0.3;
const STABILITY_WEIGHT: f64 = 0.2;
const SYNC_WEIGHT: f64 = 0.2;
/// Stability when the recording is shorter than one window
const DEFAULT_STABILITY: f64 = 50.0;
/// Stability lost per degree of mean jitter
const JITTER_PENALTY: f64 = 10.0;
const MPS_TO_KPH: f64 = 3.6;

/// Ride style classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RideStyle {
    #[serde(rename = "FLOW STATE")]
    FlowState,
    #[serde(rename = "CARVER")]
    Carver,
    #[serde(rename = "STIFF RIDER")]
    StiffRider,
    #[serde(rename = "CRUISER")]
    Cruiser,
}

impl RideStyle {
    /// Classify in priority order: flow state, carver, stiff rider, cruiser
    pub fn classify(form_score: f64, mean_abs_lean: f64, avg_squat: f64) -> Self {
        if form_score > FLOW_STATE_SCORE {
            RideStyle::FlowState
        } else if mean_abs_lean > 7.0 && avg_squat > 25.0 {
            RideStyle::Carver
        } else if mean_abs_lean > 4.0 && avg_squat < 15.0 {
            RideStyle::StiffRider
        } else {
            RideStyle::Cruiser
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RideStyle::FlowState => "FLOW STATE",
            RideStyle::Carver => "CARVER",
            RideStyle::StiffRider => "STIFF RIDER",
            RideStyle::Cruiser => "CRUISER",
        }
    }
}

impl std::fmt::Display for RideStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Metrics of one finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub duration_s: f64,
    pub peak_lean_deg: f64,
    pub total_turns: usize,
    /// Pearson correlation of squat % against |lean|, in [-1, 1]
    pub squat_carve_sync: f64,
    /// Composite 0-100
    pub form_score: f64,
    pub ride_style: RideStyle,
    pub avg_slope_deg: f64,
    pub avg_slope_pct: f64,
    pub max_slope_deg: f64,
    pub max_slope_pct: f64,
    #[serde(rename = "slopeP50")]
    pub slope_p50: f64,
    #[serde(rename = "slopeP75")]
    pub slope_p75: f64,
    #[serde(rename = "slopeP90")]
    pub slope_p90: f64,
    pub max_accel_mps2: f64,
    pub max_accel_g: f64,
    pub max_speed_mps: f64,
    pub max_speed_kph: f64,
    pub has_accel_data: bool,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

impl SessionMetrics {
    /// Copy rounded for display: one decimal, two for sync and acceleration
    pub fn rounded(&self) -> Self {
        let r1 = |v| round_to(v, 1);
        let r2 = |v| round_to(v, 2);
        Self {
            duration_s: r1(self.duration_s),
            peak_lean_deg: r1(self.peak_lean_deg),
            total_turns: self.total_turns,
            squat_carve_sync: r2(self.squat_carve_sync),
            form_score: r1(self.form_score),
            ride_style: self.ride_style,
            avg_slope_deg: r1(self.avg_slope_deg),
            avg_slope_pct: r1(self.avg_slope_pct),
            max_slope_deg: r1(self.max_slope_deg),
            max_slope_pct: r1(self.max_slope_pct),
            slope_p50: r1(self.slope_p50),
            slope_p75: r1(self.slope_p75),
            slope_p90: r1(self.slope_p90),
            max_accel_mps2: r2(self.max_accel_mps2),
            max_accel_g: r2(self.max_accel_g),
            max_speed_mps: r1(self.max_speed_mps),
            max_speed_kph: r1(self.max_speed_kph),
            has_accel_data: self.has_accel_data,
        }
    }
}

/// Count direction changes among leans outside the deadzone.
///
/// Frames inside the deadzone are removed first; adjacent survivors of
/// opposite sign count as one turn each.
pub fn count_turns(leans: &[f64], deadzone_deg: f64) -> usize {
    let carving: Vec<f64> = leans
        .iter()
        .copied()
        .filter(|l| l.abs() > deadzone_deg)
        .collect();
    carving
        .windows(2)
        .filter(|w| w[0].signum() != w[1].signum())
        .count()
}

/// Mean jitter (std dev of pitch + std dev of roll) per full window
fn stability(pitches: &[f64], rolls: &[f64], window: usize) -> f64 {
    if window == 0 {
        return DEFAULT_STABILITY;
    }
    let jitters: Vec<f64> = pitches
        .chunks_exact(window)
        .zip(rolls.chunks_exact(window))
        .map(|(p, r)| stats::std_dev(p) + stats::std_dev(r))
        .collect();
    if jitters.is_empty() {
        return DEFAULT_STABILITY;
    }
    (100.0 - stats::mean(&jitters) * JITTER_PENALTY).max(0.0)
}

/// Forward-Euler speed estimate from forward acceleration; returns the peak
fn peak_speed(accels: &[f64], config: &AnalyticsConfig) -> f64 {
    let dt = if config.sample_rate_hz > 0.0 {
        1.0 / config.sample_rate_hz
    } else {
        0.0
    };
    let mut speed: f64 = 0.0;
    let mut peak: f64 = 0.0;
    for a in accels {
        speed += a * dt;
        speed *= config.speed_damping;
        speed = speed.max(0.0);
        peak = peak.max(speed);
    }
    peak
}

/// Clamp a form-score term to [0, 100]; non-finite terms contribute nothing
fn share(term: f64) -> f64 {
    if term.is_finite() {
        term.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Compute metrics for a finished session; `None` with fewer than 2 frames
pub fn compute_metrics(session: &Session, config: &AnalyticsConfig) -> Option<SessionMetrics> {
    let samples: Vec<TelemetrySample> = session.samples().copied().collect();
    let max_lean = session.config.dims.max_lean_deg;
    compute_sample_metrics(&samples, session.meta.duration_ms, max_lean, config)
}

/// Compute metrics over bare samples.
///
/// `max_lean_deg` falls back to the configured default when it is not a
/// positive number.
pub fn compute_sample_metrics(
    samples: &[TelemetrySample],
    duration_ms: f64,
    max_lean_deg: f64,
    config: &AnalyticsConfig,
) -> Option<SessionMetrics> {
    let n = samples.len();
    if n < 2 {
        return None;
    }

    let squats: Vec<f64> = samples.iter().map(|s| s.squat_pct).collect();
    let leans: Vec<f64> = samples.iter().map(|s| s.lean_deg).collect();
    let abs_leans: Vec<f64> = leans.iter().map(|l| l.abs()).collect();
    let pitches: Vec<f64> = samples.iter().map(|s| s.pitch_deg).collect();
    let rolls: Vec<f64> = samples.iter().map(|s| s.roll_deg).collect();

    let peak_lean = stats::max(&abs_leans);
    let turns = count_turns(&leans, config.turn_deadzone_deg);
    let sync = if n >= config.min_sync_samples {
        stats::pearson(&squats, &abs_leans)
    } else {
        0.0
    };

    // Form score
    let max_lean = if max_lean_deg.is_finite() && max_lean_deg > 0.0 {
        max_lean_deg
    } else {
        config.fallback_max_lean_deg
    };
    let mean_abs_lean = stats::mean(&abs_leans);
    let carve_term = share((mean_abs_lean / max_lean * 100.0).min(100.0));

    let squat_in_carve: Vec<f64> = samples
        .iter()
        .filter(|s| s.lean_deg.abs() > config.carve_threshold_deg)
        .map(|s| s.squat_pct)
        .collect();
    let squat_term = share(stats::mean(&squat_in_carve));
    let stability_term = share(stability(&pitches, &rolls, config.stability_window));
    let sync_term = share(sync * 100.0);

    let form_score = (carve_term * CARVE_WEIGHT
        + squat_term * SQUAT_WEIGHT
        + stability_term * STABILITY_WEIGHT
        + sync_term * SYNC_WEIGHT)
        .clamp(0.0, 100.0);

    let avg_squat = stats::mean(&squats);
    let ride_style = RideStyle::classify(form_score, mean_abs_lean, avg_squat);

    // Slope
    let mut abs_slopes: Vec<f64> = samples.iter().map(|s| s.slope_deg.abs()).collect();
    let avg_slope = stats::mean(&abs_slopes);
    let max_slope = stats::max(&abs_slopes);
    abs_slopes.sort_by(f64::total_cmp);

    // Acceleration and speed
    let accels: Vec<f64> = samples
        .iter()
        .map(|s| s.board_accel_fwd.unwrap_or(0.0))
        .collect();
    let has_accel = accels.iter().any(|&a| a != 0.0);
    let (max_accel, max_speed) = if has_accel {
        let abs_accels: Vec<f64> = accels.iter().map(|a| a.abs()).collect();
        (stats::max(&abs_accels), peak_speed(&accels, config))
    } else {
        (0.0, 0.0)
    };

    tracing::debug!(
        "Metrics over {} frames: form {:.1}, {} turns, style {}",
        n,
        form_score,
        turns,
        ride_style
    );

    Some(SessionMetrics {
        duration_s: duration_ms / 1000.0,
        peak_lean_deg: peak_lean,
        total_turns: turns,
        squat_carve_sync: sync,
        form_score,
        ride_style,
        avg_slope_deg: avg_slope,
        avg_slope_pct: stats::grade_pct(avg_slope),
        max_slope_deg: max_slope,
        max_slope_pct: stats::grade_pct(max_slope),
        slope_p50: stats::percentile(&abs_slopes, 50.0),
        slope_p75: stats::percentile(&abs_slopes, 75.0),
        slope_p90: stats::percentile(&abs_slopes, 90.0),
        max_accel_mps2: max_accel,
        max_accel_g: max_accel / config.gravity_mps2,
        max_speed_mps: max_speed,
        max_speed_kph: max_speed * MPS_TO_KPH,
        has_accel_data: has_accel,
    })
}
