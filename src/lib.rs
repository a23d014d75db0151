//! # RideVis-RS: Skateboard Rider Pose Visualizer
//!
//! Reconstructs a stick-figure rider on a board from a handful of body and
//! board sensor channels, replays recorded rides and scores them.
//!
//! ## Architecture
//!
//! - **Pose**: Closed-form solver turning one telemetry sample into 3D joint positions
//! - **Session**: Recorded frames, the recording buffer, playback engine and session storage
//! - **Analysis**: Turn counting, form score, ride style and terrain/acceleration stats
//! - **Backend**: JSON-lines telemetry link running on its own thread (tokio)
//! - **Controller**: Tick loop tying link events, playback, recording and the solver together
//! - **Frontend**: eframe/egui viewer
//! - **Communication**: Crossbeam channel from the link thread to the UI
//!
//! ## Configuration
//!
//! Configuration and app state live in the platform data directory under
//! `dev.ridevis.ridevis-rs`:
//!
//! - **Linux**: `~/.local/share/dev.ridevis.ridevis-rs/`
//! - **macOS**: `~/Library/Application Support/dev.ridevis.ridevis-rs/`
//! - **Windows**: `%APPDATA%\dev.ridevis.ridevis-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use ridevis_rs::{config::AppConfig, pose, types::TelemetrySample};
//!
//! let config = AppConfig::default();
//! let sample = TelemetrySample::new(40.0, 12.0, 0.0, 0.0, 0.0);
//! let pose = pose::solve(&sample, &config.rider.dims, config.rider.stance);
//! println!("hip at {:?}, knee {:.0}°", pose.hip, pose.knee_angle_deg);
//! ```

pub mod analysis;
pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod frontend;
pub mod pose;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use analysis::{compute_metrics, RideStyle, SessionMetrics};
pub use backend::{LinkEvent, LinkRequest, LiveBackend, LocalSource, TelemetrySource};
pub use config::{AppConfig, AppState, Dimensions, RiderConfig};
pub use controller::RideController;
pub use error::{RideVisError, Result};
pub use frontend::RideVisApp;
pub use pose::{solve, Pose};
pub use session::{PlaybackEngine, RecordingBuffer, Session};
pub use types::{Stance, TelemetrySample};
