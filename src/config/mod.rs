//! Configuration module for RideVis-RS
//!
//! This module handles application configuration including:
//! - Rider body/board dimensions and stance used by the pose solver
//! - Live link, playback and analytics settings
//! - Application state persistence (last CSV, UI preferences)
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.ridevis.ridevis-rs/`
//! - **macOS**: `~/Library/Application Support/dev.ridevis.ridevis-rs/`
//! - **Windows**: `%APPDATA%\dev.ridevis.ridevis-rs\`
//!
//! # Files
//!
//! - `app_state.json` - Last opened files and UI preferences
//! - `config.toml` - Optional user configuration (dimensions, link address)
//! - `sessions/` - Locally stored session recordings
//! - `logs/` - Rolling log files
//!
//! # Example
//!
//! ```ignore
//! use ridevis_rs::config::{AppConfig, AppState};
//!
//! let state = AppState::load_or_default();
//! let config = AppConfig::load_or_default(ridevis_rs::config::config_path());
//! config.rider.dims.validate()?;
//! ```

use crate::error::{RideVisError, Result};
use crate::types::Stance;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.ridevis.ridevis-rs";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// User configuration filename
pub const CONFIG_FILE: &str = "config.toml";

/// Directory (under the app data dir) holding local session files
pub const SESSIONS_DIR: &str = "sessions";

/// Directory (under the app data dir) holding log files
pub const LOGS_DIR: &str = "logs";

/// Session file extension
pub const SESSION_FILE_EXTENSION: &str = "json";

/// Default live link port
pub const DEFAULT_LINK_PORT: u16 = 9093;

/// Fixed delay between reconnect attempts
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2000;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        RideVisError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            RideVisError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

/// Get the path to the user configuration file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

/// Get the local sessions directory
pub fn sessions_dir() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(SESSIONS_DIR))
}

/// Get the log directory
pub fn logs_dir() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(LOGS_DIR))
}

// ==================== Dimensions ====================

/// Body and board measurements in metres (max lean in degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dimensions {
    pub board_width: f64,
    pub board_length: f64,
    /// Hip height at 0 % squat
    pub standing_height: f64,
    /// Hip height at 100 % squat
    pub min_height: f64,
    pub torso_length: f64,
    pub shin_length: f64,
    pub upper_arm_len: f64,
    pub forearm_len: f64,
    /// Half-distance between the shoulders
    pub shoulder_spread: f64,
    /// Lateral hip travel at full squat and full edge
    pub max_hip_shift: f64,
    /// Lean at which the edge is considered fully engaged
    pub max_lean_deg: f64,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            board_width: 0.2,
            board_length: 0.8,
            standing_height: 0.9,
            min_height: 0.4,
            torso_length: 0.6,
            shin_length: 0.45,
            upper_arm_len: 0.28,
            forearm_len: 0.25,
            shoulder_spread: 0.2,
            max_hip_shift: 0.1,
            max_lean_deg: 30.0,
        }
    }
}

impl Dimensions {
    /// Check that every length is positive and `min_height < standing_height`
    pub fn validate(&self) -> Result<()> {
        let lengths = [
            ("boardWidth", self.board_width),
            ("boardLength", self.board_length),
            ("standingHeight", self.standing_height),
            ("minHeight", self.min_height),
            ("torsoLength", self.torso_length),
            ("shinLength", self.shin_length),
            ("upperArmLen", self.upper_arm_len),
            ("forearmLen", self.forearm_len),
            ("shoulderSpread", self.shoulder_spread),
            ("maxHipShift", self.max_hip_shift),
            ("maxLeanDeg", self.max_lean_deg),
        ];
        for (name, value) in lengths {
            if !(value.is_finite() && value > 0.0) {
                return Err(RideVisError::InvalidDimensions(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.min_height >= self.standing_height {
            return Err(RideVisError::InvalidDimensions(format!(
                "minHeight ({}) must be below standingHeight ({})",
                self.min_height, self.standing_height
            )));
        }
        Ok(())
    }

    /// Apply a partial update field by field
    pub fn apply_update(&mut self, update: &DimensionsUpdate) {
        let fields: [(&mut f64, Option<f64>); 9] = [
            (&mut self.standing_height, update.standing_height),
            (&mut self.min_height, update.min_height),
            (&mut self.torso_length, update.torso_length),
            (&mut self.shin_length, update.shin_length),
            (&mut self.upper_arm_len, update.upper_arm_len),
            (&mut self.forearm_len, update.forearm_len),
            (&mut self.shoulder_spread, update.shoulder_spread),
            (&mut self.board_width, update.board_width),
            (&mut self.board_length, update.board_length),
        ];
        for (field, value) in fields {
            if let Some(v) = value {
                *field = v;
            }
        }
    }
}

/// Partial dimension update carried by live config messages
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standing_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torso_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shin_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_arm_len: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forearm_len: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shoulder_spread: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_length: Option<f64>,
}

/// Everything the solver needs besides the telemetry itself
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiderConfig {
    #[serde(default)]
    pub dims: Dimensions,
    #[serde(default)]
    pub stance: Stance,
}

impl RiderConfig {
    pub fn new(dims: Dimensions, stance: Stance) -> Self {
        Self { dims, stance }
    }
}

// ==================== Link Config ====================

/// Live telemetry link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Whether to connect to a live source at startup
    pub enabled: bool,
    /// Host name of the telemetry server
    pub host: String,
    /// TCP port of the telemetry server
    pub port: u16,
    /// Fixed delay between reconnect attempts (no backoff)
    pub reconnect_delay_ms: u64,
    /// Capacity of the event channel into the tick loop
    pub channel_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            port: DEFAULT_LINK_PORT,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            channel_capacity: 1024,
        }
    }
}

impl LinkConfig {
    /// `host:port` address string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn reconnect_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.reconnect_delay_ms)
    }
}

// ==================== Playback Config ====================

/// Playback defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Speed applied when a session is loaded
    pub default_speed: f64,
    /// CSV recording to fall back to when no live source is available
    pub csv_path: Option<PathBuf>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_speed: 1.0,
            csv_path: None,
        }
    }
}

// ==================== Analytics Config ====================

/// Thresholds and constants for the session analytics pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// |lean| at or below this is ignored when counting turns
    pub turn_deadzone_deg: f64,
    /// |lean| above this counts as carving for the squat-in-carve term
    pub carve_threshold_deg: f64,
    /// Frames per stability window
    pub stability_window: usize,
    /// Minimum frames for the squat/lean correlation
    pub min_sync_samples: usize,
    /// Assumed recording rate for speed integration
    pub sample_rate_hz: f64,
    /// Per-step multiplicative speed damping
    pub speed_damping: f64,
    /// Standard gravity for the g conversion
    pub gravity_mps2: f64,
    /// Max lean used when the session snapshot has none
    pub fallback_max_lean_deg: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            turn_deadzone_deg: 3.0,
            carve_threshold_deg: 2.0,
            stability_window: 30,
            min_sync_samples: 10,
            sample_rate_hz: 30.0,
            speed_damping: 0.998,
            gravity_mps2: 9.81,
            fallback_max_lean_deg: 15.0,
        }
    }
}

// ==================== App Config ====================

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub rider: RiderConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file (`.toml`) or JSON otherwise
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RideVisError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content).map_err(|e| {
                RideVisError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        } else {
            serde_json::from_str(&content).map_err(|e| {
                RideVisError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        };

        config.rider.dims.validate()?;
        Ok(config)
    }

    /// Load configuration, returning defaults if the file is missing or invalid
    pub fn load_or_default(path: Option<impl AsRef<Path>>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RideVisError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| RideVisError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            RideVisError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }
}

// ==================== App State ====================

/// Persistent application state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    /// Version for future migration support
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Last CSV recording opened
    #[serde(default)]
    pub last_csv_path: Option<PathBuf>,

    /// Directory last used for session import/export
    #[serde(default)]
    pub last_session_dir: Option<PathBuf>,

    /// UI preferences
    #[serde(default)]
    pub ui_preferences: UiPreferences,
}

fn default_app_state_version() -> u32 {
    1
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            last_csv_path: None,
            last_session_dir: None,
            ui_preferences: UiPreferences::default(),
        }
    }
}

impl AppState {
    /// Load app state from the default location
    pub fn load() -> Result<Self> {
        let path = app_state_path().ok_or_else(|| {
            RideVisError::Config("Could not determine app state path".to_string())
        })?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| RideVisError::Config(format!("Failed to read app state: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| RideVisError::Config(format!("Failed to parse app state: {}", e)))
    }

    /// Load app state, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save app state to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        let path = dir.join(APP_STATE_FILE);

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RideVisError::Config(format!("Failed to serialize app state: {}", e)))?;

        std::fs::write(&path, content)
            .map_err(|e| RideVisError::Config(format!("Failed to write app state: {}", e)))
    }

    /// Remember the last CSV file, if it still exists
    pub fn last_csv(&self) -> Option<&Path> {
        self.last_csv_path
            .as_ref()
            .filter(|p| p.exists())
            .map(|p| p.as_path())
    }
}

/// UI preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiPreferences {
    /// Enable dark mode
    #[serde(default = "default_true")]
    pub dark_mode: bool,

    /// Draw the curved heading indicator ahead of the board
    #[serde(default = "default_true")]
    pub show_flow_path: bool,

    /// Draw joint markers
    #[serde(default = "default_true")]
    pub show_joints: bool,

    /// Draw the fading trail behind the board while replaying a session
    #[serde(default = "default_true")]
    pub show_trail: bool,
}

fn default_true() -> bool {
    true
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            dark_mode: true,
            show_flow_path: true,
            show_joints: true,
            show_trail: true,
        }
    }
}

// ==================== Tests ====================
