//! Error handling for the RideVis-RS application
//!
//! This module defines custom error types and a Result alias for use
//! throughout the application.

use thiserror::Error;

/// Main error type for RideVis-RS operations
#[derive(Error, Debug)]
pub enum RideVisError {
    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Body dimensions that violate the solver's invariants
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Recorded-file ingestion failed
    #[error("CSV error: {0}")]
    Csv(String),

    /// A recording stopped with too few frames to keep
    #[error("Recording too short: {frames} frame(s) captured, at least 2 required")]
    RecordingTooShort { frames: usize },

    /// Malformed or inconsistent session record
    #[error("Session error: {0}")]
    Session(String),

    /// Session storage failures
    #[error("Session store error: {0}")]
    Store(String),

    /// Live link (transport) errors
    #[error("Link error: {0}")]
    Link(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<RideVisError>,
    },
}

impl RideVisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        RideVisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for RideVisError {
    fn from(err: serde_json::Error) -> Self {
        RideVisError::Serialization(err.to_string())
    }
}

/// Result type alias for RideVis-RS operations
pub type Result<T> = std::result::Result<T, RideVisError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| RideVisError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| RideVisError::from(e).with_context(f()))
    }
}
