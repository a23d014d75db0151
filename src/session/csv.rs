//! Tabular recording ingestion
//!
//! Reads the legacy `time_s,squat_pct,lean_deg,torso_rot,pitch,roll`
//! export. Blank lines are dropped, the first remaining line is the
//! header, and rows that cannot be used are skipped rather than failing
//! the whole file.

use std::path::Path;

use crate::error::{RideVisError, Result, ResultExt};
use crate::types::TelemetrySample;

use super::types::Frame;

/// Minimum number of comma-separated fields in a usable row
pub const CSV_MIN_FIELDS: usize = 6;

/// A recorded file ready for playback
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRecording {
    /// Frames sorted by time, timestamps in ms
    pub frames: Vec<Frame>,
    /// Last row's time (ms)
    pub duration_ms: f64,
    /// Data rows skipped as unusable
    pub skipped_rows: usize,
}

fn parse_row(line: &str) -> Option<Frame> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < CSV_MIN_FIELDS {
        return None;
    }
    let time_s: f64 = parts[0].parse().ok().filter(|t: &f64| t.is_finite())?;
    let mut channels = [0.0; 5];
    for (slot, raw) in channels.iter_mut().zip(&parts[1..CSV_MIN_FIELDS]) {
        *slot = raw.parse().ok()?;
    }
    let [squat, lean, rot, pitch, roll] = channels;
    Some(Frame::new(
        time_s * 1000.0,
        TelemetrySample::new(squat, lean, rot, pitch, roll),
    ))
}

/// Parse CSV text into a sorted recording
pub fn parse_csv(text: &str) -> Result<CsvRecording> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    // Header
    lines.next();

    let mut frames = Vec::new();
    let mut skipped_rows = 0;
    for line in lines {
        match parse_row(line) {
            Some(frame) => frames.push(frame),
            None => skipped_rows += 1,
        }
    }

    if frames.len() < 2 {
        return Err(RideVisError::Csv(format!(
            "missing usable rows ({} found, at least 2 required)",
            frames.len()
        )));
    }

    frames.sort_by(|a, b| a.t_ms.total_cmp(&b.t_ms));
    let duration_ms = frames.last().map(|f| f.t_ms).unwrap_or(0.0);

    if skipped_rows > 0 {
        tracing::debug!("Skipped {} unusable CSV row(s)", skipped_rows);
    }

    Ok(CsvRecording {
        frames,
        duration_ms,
        skipped_rows,
    })
}

/// Read and parse a CSV recording from disk
pub fn load_csv(path: &Path) -> Result<CsvRecording> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read CSV {:?}", path))?;
    let recording = parse_csv(&text).with_context(|| format!("Failed to load CSV {:?}", path))?;
    tracing::info!(
        "Loaded CSV {:?}: {} frames, {:.1}s",
        path,
        recording.frames.len(),
        recording.duration_ms / 1000.0
    );
    Ok(recording)
}
