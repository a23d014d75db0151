//! Lean/squat plot of the loaded recording
//!
//! Renders both channels against time in seconds with a cursor at the
//! playback position. Long recordings are decimated to keep the line count
//! per frame bounded.

use egui::{Color32, Ui};
use egui_plot::{Corner, Legend, Line, Plot, PlotPoints, VLine};

use crate::session::Frame;

/// Upper bound on points per line
const MAX_PLOT_POINTS: usize = 2000;

const LEAN_COLOR: Color32 = Color32::from_rgb(0x00, 0xce, 0xc9);
const SQUAT_COLOR: Color32 = Color32::from_rgb(0xfd, 0xcb, 0x6e);

/// `[t_s, value]` pairs for one channel, decimated to at most `max_points`
pub fn channel_points(frames: &[Frame], max_points: usize, value: impl Fn(&Frame) -> f64) -> Vec<[f64; 2]> {
    let stride = frames.len().div_ceil(max_points.max(1)).max(1);
    let mut points: Vec<[f64; 2]> = frames
        .iter()
        .step_by(stride)
        .map(|f| [f.t_ms / 1000.0, value(f)])
        .collect();
    // Always end on the last frame
    if let Some(last) = frames.last() {
        if (frames.len() - 1) % stride != 0 {
            points.push([last.t_ms / 1000.0, value(last)]);
        }
    }
    points
}

/// Plot lean and squat with a playback cursor
pub fn render_session_plot(ui: &mut Ui, frames: &[Frame], current_time_ms: f64) {
    let plot = Plot::new("session_plot")
        .height(ui.available_height().clamp(120.0, 220.0))
        .allow_scroll(false)
        .show_grid(true)
        .x_axis_label("s")
        .legend(Legend::default().position(Corner::RightTop));

    plot.show(ui, |plot_ui| {
        if frames.is_empty() {
            return;
        }

        let lean = channel_points(frames, MAX_PLOT_POINTS, |f| f.sample.lean_deg);
        let squat = channel_points(frames, MAX_PLOT_POINTS, |f| f.sample.squat_pct);

        plot_ui.line(
            Line::new("Lean (°)", PlotPoints::from(lean))
                .color(LEAN_COLOR)
                .width(1.5),
        );
        plot_ui.line(
            Line::new("Squat (%)", PlotPoints::from(squat))
                .color(SQUAT_COLOR)
                .width(1.5),
        );
        plot_ui.vline(
            VLine::new("playhead", current_time_ms / 1000.0)
                .color(Color32::from_rgba_unmultiplied(255, 255, 255, 96))
                .width(1.0),
        );
    });
}
