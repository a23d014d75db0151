//! Panel components for the viewer
//!
//! Each render function draws one card and returns the actions the user
//! triggered.

use egui::{Color32, RichText, Ui};

use crate::analysis::{RideStyle, SessionMetrics};
use crate::controller::TIMED_RECORDING_PRESETS;
use crate::pose::{CarveState, Pose};
use crate::session::{EngineState, PlaybackEngine, RecordingBuffer, SessionSummary};
use crate::types::{ImuStatus, Stance, TelemetrySample};

use super::state::{AppAction, SummaryAction, SummaryState};

/// Playback speed presets
pub const SPEED_PRESETS: [f64; 5] = [0.25, 0.5, 1.0, 2.0, 4.0];

pub const GOOD_COLOR: Color32 = Color32::from_rgb(0x00, 0xff, 0x88);
pub const FAIR_COLOR: Color32 = Color32::from_rgb(0xfd, 0xcb, 0x6e);
pub const POOR_COLOR: Color32 = Color32::from_rgb(0xff, 0x47, 0x57);
const CARVER_COLOR: Color32 = Color32::from_rgb(0x00, 0xce, 0xc9);
const CRUISER_COLOR: Color32 = Color32::from_rgb(0xa8, 0xb2, 0xc2);
const RECORD_COLOR: Color32 = Color32::from_rgb(180, 50, 50);

/// Color for a 0-100 form score
pub fn score_color(score: f64) -> Color32 {
    if score >= 70.0 {
        GOOD_COLOR
    } else if score >= 40.0 {
        FAIR_COLOR
    } else {
        POOR_COLOR
    }
}

pub fn style_color(style: RideStyle) -> Color32 {
    match style {
        RideStyle::FlowState => GOOD_COLOR,
        RideStyle::Carver => CARVER_COLOR,
        RideStyle::StiffRider => FAIR_COLOR,
        RideStyle::Cruiser => CRUISER_COLOR,
    }
}

/// `"2m 5s"`, or `"42s"` under a minute
pub fn format_duration(ms: f64) -> String {
    let total = (ms.max(0.0) / 1000.0).floor() as u64;
    let (m, s) = (total / 60, total % 60);
    if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// `m:ss.t` playback clock
pub fn format_clock(ms: f64) -> String {
    let tenths = (ms.max(0.0) / 100.0).floor() as u64;
    format!("{}:{:02}.{}", tenths / 600, (tenths / 10) % 60, tenths % 10)
}

fn card_row(ui: &mut Ui, label: &str, value: String) {
    ui.label(RichText::new(label).small().color(Color32::GRAY));
    ui.label(RichText::new(value).monospace());
    ui.end_row();
}

// ==================== Telemetry ====================

/// Live readout of the current sample and solved pose
pub fn render_telemetry_card(
    ui: &mut Ui,
    sample: &TelemetrySample,
    pose: &Pose,
    carve: CarveState,
    stance: Stance,
) {
    ui.heading(carve.direction.display_name());
    ui.label(RichText::new(carve.subtitle()).color(Color32::GRAY));
    ui.add_space(4.0);

    egui::Grid::new("telemetry_card")
        .num_columns(2)
        .spacing([12.0, 2.0])
        .show(ui, |ui| {
            card_row(ui, "Stance", stance.display_name().to_string());
            card_row(ui, "Squat", format!("{:.0} %", sample.squat_pct));
            card_row(ui, "Lean", format!("{:+.1}°", sample.lean_deg));
            card_row(ui, "Knee", format!("{:.0}°", pose.knee_angle_deg));
            card_row(ui, "Rotation", format!("{:+.0}°", sample.torso_rot_deg));
            card_row(ui, "Hip shift", format!("{:+.2} m", pose.hip_shift));
            card_row(ui, "Pitch", format!("{:+.1}°", sample.pitch_deg));
            card_row(ui, "Slope", format!("{:+.1}°", sample.slope_deg));
            if let Some(accel) = sample.board_accel_fwd {
                card_row(ui, "Accel", format!("{:+.2} m/s²", accel));
            }
        });
}

/// Rider controls (stance toggle, calibrate)
pub fn render_rider_controls(ui: &mut Ui, stance: Stance, imu: ImuStatus, actions: &mut Vec<AppAction>) {
    ui.horizontal(|ui| {
        let label = format!("Stance: {}", stance.display_name());
        if ui
            .button(label)
            .on_hover_text("Switch goofy/regular")
            .clicked()
        {
            actions.push(AppAction::SetStance(stance.toggled()));
        }
        let calibrate_enabled = imu.board_connected || imu.body_connected;
        if ui
            .add_enabled(calibrate_enabled, egui::Button::new("Calibrate"))
            .on_hover_text("Zero the sensors in the current position")
            .clicked()
        {
            actions.push(AppAction::Calibrate);
        }
    });
}

// ==================== Manual Posing ====================

/// Slider ranges for hand posing (min, max)
pub const SQUAT_RANGE: (f64, f64) = (0.0, 100.0);
pub const EDGE_RANGE: (f64, f64) = (-30.0, 30.0);
pub const ROTATION_RANGE: (f64, f64) = (-90.0, 90.0);
pub const PITCH_RANGE: (f64, f64) = (-30.0, 30.0);
pub const ROLL_RANGE: (f64, f64) = (-30.0, 30.0);
pub const SLOPE_RANGE: (f64, f64) = (-20.0, 20.0);

fn manual_slider(ui: &mut Ui, label: &str, value: &mut f64, range: (f64, f64), suffix: &str) -> bool {
    ui.label(label);
    let changed = ui
        .add(egui::Slider::new(value, range.0..=range.1).suffix(suffix))
        .changed();
    ui.end_row();
    changed
}

/// Sliders for every body channel plus terrain slope.
///
/// Disabled while a feed is connected or recorded data is playing.
pub fn render_manual_controls(
    ui: &mut Ui,
    sample: &TelemetrySample,
    enabled: bool,
    actions: &mut Vec<AppAction>,
) {
    ui.horizontal(|ui| {
        ui.strong("Manual pose");
        if ui
            .add_enabled(enabled, egui::Button::new("Reset").small())
            .clicked()
        {
            actions.push(AppAction::ResetManualSample);
        }
    });

    let mut edited = *sample;
    let changed = ui
        .add_enabled_ui(enabled, |ui| {
            egui::Grid::new("manual_pose")
                .num_columns(2)
                .spacing([8.0, 2.0])
                .show(ui, |ui| {
                    let mut changed = manual_slider(ui, "Squat", &mut edited.squat_pct, SQUAT_RANGE, " %");
                    changed |= manual_slider(ui, "Edge", &mut edited.lean_deg, EDGE_RANGE, "°");
                    changed |= manual_slider(ui, "Rotation", &mut edited.torso_rot_deg, ROTATION_RANGE, "°");
                    changed |= manual_slider(ui, "Pitch", &mut edited.pitch_deg, PITCH_RANGE, "°");
                    changed |= manual_slider(ui, "Roll", &mut edited.roll_deg, ROLL_RANGE, "°");
                    changed |= manual_slider(ui, "Slope", &mut edited.slope_deg, SLOPE_RANGE, "°");
                    changed
                })
                .inner
        })
        .inner;

    if changed {
        actions.push(AppAction::SetManualSample(edited));
    }
}

// ==================== Transport ====================

/// Play/pause, scrubber, speed presets and back-to-live
pub fn render_transport(ui: &mut Ui, engine: &PlaybackEngine, actions: &mut Vec<AppAction>) {
    if !engine.is_recorded() {
        ui.horizontal(|ui| {
            ui.label(RichText::new(engine.state().display_name()).strong());
            ui.label(RichText::new("Open a CSV or a saved session to replay").small().color(Color32::GRAY));
        });
        return;
    }

    ui.horizontal(|ui| {
        let play_text = if engine.state() == EngineState::PlayingRecorded {
            "⏸ Pause"
        } else {
            "▶ Play"
        };
        if ui.button(play_text).clicked() {
            actions.push(AppAction::TogglePlay);
        }

        ui.label(
            RichText::new(format!(
                "{} / {}",
                format_clock(engine.current_time_ms()),
                format_clock(engine.duration_ms())
            ))
            .monospace(),
        );

        let mut progress = engine.progress();
        let slider = egui::Slider::new(&mut progress, 0.0..=1.0).show_value(false);
        if ui.add_sized([(ui.available_width() - 260.0).max(80.0), 18.0], slider).changed() {
            actions.push(AppAction::SeekProgress(progress));
        }

        for speed in SPEED_PRESETS {
            let selected = (engine.speed() - speed).abs() < f64::EPSILON;
            if ui.selectable_label(selected, format!("{}×", speed)).clicked() {
                actions.push(AppAction::SetSpeed(speed));
            }
        }

        if ui.button("Back to live").clicked() {
            actions.push(AppAction::BackToLive);
        }
    });

    if let Some(active) = engine.active_session() {
        ui.label(RichText::new(format!("Session: {}", active.name)).small());
    }
}

// ==================== Recording ====================

pub fn render_recording_card(
    ui: &mut Ui,
    recorder: &RecordingBuffer,
    live: bool,
    actions: &mut Vec<AppAction>,
) {
    ui.horizontal(|ui| {
        if recorder.is_recording() {
            let btn = egui::Button::new(RichText::new("■ Stop").color(Color32::WHITE)).fill(RECORD_COLOR);
            if ui.add(btn).clicked() {
                actions.push(AppAction::StopRecording);
            }
            let elapsed = recorder.elapsed().as_secs_f64() * 1000.0;
            let text = match recorder.timed_length() {
                Some(length) => format!(
                    "{} / {}  ({} frames)",
                    format_duration(elapsed),
                    format_duration(length.as_secs_f64() * 1000.0),
                    recorder.frame_count()
                ),
                None => format!("{}  ({} frames)", format_duration(elapsed), recorder.frame_count()),
            };
            ui.colored_label(POOR_COLOR, "●");
            ui.label(text);
        } else {
            if ui
                .add_enabled(live, egui::Button::new("● Record"))
                .on_hover_text("Record until stopped")
                .clicked()
            {
                actions.push(AppAction::StartRecording);
            }
            for secs in TIMED_RECORDING_PRESETS {
                if ui
                    .add_enabled(live, egui::Button::new(format!("{}s", secs)))
                    .on_hover_text("Record for a fixed time and save automatically")
                    .clicked()
                {
                    actions.push(AppAction::StartTimedRecording(secs));
                }
            }
        }
    });
}

// ==================== Sessions ====================

pub fn render_session_list(
    ui: &mut Ui,
    sessions: &[SessionSummary],
    active_id: Option<&str>,
    actions: &mut Vec<AppAction>,
) {
    ui.horizontal(|ui| {
        ui.strong("Sessions");
        if ui.small_button("⟳").on_hover_text("Refresh").clicked() {
            actions.push(AppAction::RefreshSessions);
        }
    });

    if sessions.is_empty() {
        ui.label(RichText::new("No saved sessions").small().color(Color32::GRAY));
        return;
    }

    egui::ScrollArea::vertical()
        .id_salt("session_list")
        .max_height(260.0)
        .show(ui, |ui| {
            for summary in sessions {
                let active = active_id == Some(summary.id.as_str());
                ui.horizontal(|ui| {
                    let name = if summary.meta.name.is_empty() {
                        summary.id.as_str()
                    } else {
                        summary.meta.name.as_str()
                    };
                    let text = RichText::new(name);
                    ui.label(if active { text.strong() } else { text });
                    ui.label(
                        RichText::new(format!(
                            "{} · {}",
                            summary.meta.created_at.format("%m-%d %H:%M"),
                            format_duration(summary.meta.duration_ms)
                        ))
                        .small()
                        .color(Color32::GRAY),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("🗑").on_hover_text("Delete").clicked() {
                            actions.push(AppAction::DeleteSession(summary.id.clone()));
                        }
                        if ui.small_button("▶").on_hover_text("Play").clicked() {
                            actions.push(AppAction::PlaySession(summary.id.clone()));
                        }
                    });
                });
            }
        });
}

// ==================== Summary ====================

fn render_metrics(ui: &mut Ui, metrics: &SessionMetrics) {
    let m = metrics.rounded();
    ui.horizontal(|ui| {
        ui.label(
            RichText::new(format!("{:.0}", m.form_score))
                .size(32.0)
                .color(score_color(m.form_score)),
        );
        ui.vertical(|ui| {
            ui.label(RichText::new("FORM SCORE").small().color(Color32::GRAY));
            ui.label(RichText::new(m.ride_style.label()).strong().color(style_color(m.ride_style)));
        });
    });

    egui::Grid::new("summary_metrics")
        .num_columns(2)
        .spacing([12.0, 2.0])
        .show(ui, |ui| {
            card_row(ui, "Duration", format_duration(m.duration_s * 1000.0));
            card_row(ui, "Peak lean", format!("{:.1}°", m.peak_lean_deg));
            card_row(ui, "Turns", m.total_turns.to_string());
            card_row(ui, "Squat/carve sync", format!("{:.2}", m.squat_carve_sync));
            card_row(
                ui,
                "Slope avg / max",
                format!("{:.1}° / {:.1}° ({:.1} %)", m.avg_slope_deg, m.max_slope_deg, m.max_slope_pct),
            );
            card_row(
                ui,
                "Slope p50/p75/p90",
                format!("{:.1}° / {:.1}° / {:.1}°", m.slope_p50, m.slope_p75, m.slope_p90),
            );
            if m.has_accel_data {
                card_row(ui, "Max accel", format!("{:.2} m/s² ({:.2} g)", m.max_accel_mps2, m.max_accel_g));
                card_row(ui, "Est. top speed", format!("{:.1} km/h", m.max_speed_kph));
            }
        });
}

/// Post-recording summary with a name field
pub fn render_summary_window(ctx: &egui::Context, state: &mut SummaryState) -> Option<SummaryAction> {
    let mut action = None;
    egui::Window::new("Session Summary")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            match &state.recording.metrics {
                Some(metrics) => render_metrics(ui, metrics),
                None => {
                    ui.label("Not enough movement to score this ride.");
                }
            }
            ui.label(format!(
                "{} frames, {}",
                state.recording.session.frame_count(),
                format_duration(state.recording.session.duration_ms())
            ));

            ui.separator();
            ui.horizontal(|ui| {
                ui.label("Name");
                ui.add(
                    egui::TextEdit::singleline(&mut state.name)
                        .hint_text("date and time")
                        .desired_width(200.0),
                );
            });
            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    action = Some(SummaryAction::Save);
                }
                if ui.button("Discard").clicked() {
                    action = Some(SummaryAction::Discard);
                }
            });
        });
    action
}
