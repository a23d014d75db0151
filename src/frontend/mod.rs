//! Frontend module for egui UI
//!
//! This module provides the desktop viewer. Each frame it drains link
//! events into the [`RideController`], ticks it with the wall-clock delta
//! and renders the solved pose with its cards.
//!
//! # Layout
//!
//! - Top: menu bar (File, View)
//! - Right: telemetry card, rider controls, manual pose sliders, recording, session list
//! - Bottom: status bar, playback transport and lean/squat plot
//! - Center: skeleton viewport
//!
//! # Submodules
//!
//! - `viewport` - Orthographic skeleton rendering
//! - `panels` - Cards returning [`AppAction`]s
//! - `plot` - Lean/squat plot with egui_plot
//! - `status_bar` - Bottom status line
//! - `state` - Action and dialog state types

mod panels;
mod plot;
pub mod state;
mod status_bar;
pub mod viewport;

pub use panels::{format_duration, score_color, style_color, SPEED_PRESETS};
pub use state::{AppAction, SummaryAction, SummaryState};

use std::time::{Duration, Instant};

use egui::Key;

use crate::config::AppState;
use crate::controller::RideController;
use crate::error::Result;
use crate::types::ConnectionStatus;
use status_bar::{render_status_bar, StatusBarContext};
use viewport::{render_viewport, ViewportOptions};

/// Repaint interval while nothing is moving, so link events still get drained
const IDLE_REPAINT: Duration = Duration::from_millis(100);

/// Main application state for the rider viewer
pub struct RideVisApp {
    controller: RideController,
    app_state: AppState,
    last_frame: Instant,
    summary: Option<SummaryState>,
    notice: Option<String>,
    last_error: Option<String>,
}

impl RideVisApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        controller: RideController,
        app_state: AppState,
    ) -> Self {
        if app_state.ui_preferences.dark_mode {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
        } else {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
        }

        Self {
            controller,
            app_state,
            last_frame: Instant::now(),
            summary: None,
            notice: None,
            last_error: None,
        }
    }

    fn report(&mut self, what: &str, result: Result<()>) {
        match result {
            Ok(()) => self.last_error = None,
            Err(e) => {
                tracing::warn!("{} failed: {}", what, e);
                self.last_error = Some(format!("{} failed: {}", what, e));
            }
        }
    }

    fn remember_session_dir(&mut self, path: &std::path::Path) {
        self.app_state.last_session_dir = path.parent().map(|p| p.to_path_buf());
    }

    fn handle_action(&mut self, action: AppAction) {
        tracing::debug!("UI action: {:?}", action);
        match action {
            AppAction::StartRecording => {
                self.notice = None;
                self.controller.start_recording();
            }
            AppAction::StartTimedRecording(secs) => {
                self.notice = None;
                self.controller.start_timed_recording(secs);
            }
            AppAction::StopRecording => match self.controller.stop_recording() {
                Ok(finished) => self.summary = Some(SummaryState::new(finished)),
                Err(e) => {
                    tracing::info!("Recording discarded: {}", e);
                    self.notice = Some(format!("Recording discarded: {}", e));
                }
            },
            AppAction::TogglePlay => {
                self.controller.toggle_play();
            }
            AppAction::SeekProgress(progress) => self.controller.seek_progress(progress),
            AppAction::SetSpeed(speed) => self.controller.set_speed(speed),
            AppAction::BackToLive => self.controller.back_to_live(),
            AppAction::RefreshSessions => {
                self.controller.request_sessions();
            }
            AppAction::PlaySession(id) => {
                self.controller.load_session(&id);
            }
            AppAction::DeleteSession(id) => {
                self.controller.delete_session(&id);
            }
            AppAction::SetStance(stance) => {
                self.controller.set_stance(stance);
            }
            AppAction::Calibrate => {
                self.controller.calibrate();
            }
            AppAction::SetManualSample(sample) => {
                self.controller.set_manual_sample(sample);
            }
            AppAction::ResetManualSample => {
                self.controller.reset_manual_sample();
            }
            AppAction::SetLive(enabled) => {
                self.controller.set_live_enabled(enabled);
            }
            AppAction::OpenCsv(path) => {
                let result = self.controller.load_csv(&path);
                if result.is_ok() {
                    self.app_state.last_csv_path = Some(path);
                }
                self.report("Opening CSV", result);
            }
            AppAction::ImportSession(path) => {
                self.remember_session_dir(&path);
                let result = self.controller.open_session_file(&path);
                self.report("Importing session", result);
            }
            AppAction::ExportSession(path) => {
                self.remember_session_dir(&path);
                let result = match self.controller.loaded_session() {
                    Some(session) => session.save_to_file(&path),
                    None => Ok(()),
                };
                self.report("Exporting session", result);
            }
        }
    }

    fn session_dialog(&self) -> rfd::FileDialog {
        let dialog = rfd::FileDialog::new().add_filter(
            "RideVis Session",
            &[crate::config::SESSION_FILE_EXTENSION],
        );
        match &self.app_state.last_session_dir {
            Some(dir) => dialog.set_directory(dir),
            None => dialog,
        }
    }

    fn render_menu_bar(&mut self, ctx: &egui::Context, actions: &mut Vec<AppAction>) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open CSV...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .set_title("Open Recording")
                            .add_filter("CSV", &["csv"])
                            .pick_file()
                        {
                            actions.push(AppAction::OpenCsv(path));
                        }
                        ui.close();
                    }
                    ui.separator();
                    if ui.button("Import Session...").clicked() {
                        if let Some(path) = self.session_dialog().set_title("Import Session").pick_file() {
                            actions.push(AppAction::ImportSession(path));
                        }
                        ui.close();
                    }
                    let can_export = self.controller.loaded_session().is_some();
                    if ui
                        .add_enabled(can_export, egui::Button::new("Export Session..."))
                        .clicked()
                    {
                        let file_name = self
                            .controller
                            .loaded_session()
                            .map(|s| export_file_name(&s.meta.name))
                            .unwrap_or_default();
                        if let Some(path) = self
                            .session_dialog()
                            .set_title("Export Session")
                            .set_file_name(file_name)
                            .save_file()
                        {
                            actions.push(AppAction::ExportSession(path));
                        }
                        ui.close();
                    }
                });

                ui.menu_button("View", |ui| {
                    let prefs = &mut self.app_state.ui_preferences;
                    ui.checkbox(&mut prefs.show_flow_path, "Flow path");
                    ui.checkbox(&mut prefs.show_joints, "Joints");
                    ui.checkbox(&mut prefs.show_trail, "Trail (session replay)");
                    if ui.checkbox(&mut prefs.dark_mode, "Dark mode").changed() {
                        let visuals = if prefs.dark_mode {
                            egui::Visuals::dark()
                        } else {
                            egui::Visuals::light()
                        };
                        ui.ctx().set_visuals(visuals);
                    }
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let live = self.controller.live_enabled();
                    let toggle_text = if live { "Live: ON" } else { "Live: OFF" };
                    if ui
                        .selectable_label(live, toggle_text)
                        .on_hover_text("Connect to or disconnect from the live feed")
                        .clicked()
                    {
                        actions.push(AppAction::SetLive(!live));
                    }
                    if self.controller.recorder().is_recording() {
                        ui.colored_label(panels::POOR_COLOR, "● REC");
                    }
                    if self.controller.is_calibrating(Instant::now()) {
                        ui.colored_label(panels::FAIR_COLOR, "CALIBRATING...");
                    } else if self.controller.connection() == ConnectionStatus::Connected {
                        ui.colored_label(panels::GOOD_COLOR, "LIVE");
                    }
                });
            });
        });
    }

    fn handle_keyboard_shortcuts(&mut self, ctx: &egui::Context, actions: &mut Vec<AppAction>) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let recorded = self.controller.engine().is_recorded();
        let connected = self.controller.connection() == ConnectionStatus::Connected;
        ctx.input(|i| {
            for key in [Key::Space, Key::Escape, Key::C] {
                if i.key_pressed(key) {
                    actions.extend(shortcut_action(key, recorded, connected));
                }
            }
        });
    }
}

/// Action bound to a key for the current playback and link state
fn shortcut_action(key: Key, recorded: bool, connected: bool) -> Option<AppAction> {
    match key {
        Key::Space if recorded => Some(AppAction::TogglePlay),
        Key::Escape if recorded => Some(AppAction::BackToLive),
        Key::C if connected => Some(AppAction::Calibrate),
        _ => None,
    }
}

/// File name offered when exporting a session
fn export_file_name(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let stem = if stem.is_empty() { "session".to_string() } else { stem };
    format!("{}.{}", stem, crate::config::SESSION_FILE_EXTENSION)
}

impl eframe::App for RideVisApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let delta = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;

        let had_events = self.controller.poll() > 0;
        if let Some(finished) = self.controller.tick(delta, now) {
            self.notice = Some(format!(
                "Timed recording saved ({} frames)",
                finished.session.frame_count()
            ));
        }
        if let Some(error) = self.controller.take_error() {
            self.last_error = Some(error);
        }

        let animating = self.controller.engine().is_playing()
            || self.controller.recorder().is_recording()
            || self.controller.is_calibrating(now)
            || self.controller.connection() == ConnectionStatus::Connected;
        if animating || had_events {
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(IDLE_REPAINT);
        }

        let mut actions = Vec::new();
        self.handle_keyboard_shortcuts(ctx, &mut actions);
        self.render_menu_bar(ctx, &mut actions);

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            render_status_bar(
                ui,
                &StatusBarContext {
                    connection: self.controller.connection(),
                    imu: self.controller.imu(),
                    engine_state: self.controller.engine().state(),
                    session_count: self.controller.sessions().len(),
                    notice: self.notice.as_deref(),
                    last_error: self.last_error.as_deref(),
                },
            );
        });

        egui::TopBottomPanel::bottom("transport")
            .resizable(true)
            .show(ctx, |ui| {
                let engine = self.controller.engine();
                panels::render_transport(ui, engine, &mut actions);
                if engine.is_recorded() {
                    plot::render_session_plot(ui, engine.frames(), engine.current_time_ms());
                }
            });

        egui::SidePanel::right("cards")
            .default_width(300.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let sample = self.controller.current_sample();
                    panels::render_telemetry_card(
                        ui,
                        &sample,
                        self.controller.pose(),
                        self.controller.carve(),
                        self.controller.rider().stance,
                    );
                    ui.separator();
                    panels::render_rider_controls(
                        ui,
                        self.controller.rider().stance,
                        self.controller.imu(),
                        &mut actions,
                    );
                    ui.separator();
                    panels::render_manual_controls(
                        ui,
                        &sample,
                        self.controller.manual_posing(),
                        &mut actions,
                    );
                    ui.separator();
                    let live = !self.controller.engine().is_recorded();
                    panels::render_recording_card(ui, self.controller.recorder(), live, &mut actions);
                    ui.separator();
                    panels::render_session_list(
                        ui,
                        self.controller.sessions(),
                        self.controller.engine().active_session_id(),
                        &mut actions,
                    );
                });
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let prefs = &self.app_state.ui_preferences;
                let flow_path = self.controller.flow_path();
                let trail = if prefs.show_trail {
                    self.controller.trail()
                } else {
                    None
                };
                render_viewport(
                    ui,
                    self.controller.pose(),
                    &flow_path,
                    trail.as_deref(),
                    ViewportOptions {
                        show_flow_path: prefs.show_flow_path,
                        show_joints: prefs.show_joints,
                    },
                );
            });

        if let Some(state) = self.summary.as_mut() {
            if let Some(choice) = panels::render_summary_window(ctx, state) {
                if let Some(state) = self.summary.take() {
                    match choice {
                        SummaryAction::Save => {
                            self.controller.save_session(state.recording.session, &state.name);
                        }
                        SummaryAction::Discard => tracing::info!("Recording discarded by user"),
                    }
                }
            }
        }

        for action in actions {
            self.handle_action(action);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Err(e) = self.app_state.save() {
            tracing::warn!("Failed to save app state: {}", e);
        }
    }
}
