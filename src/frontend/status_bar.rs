//! Status bar panel: link status, sensor flags, playback mode and errors.

use egui::{Color32, RichText, Ui};

use crate::session::EngineState;
use crate::types::{ConnectionStatus, ImuStatus};

/// Context needed to render the status bar.
pub struct StatusBarContext<'a> {
    pub connection: ConnectionStatus,
    pub imu: ImuStatus,
    pub engine_state: EngineState,
    pub session_count: usize,
    pub notice: Option<&'a str>,
    pub last_error: Option<&'a str>,
}

fn sensor_dot(ui: &mut Ui, label: &str, connected: bool) {
    let color = if connected { Color32::GREEN } else { Color32::GRAY };
    ui.colored_label(color, "●");
    ui.label(RichText::new(label).small());
}

/// Render the status bar.
pub fn render_status_bar(ui: &mut Ui, ctx: &StatusBarContext<'_>) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        let status_color = match ctx.connection {
            ConnectionStatus::Connected => Color32::GREEN,
            ConnectionStatus::Connecting => Color32::YELLOW,
            ConnectionStatus::Disconnected => Color32::GRAY,
        };
        ui.colored_label(status_color, "●");
        ui.label(RichText::new(ctx.connection.to_string()).small());

        ui.separator();
        sensor_dot(ui, "Board", ctx.imu.board_connected);
        sensor_dot(ui, "Body", ctx.imu.body_connected);

        ui.separator();
        ui.label(RichText::new(ctx.engine_state.display_name()).small());

        ui.separator();
        ui.label(RichText::new(format!("Sessions: {}", ctx.session_count)).small());

        if let Some(notice) = ctx.notice {
            ui.separator();
            ui.label(RichText::new(notice).small().color(Color32::LIGHT_GREEN));
        }

        if let Some(error) = ctx.last_error {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.colored_label(Color32::RED, RichText::new(error).small());
            });
        }
    });
}
