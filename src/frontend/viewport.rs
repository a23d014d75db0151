//! Skeleton viewport
//!
//! Draws the solved pose with a fixed orthographic three-quarter
//! projection straight onto an egui painter. World axes: Z up, Y along the
//! direction of travel, X toward the rider's facing side.

use egui::{Color32, Pos2, Rect, Sense, Shape, Stroke, Ui, Vec2};
use nalgebra::Point3;

use crate::pose::{Bone, Landmark, Pose, TrailPoint};

/// Fixed camera yaw around Z (radians)
const CAMERA_AZIMUTH: f64 = 0.65;

/// Fixed camera pitch looking down (radians)
const CAMERA_ELEVATION: f64 = 0.35;

/// World height fitted to the viewport height
const VIEW_HEIGHT_M: f32 = 2.2;

/// Ground plane grid half extent and spacing (metres)
const GRID_EXTENT: f64 = 1.0;
const GRID_STEP: f64 = 0.25;

const BOARD_COLOR: Color32 = Color32::from_rgb(0x74, 0xb9, 0xff);
const LEG_COLOR: Color32 = Color32::from_rgb(0x00, 0xce, 0xc9);
const TORSO_COLOR: Color32 = Color32::from_rgb(0xdf, 0xe6, 0xe9);
const ARM_COLOR: Color32 = Color32::from_rgb(0xfd, 0xcb, 0x6e);
const CHEST_COLOR: Color32 = Color32::from_rgb(0xff, 0x76, 0x75);
const FLOW_COLOR: Color32 = Color32::from_rgba_premultiplied(0x00, 0xb8, 0x6a, 0xb0);
const TRAIL_COLOR: Color32 = Color32::from_rgb(0x00, 0xe5, 0xff);
const GRID_COLOR: Color32 = Color32::from_rgba_premultiplied(0x40, 0x40, 0x48, 0x80);

/// Orthographic projection from world metres to screen points
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    azimuth: f64,
    elevation: f64,
    /// Screen points per metre
    scale: f32,
    /// Screen position of the world origin
    origin: Pos2,
}

impl Projection {
    pub fn new(azimuth: f64, elevation: f64, scale: f32, origin: Pos2) -> Self {
        Self {
            azimuth,
            elevation,
            scale,
            origin,
        }
    }

    /// Fit the default three-quarter view into `rect`, ground near the bottom
    pub fn fit(rect: Rect) -> Self {
        let scale = rect.height() / VIEW_HEIGHT_M;
        let origin = Pos2::new(rect.center().x, rect.bottom() - rect.height() * 0.18);
        Self::new(CAMERA_AZIMUTH, CAMERA_ELEVATION, scale, origin)
    }

    pub fn project(&self, p: &Point3<f64>) -> Pos2 {
        let (sa, ca) = self.azimuth.sin_cos();
        let (se, ce) = self.elevation.sin_cos();
        let right = ca * p.x - sa * p.y;
        let depth = sa * p.x + ca * p.y;
        let up = p.z * ce + depth * se;
        Pos2::new(
            self.origin.x + right as f32 * self.scale,
            self.origin.y - up as f32 * self.scale,
        )
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

/// Display toggles
#[derive(Debug, Clone, Copy)]
pub struct ViewportOptions {
    pub show_flow_path: bool,
    pub show_joints: bool,
}

fn bone_color(bone: Bone) -> Color32 {
    match bone {
        Bone::LeftShin | Bone::RightShin | Bone::LeftThigh | Bone::RightThigh => LEG_COLOR,
        Bone::Torso | Bone::Neck | Bone::Shoulders => TORSO_COLOR,
        Bone::LeftUpperArm | Bone::RightUpperArm | Bone::LeftForearm | Bone::RightForearm => {
            ARM_COLOR
        }
        Bone::ChestNormal => CHEST_COLOR,
    }
}

/// Allocate the remaining space and draw the pose into it
pub fn render_viewport(
    ui: &mut Ui,
    pose: &Pose,
    flow_path: &[Point3<f64>],
    trail: Option<&[TrailPoint]>,
    options: ViewportOptions,
) {
    let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::hover());
    let rect = response.rect;
    painter.rect_filled(rect, 0.0, Color32::from_rgb(0x12, 0x14, 0x1a));

    let proj = Projection::fit(rect);
    let mut shapes = Vec::new();

    // Ground grid
    let lines = (GRID_EXTENT * 2.0 / GRID_STEP).round() as i32;
    for i in 0..=lines {
        let d = -GRID_EXTENT + i as f64 * GRID_STEP;
        shapes.push(Shape::line_segment(
            [
                proj.project(&Point3::new(d, -GRID_EXTENT, 0.0)),
                proj.project(&Point3::new(d, GRID_EXTENT, 0.0)),
            ],
            Stroke::new(1.0, GRID_COLOR),
        ));
        shapes.push(Shape::line_segment(
            [
                proj.project(&Point3::new(-GRID_EXTENT, d, 0.0)),
                proj.project(&Point3::new(GRID_EXTENT, d, 0.0)),
            ],
            Stroke::new(1.0, GRID_COLOR),
        ));
    }

    if let Some(trail) = trail {
        shapes.extend(trail_shapes(&proj, trail));
    }

    if options.show_flow_path && flow_path.len() > 1 {
        let points = flow_path.iter().map(|p| proj.project(p)).collect();
        shapes.push(Shape::line(points, Stroke::new(3.0, FLOW_COLOR)));
    }

    // Board deck
    let outline: Vec<Pos2> = pose.board_outline().iter().map(|p| proj.project(p)).collect();
    shapes.push(Shape::convex_polygon(
        outline[..4].to_vec(),
        BOARD_COLOR.gamma_multiply(0.35),
        Stroke::new(2.0, BOARD_COLOR),
    ));

    for segment in pose.renderable_segments() {
        let width = if segment.bone == Bone::ChestNormal { 2.0 } else { 4.0 };
        shapes.push(Shape::line_segment(
            [proj.project(&segment.start), proj.project(&segment.end)],
            Stroke::new(width, bone_color(segment.bone)),
        ));
    }

    if options.show_joints {
        for landmark in Landmark::JOINTS {
            let radius = if landmark == Landmark::Head { 0.09 } else { 0.025 };
            shapes.push(Shape::circle_filled(
                proj.project(&pose.landmark(landmark)),
                (radius as f32 * proj.scale()).max(2.0),
                TORSO_COLOR,
            ));
        }
    }

    painter.extend(shapes);

    painter.text(
        rect.left_top() + Vec2::new(8.0, 8.0),
        egui::Align2::LEFT_TOP,
        format!("knee {:.0}°", pose.knee_angle_deg),
        egui::FontId::monospace(12.0),
        Color32::GRAY,
    );
}

/// Fading quads between consecutive ribbon cross-sections
fn trail_shapes(proj: &Projection, trail: &[TrailPoint]) -> Vec<Shape> {
    trail
        .windows(2)
        .map(|pair| {
            let (near, far) = (pair[0], pair[1]);
            let fill = TRAIL_COLOR.gamma_multiply((near.alpha * 0.35) as f32);
            Shape::convex_polygon(
                vec![
                    proj.project(&near.ground),
                    proj.project(&far.ground),
                    proj.project(&far.top),
                    proj.project(&near.top),
                ],
                fill,
                Stroke::NONE,
            )
        })
        .collect()
}
