// ============================================================================
// COMPARISON VIEWER — renders the active mode into the central panel
// ============================================================================
//
// Pure presentation: all coordinate math is delegated to `viewport` and
// `ops::compose`, all pixel math happens in background jobs owned by the
// app. The viewer reads textures and the `ViewportState`, feeds pointer
// input back into it, and reports a Retry click when a computed mode failed.

use egui::{
    Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Stroke, TextureHandle, pos2, vec2,
};

use crate::ops::compose::contain_rect;
use crate::viewport::{CompareMode, LOUPE_RADIUS, ViewportState};

const BACKDROP: Color32 = Color32::from_gray(16);
const PANE_BACKDROP: Color32 = Color32::from_gray(22);
const ACCENT: Color32 = Color32::from_rgb(56, 160, 255);
const CAPTION: Color32 = Color32::from_gray(170);
const ERROR_COLOR: Color32 = Color32::from_rgb(240, 90, 90);

/// State of a background-computed raster (difference / ELA).
pub enum ComputePhase<'a> {
    /// Nothing to show yet and no job running (e.g. images just changed).
    Idle,
    /// A job is in flight.
    Busy,
    /// Result texture ready to draw at its native size.
    Ready { texture: &'a TextureHandle, size: (u32, u32) },
    /// The job failed; the message is shown with a Retry action.
    Failed(&'a str),
}

pub struct ViewerInput<'a> {
    pub mode: CompareMode,
    pub tex_a: &'a TextureHandle,
    pub size_a: (u32, u32),
    pub tex_b: &'a TextureHandle,
    pub size_b: (u32, u32),
    pub diff: ComputePhase<'a>,
    pub ela_a: ComputePhase<'a>,
    pub ela_b: ComputePhase<'a>,
}

#[derive(Default)]
pub struct ViewerResponse {
    /// User clicked Retry on a failed computed mode.
    pub retry_clicked: bool,
}

/// Draw the active comparison mode and route pointer input into the
/// viewport state.
pub fn show(ui: &mut egui::Ui, vp: &mut ViewportState, input: &ViewerInput) -> ViewerResponse {
    let mut out = ViewerResponse::default();

    let sense = Sense::click_and_drag().union(Sense::hover());
    let (response, painter) = ui.allocate_painter(ui.available_size(), sense);
    let frame = response.rect;

    // ---- Pointer input -> viewport transitions -------------------------
    if response.hovered() && input.mode.zoom_enabled() {
        let scroll = ui.input(|i| i.scroll_delta.y);
        if scroll != 0.0 {
            vp.apply_scroll(input.mode, scroll);
        }
    }
    if response.dragged() {
        if input.mode == CompareMode::Slider {
            if let Some(pos) = response.interact_pointer_pos() {
                vp.drag_slider(pos.x, frame.left(), frame.width());
            }
        } else {
            vp.apply_pan(response.drag_delta());
        }
    }
    if input.mode == CompareMode::Loupe
        && let Some(pos) = response.hover_pos()
    {
        vp.set_cursor(pos2(pos.x - frame.left(), pos.y - frame.top()));
    }

    painter.rect_filled(frame, 0.0, BACKDROP);
    let painter = painter.with_clip_rect(frame);

    match input.mode {
        CompareMode::SideBySide => draw_side_by_side(&painter, frame, vp, input),
        CompareMode::Overlay => draw_overlay(&painter, frame, vp, input),
        CompareMode::Blink => draw_blink(&painter, frame, vp, input),
        CompareMode::Slider => draw_slider(&painter, frame, vp, input),
        CompareMode::Loupe => draw_loupe(&painter, frame, vp, input),
        CompareMode::Difference => {
            draw_computed_pane(ui, &painter, frame, vp, &input.diff, &mut out);
            caption(&painter, frame, "Highlighted pixels mark differences. Black = identical.");
        }
        CompareMode::Ela => draw_ela(ui, &painter, frame, input, &mut out),
    }

    out
}

// ---- Shared drawing helpers ------------------------------------------------

fn full_uv() -> Rect {
    Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0))
}

/// Apply the viewport transform to a contain-fit base rect: scale around the
/// frame center, then translate by the pan offset.
fn zoomed(base: Rect, vp: &ViewportState) -> Rect {
    Rect::from_center_size(base.center() + vp.pan, base.size() * vp.zoom)
}

/// Contain-fit `size` into `frame`, apply zoom/pan, draw.
fn draw_image(
    painter: &Painter,
    tex: &TextureHandle,
    size: (u32, u32),
    frame: Rect,
    vp: &ViewportState,
    tint: Color32,
) {
    let base = contain_rect(size.0, size.1, frame);
    painter.image(tex.id(), zoomed(base, vp), full_uv(), tint);
}

fn corner_label(painter: &Painter, frame: Rect, align: Align2, text: &str) {
    let pos = if align == Align2::LEFT_TOP {
        frame.left_top() + vec2(10.0, 10.0)
    } else {
        frame.right_top() + vec2(-10.0, 10.0)
    };
    painter.text(pos, align, text, FontId::proportional(13.0), CAPTION);
}

fn caption(painter: &Painter, frame: Rect, text: &str) {
    painter.text(
        frame.center_bottom() + vec2(0.0, -16.0),
        Align2::CENTER_BOTTOM,
        text,
        FontId::proportional(12.0),
        CAPTION,
    );
}

// ---- Per-mode renderers ----------------------------------------------------

fn draw_side_by_side(painter: &Painter, frame: Rect, vp: &ViewportState, input: &ViewerInput) {
    let gap = 2.0;
    let half_w = (frame.width() - gap) / 2.0;
    let left = Rect::from_min_size(frame.min, vec2(half_w, frame.height()));
    let right = Rect::from_min_size(pos2(frame.min.x + half_w + gap, frame.min.y), vec2(half_w, frame.height()));

    for (pane, tex, size, label, align) in [
        (left, input.tex_a, input.size_a, "Image A", Align2::LEFT_TOP),
        (right, input.tex_b, input.size_b, "Image B", Align2::RIGHT_TOP),
    ] {
        painter.rect_filled(pane, 0.0, PANE_BACKDROP);
        let clipped = painter.with_clip_rect(pane);
        draw_image(&clipped, tex, size, pane, vp, Color32::WHITE);
        corner_label(painter, pane, align, label);
    }
}

fn draw_overlay(painter: &Painter, frame: Rect, vp: &ViewportState, input: &ViewerInput) {
    draw_image(painter, input.tex_a, input.size_a, frame, vp, Color32::WHITE);
    let alpha = (vp.overlay_opacity * 255.0).round() as u8;
    let tint = Color32::from_rgba_unmultiplied(255, 255, 255, alpha);
    draw_image(painter, input.tex_b, input.size_b, frame, vp, tint);
}

fn draw_blink(painter: &Painter, frame: Rect, vp: &ViewportState, input: &ViewerInput) {
    let (tex, size, label) = if vp.blink_phase {
        (input.tex_b, input.size_b, "B")
    } else {
        (input.tex_a, input.size_a, "A")
    };
    draw_image(painter, tex, size, frame, vp, Color32::WHITE);
    painter.text(
        frame.center_top() + vec2(0.0, 14.0),
        Align2::CENTER_TOP,
        label,
        FontId::proportional(16.0),
        ACCENT,
    );
}

fn draw_slider(painter: &Painter, frame: Rect, vp: &ViewportState, input: &ViewerInput) {
    // Right image underneath, full frame.
    draw_image(painter, input.tex_b, input.size_b, frame, vp, Color32::WHITE);
    corner_label(painter, frame, Align2::RIGHT_TOP, "B");

    // Left image clipped to the pane; inside the pane it renders at
    // pane_width / fraction — the full container width — so the visible
    // portion keeps correct scale.
    let pane_w = vp.slider_pane_width(frame.width());
    if pane_w > 0.0 {
        let pane = Rect::from_min_size(frame.min, vec2(pane_w, frame.height()));
        let virtual_frame =
            Rect::from_min_size(frame.min, vec2(vp.slider_image_width(frame.width()), frame.height()));
        let clipped = painter.with_clip_rect(pane);
        clipped.rect_filled(pane, 0.0, PANE_BACKDROP);
        let base = contain_rect(input.size_a.0, input.size_a.1, virtual_frame);
        clipped.image(input.tex_a.id(), base, full_uv(), Color32::WHITE);
        corner_label(painter, pane, Align2::LEFT_TOP, "A");
    }

    // Divider and drag handle.
    let split_x = frame.left() + pane_w;
    painter.line_segment(
        [pos2(split_x, frame.top()), pos2(split_x, frame.bottom())],
        Stroke::new(2.0, ACCENT),
    );
    let handle = pos2(split_x, frame.center().y);
    painter.circle_filled(handle, 12.0, ACCENT);
    painter.circle_stroke(handle, 12.0, Stroke::new(2.0, Color32::WHITE));
    painter.text(handle, Align2::CENTER_CENTER, "⇔", FontId::proportional(13.0), Color32::WHITE);
}

fn draw_loupe(painter: &Painter, frame: Rect, vp: &ViewportState, input: &ViewerInput) {
    // Base image A, dimmed so the loupe content stands out.
    draw_image(painter, input.tex_a, input.size_a, frame, vp, Color32::from_gray(128));

    let inset_origin = vp.loupe_inset_origin();
    let inset = Rect::from_min_size(
        frame.min + vec2(inset_origin.x, inset_origin.y),
        vec2(LOUPE_RADIUS * 2.0, LOUPE_RADIUS * 2.0),
    );

    // Content inside the inset: image B laid out over the full frame,
    // offset by `-cursor + radius` so inset space aligns with full space.
    let content_origin = inset.min + vp.loupe_content_offset();
    let content_frame = Rect::from_min_size(content_origin, frame.size());
    let clipped = painter.with_clip_rect(inset.intersect(frame));
    clipped.rect_filled(inset, 0.0, Color32::BLACK);
    let base = contain_rect(input.size_b.0, input.size_b.1, content_frame);
    clipped.image(input.tex_b.id(), base, full_uv(), Color32::WHITE);

    // Crosshair + ring.
    let center = inset.center();
    clipped.line_segment(
        [pos2(inset.left(), center.y), pos2(inset.right(), center.y)],
        Stroke::new(1.0, ACCENT.gamma_multiply(0.4)),
    );
    clipped.line_segment(
        [pos2(center.x, inset.top()), pos2(center.x, inset.bottom())],
        Stroke::new(1.0, ACCENT.gamma_multiply(0.4)),
    );
    painter.circle_stroke(center, LOUPE_RADIUS, Stroke::new(3.0, ACCENT));

    caption(painter, frame, "Move the cursor to reveal Image B in detail");
}

fn draw_ela(
    ui: &mut egui::Ui,
    painter: &Painter,
    frame: Rect,
    input: &ViewerInput,
    out: &mut ViewerResponse,
) {
    let gap = 2.0;
    let half_w = (frame.width() - gap) / 2.0;
    let left = Rect::from_min_size(frame.min, vec2(half_w, frame.height()));
    let right = Rect::from_min_size(pos2(frame.min.x + half_w + gap, frame.min.y), vec2(half_w, frame.height()));

    // ELA panes ignore zoom/pan: the forensic pattern is read at fit scale.
    let vp_fit = ViewportState::new();
    for (pane, phase, label) in [(left, &input.ela_a, "ELA — Image A"), (right, &input.ela_b, "ELA — Image B")] {
        painter.rect_filled(pane, 0.0, PANE_BACKDROP);
        match phase {
            ComputePhase::Ready { texture, size } => {
                let clipped = painter.with_clip_rect(pane);
                draw_image(&clipped, texture, *size, pane, &vp_fit, Color32::WHITE);
            }
            ComputePhase::Busy => busy_indicator(ui, painter, pane, "Analyzing compression…"),
            ComputePhase::Failed(msg) => failure_pane(ui, painter, pane, msg, out),
            ComputePhase::Idle => {}
        }
        caption(painter, pane, label);
    }

    painter.text(
        frame.center_top() + vec2(0.0, 14.0),
        Align2::CENTER_TOP,
        "Bright areas carry a higher compression error level — an object glowing \
         against its background may have been inserted digitally.",
        FontId::proportional(12.0),
        CAPTION,
    );
}

fn draw_computed_pane(
    ui: &mut egui::Ui,
    painter: &Painter,
    frame: Rect,
    vp: &ViewportState,
    phase: &ComputePhase<'_>,
    out: &mut ViewerResponse,
) {
    match phase {
        ComputePhase::Ready { texture, size } => {
            draw_image(painter, texture, *size, frame, vp, Color32::WHITE);
        }
        ComputePhase::Busy => busy_indicator(ui, painter, frame, "Computing differences…"),
        ComputePhase::Failed(msg) => failure_pane(ui, painter, frame, msg, out),
        ComputePhase::Idle => {}
    }
}

fn busy_indicator(ui: &mut egui::Ui, painter: &Painter, frame: Rect, text: &str) {
    let spinner_rect = Rect::from_center_size(frame.center() - vec2(0.0, 14.0), vec2(28.0, 28.0));
    ui.put(spinner_rect, egui::Spinner::new().size(28.0));
    painter.text(
        frame.center() + vec2(0.0, 18.0),
        Align2::CENTER_CENTER,
        text,
        FontId::proportional(13.0),
        ACCENT,
    );
}

fn failure_pane(
    ui: &mut egui::Ui,
    painter: &Painter,
    frame: Rect,
    msg: &str,
    out: &mut ViewerResponse,
) {
    painter.text(
        frame.center() - vec2(0.0, 22.0),
        Align2::CENTER_CENTER,
        msg,
        FontId::proportional(13.0),
        ERROR_COLOR,
    );
    let button_rect = Rect::from_center_size(frame.center() + vec2(0.0, 14.0), vec2(80.0, 26.0));
    if ui.put(button_rect, egui::Button::new("Retry")).clicked() {
        out.retry_clicked = true;
    }
}

/// Cursor position helper for the status bar: container-local → readable.
pub fn format_cursor(pos: Pos2) -> String {
    format!("{:.0}, {:.0}", pos.x, pos.y)
}
