// ============================================================================
// VIEWPORT TRANSFORM MODEL — zoom / pan / slider / blink / loupe math
// ============================================================================
//
// All view state shared by the comparison modes lives here as one explicit
// value, and every mutation is a plain `(state, input) -> state` transition
// so the math is unit-testable without a rendering surface. The viewer only
// reads this state; the app owns it and feeds it pointer/timer input.

use egui::{Pos2, Vec2, pos2, vec2};

pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 8.0;
/// Zoom gained per scroll-wheel unit.
pub const ZOOM_SCROLL_SENSITIVITY: f32 = 0.01;
/// Zoom gained per toolbar +/- click.
pub const ZOOM_STEP: f32 = 0.5;

/// Floor for the slider fraction inside the width-compensation division.
/// The stored fraction may still reach 0.0 (handle parked at the far left);
/// only the division is guarded.
pub const MIN_SLIDER_FRACTION: f32 = 1e-3;

/// Half the side of the loupe inset, in device pixels.
pub const LOUPE_RADIUS: f32 = 128.0;

pub const MIN_BLINK_PERIOD_MS: u64 = 100;
pub const MAX_BLINK_PERIOD_MS: u64 = 1000;

/// The seven comparison rendering strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    Slider,
    SideBySide,
    Overlay,
    Blink,
    Loupe,
    Difference,
    Ela,
}

impl CompareMode {
    pub const ALL: [CompareMode; 7] = [
        CompareMode::Slider,
        CompareMode::SideBySide,
        CompareMode::Overlay,
        CompareMode::Blink,
        CompareMode::Loupe,
        CompareMode::Difference,
        CompareMode::Ela,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CompareMode::Slider => "Slider",
            CompareMode::SideBySide => "Side by Side",
            CompareMode::Overlay => "Overlay",
            CompareMode::Blink => "Blink",
            CompareMode::Loupe => "Loupe",
            CompareMode::Difference => "Difference",
            CompareMode::Ela => "ELA",
        }
    }

    /// Scroll zoom is a no-op in slider and loupe modes — the pointer is
    /// already claimed by the split handle / the magnifier there.
    pub fn zoom_enabled(self) -> bool {
        !matches!(self, CompareMode::Slider | CompareMode::Loupe)
    }

    /// Modes whose output raster is computed rather than drawn live.
    pub fn is_computed(self) -> bool {
        matches!(self, CompareMode::Difference | CompareMode::Ela)
    }
}

/// Shared view state, owned by the app and reset on every mode switch.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    /// Magnification; 1.0 = contain fit, no magnification.
    pub zoom: f32,
    /// Device-pixel offset accumulated while panning at zoom > 1.
    pub pan: Vec2,
    /// Horizontal split point for slider mode, 0..=1.
    pub slider_fraction: f32,
    /// Opacity of image B over image A in overlay mode, 0..=1.
    pub overlay_opacity: f32,
    /// Which image blink mode currently shows: false = A, true = B.
    pub blink_phase: bool,
    /// Blink flip interval.
    pub blink_period_ms: u64,
    /// Pointer position in container-local coordinates (loupe mode).
    pub cursor_pos: Pos2,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
            slider_fraction: 0.5,
            overlay_opacity: 0.5,
            blink_phase: false,
            blink_period_ms: 500,
            cursor_pos: Pos2::ZERO,
        }
    }
}

impl ViewportState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mode-switch transition: zoom and pan always return to rest, whatever
    /// the previous mode was. Slider/opacity/blink settings persist.
    pub fn on_mode_changed(&mut self) {
        self.reset_view();
    }

    pub fn reset_view(&mut self) {
        self.zoom = MIN_ZOOM;
        self.pan = Vec2::ZERO;
    }

    /// Continuous scroll-wheel zoom. Clamped to [1, 8]; landing back on
    /// exactly 1.0 clears any residual pan so fit scale is always centered.
    pub fn apply_scroll(&mut self, mode: CompareMode, scroll_delta: f32) {
        if !mode.zoom_enabled() {
            return;
        }
        self.set_zoom(self.zoom + scroll_delta * ZOOM_SCROLL_SENSITIVITY);
    }

    /// Toolbar zoom in/out by half steps.
    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - ZOOM_STEP);
    }

    fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if self.zoom == MIN_ZOOM {
            self.pan = Vec2::ZERO;
        }
    }

    /// Accumulate a pointer drag. Panning only exists while magnified.
    pub fn apply_pan(&mut self, delta: Vec2) {
        if self.zoom > MIN_ZOOM {
            self.pan += delta;
        }
    }

    /// Slider drag: map an absolute pointer x into the container and clamp.
    pub fn drag_slider(&mut self, pointer_x: f32, container_left: f32, container_width: f32) {
        if container_width <= 0.0 {
            return;
        }
        self.slider_fraction = ((pointer_x - container_left) / container_width).clamp(0.0, 1.0);
    }

    /// Width of the clipped left pane in slider mode.
    pub fn slider_pane_width(&self, container_width: f32) -> f32 {
        container_width * self.slider_fraction
    }

    /// Width at which the left image must render inside its clipped pane so
    /// the visible portion keeps correct scale: the pane is `fraction` wide,
    /// so the image is widened by `1 / fraction`. The division is guarded
    /// against a parked-at-zero handle.
    pub fn slider_image_width(&self, container_width: f32) -> f32 {
        self.slider_pane_width(container_width) / self.slider_fraction.max(MIN_SLIDER_FRACTION)
    }

    /// Timer tick in blink mode.
    pub fn tick_blink(&mut self) {
        self.blink_phase = !self.blink_phase;
    }

    pub fn set_blink_period(&mut self, ms: u64) {
        self.blink_period_ms = ms.clamp(MIN_BLINK_PERIOD_MS, MAX_BLINK_PERIOD_MS);
    }

    /// Track the raw pointer position (container-local) for the loupe.
    pub fn set_cursor(&mut self, pos: Pos2) {
        self.cursor_pos = pos;
    }

    /// Top-left corner of the loupe inset, container-local.
    pub fn loupe_inset_origin(&self) -> Pos2 {
        pos2(self.cursor_pos.x - LOUPE_RADIUS, self.cursor_pos.y - LOUPE_RADIUS)
    }

    /// Offset of the magnified content *inside* the inset: `-cursor + radius`
    /// cancels the inset's own origin so the content under the pointer in
    /// inset space is the content at the same spot in full space.
    pub fn loupe_content_offset(&self) -> Vec2 {
        vec2(
            -self.cursor_pos.x + LOUPE_RADIUS,
            -self.cursor_pos.y + LOUPE_RADIUS,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_zoom_never_leaves_bounds() {
        let mut vp = ViewportState::new();
        for delta in [500.0, 500.0, 10_000.0] {
            vp.apply_scroll(CompareMode::Overlay, delta);
            assert!(vp.zoom <= MAX_ZOOM);
        }
        assert_eq!(vp.zoom, MAX_ZOOM);
        for delta in [-300.0, -50_000.0, -1.0] {
            vp.apply_scroll(CompareMode::Overlay, delta);
            assert!(vp.zoom >= MIN_ZOOM);
        }
        assert_eq!(vp.zoom, MIN_ZOOM);
    }

    #[test]
    fn returning_to_fit_scale_clears_pan() {
        let mut vp = ViewportState::new();
        vp.apply_scroll(CompareMode::Blink, 400.0);
        vp.apply_pan(vec2(50.0, 30.0));
        assert_ne!(vp.pan, Vec2::ZERO);
        vp.apply_scroll(CompareMode::Blink, -10_000.0);
        assert_eq!(vp.zoom, MIN_ZOOM);
        assert_eq!(vp.pan, Vec2::ZERO);
    }

    #[test]
    fn zoom_is_disabled_in_slider_and_loupe_modes() {
        for mode in [CompareMode::Slider, CompareMode::Loupe] {
            let mut vp = ViewportState::new();
            vp.apply_scroll(mode, 1000.0);
            assert_eq!(vp.zoom, MIN_ZOOM, "{:?}", mode);
        }
    }

    #[test]
    fn pan_is_a_noop_at_fit_scale() {
        let mut vp = ViewportState::new();
        vp.apply_pan(vec2(10.0, -4.0));
        assert_eq!(vp.pan, Vec2::ZERO);
    }

    #[test]
    fn pan_accumulates_move_deltas_while_magnified() {
        let mut vp = ViewportState::new();
        vp.zoom_in();
        vp.apply_pan(vec2(10.0, 5.0));
        vp.apply_pan(vec2(-3.0, 2.0));
        assert_eq!(vp.pan, vec2(7.0, 7.0));
    }

    #[test]
    fn toolbar_zoom_steps_clamp_like_scroll() {
        let mut vp = ViewportState::new();
        for _ in 0..30 {
            vp.zoom_in();
        }
        assert_eq!(vp.zoom, MAX_ZOOM);
        for _ in 0..30 {
            vp.zoom_out();
        }
        assert_eq!(vp.zoom, MIN_ZOOM);
        assert_eq!(vp.pan, Vec2::ZERO);
    }

    #[test]
    fn mode_switch_resets_zoom_and_pan() {
        let mut vp = ViewportState::new();
        vp.set_zoom(4.0);
        vp.apply_pan(vec2(50.0, 30.0));
        vp.on_mode_changed();
        assert_eq!(vp.zoom, 1.0);
        assert_eq!(vp.pan, Vec2::ZERO);
    }

    #[test]
    fn slider_clamps_outside_container_bounds() {
        let mut vp = ViewportState::new();
        vp.drag_slider(-200.0, 100.0, 400.0);
        assert_eq!(vp.slider_fraction, 0.0);
        vp.drag_slider(9_999.0, 100.0, 400.0);
        assert_eq!(vp.slider_fraction, 1.0);
        vp.drag_slider(200.0, 100.0, 400.0);
        assert_eq!(vp.slider_fraction, 0.25);
    }

    #[test]
    fn slider_width_compensation_restores_full_scale() {
        let mut vp = ViewportState::new();
        vp.slider_fraction = 0.25;
        // Pane is a quarter of the container; the image inside is widened
        // by 1/0.25 back to the full container width.
        assert_eq!(vp.slider_pane_width(800.0), 200.0);
        assert!((vp.slider_image_width(800.0) - 800.0).abs() < 0.01);
    }

    #[test]
    fn slider_at_zero_is_guarded_not_infinite() {
        let mut vp = ViewportState::new();
        vp.slider_fraction = 0.0;
        let w = vp.slider_image_width(800.0);
        assert!(w.is_finite());
        assert_eq!(w, 0.0); // empty pane renders nothing, but never NaN/inf
    }

    #[test]
    fn blink_phase_alternates() {
        let mut vp = ViewportState::new();
        assert!(!vp.blink_phase);
        vp.tick_blink();
        assert!(vp.blink_phase);
        vp.tick_blink();
        assert!(!vp.blink_phase);
    }

    #[test]
    fn blink_period_clamps_to_supported_range() {
        let mut vp = ViewportState::new();
        vp.set_blink_period(20);
        assert_eq!(vp.blink_period_ms, MIN_BLINK_PERIOD_MS);
        vp.set_blink_period(30_000);
        assert_eq!(vp.blink_period_ms, MAX_BLINK_PERIOD_MS);
    }

    #[test]
    fn loupe_content_cancels_inset_origin() {
        let mut vp = ViewportState::new();
        vp.set_cursor(pos2(310.0, 140.0));
        let origin = vp.loupe_inset_origin();
        let offset = vp.loupe_content_offset();
        // Inset origin plus content offset lands on the container origin,
        // i.e. the inset shows the second image aligned with full space.
        assert_eq!(origin.x + offset.x, 0.0);
        assert_eq!(origin.y + offset.y, 0.0);
    }
}
