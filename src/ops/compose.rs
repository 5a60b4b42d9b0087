// ============================================================================
// CONTAIN-FIT COMPOSITOR — place an arbitrary raster inside a fixed frame
// ============================================================================
//
// "Contain" fit: scale the source to the largest size that fits entirely
// inside the target frame while preserving aspect ratio, then center it.
// Both comparison engines render their inputs through this before doing any
// per-pixel work, and the viewer uses the same math to place textures.

use image::{RgbaImage, imageops};

/// Where a source raster lands inside a target frame under contain fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainPlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Uniform scale factor applied to the source (may exceed 1.0).
    pub scale: f32,
}

/// Compute the contain-fit placement of a `src_w × src_h` source inside a
/// `target_w × target_h` frame: `scale = min(tw/sw, th/sh)`, centered.
pub fn contain_placement(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> ContainPlacement {
    if src_w == 0 || src_h == 0 || target_w == 0 || target_h == 0 {
        return ContainPlacement { x: 0.0, y: 0.0, width: 0.0, height: 0.0, scale: 0.0 };
    }
    let scale = (target_w as f32 / src_w as f32).min(target_h as f32 / src_h as f32);
    let width = src_w as f32 * scale;
    let height = src_h as f32 * scale;
    ContainPlacement {
        x: (target_w as f32 - width) / 2.0,
        y: (target_h as f32 - height) / 2.0,
        width,
        height,
        scale,
    }
}

/// Contain-fit a source of the given dimensions inside an on-screen frame.
/// Same math as [`contain_placement`], expressed in egui screen coordinates.
pub fn contain_rect(src_w: u32, src_h: u32, frame: egui::Rect) -> egui::Rect {
    if src_w == 0 || src_h == 0 {
        return egui::Rect::from_min_size(frame.min, egui::Vec2::ZERO);
    }
    let scale = (frame.width() / src_w as f32).min(frame.height() / src_h as f32);
    let size = egui::vec2(src_w as f32 * scale, src_h as f32 * scale);
    egui::Rect::from_center_size(frame.center(), size)
}

/// Render `src` into a fresh transparent `target_w × target_h` frame at its
/// contain-fit placement. Bilinear resample; 1:1 fast path when the source
/// already matches the frame.
pub fn draw_contain(src: &RgbaImage, target_w: u32, target_h: u32) -> RgbaImage {
    if src.width() == target_w && src.height() == target_h {
        return src.clone();
    }

    let mut frame = RgbaImage::new(target_w, target_h); // zeroed = fully transparent

    let p = contain_placement(src.width(), src.height(), target_w, target_h);
    if p.scale == 0.0 {
        return frame;
    }

    let scaled_w = (p.width.round() as u32).max(1);
    let scaled_h = (p.height.round() as u32).max(1);
    if scaled_w == src.width() && scaled_h == src.height() {
        // Scale is 1:1 — centering only, no resample.
        imageops::overlay(&mut frame, src, p.x.round() as i64, p.y.round() as i64);
    } else {
        let scaled = imageops::resize(src, scaled_w, scaled_h, imageops::FilterType::Triangle);
        imageops::overlay(&mut frame, &scaled, p.x.round() as i64, p.y.round() as i64);
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn scale_is_min_axis_ratio() {
        let p = contain_placement(200, 100, 100, 100);
        assert_eq!(p.scale, 0.5);
        assert_eq!(p.width, 100.0);
        assert_eq!(p.height, 50.0);
    }

    #[test]
    fn placement_is_centered() {
        let p = contain_placement(200, 100, 100, 100);
        assert_eq!(p.x, 0.0);
        assert_eq!(p.y, 25.0);

        let p = contain_placement(50, 100, 100, 100);
        assert_eq!(p.x, 25.0);
        assert_eq!(p.y, 0.0);
    }

    #[test]
    fn scaled_dimensions_never_exceed_target() {
        for (sw, sh, tw, th) in [(3, 7, 10, 10), (640, 480, 100, 300), (1, 1, 9, 4), (500, 500, 50, 80)] {
            let p = contain_placement(sw, sh, tw, th);
            assert!(p.width <= tw as f32 + 0.001, "{}x{} in {}x{}", sw, sh, tw, th);
            assert!(p.height <= th as f32 + 0.001, "{}x{} in {}x{}", sw, sh, tw, th);
        }
    }

    #[test]
    fn upscaling_is_allowed() {
        // Contain fit may scale up: a small source fills the frame.
        let p = contain_placement(10, 10, 40, 80);
        assert_eq!(p.scale, 4.0);
    }

    #[test]
    fn draw_contain_identity_when_sizes_match() {
        let mut src = RgbaImage::new(4, 4);
        src.put_pixel(1, 2, Rgba([10, 20, 30, 255]));
        let out = draw_contain(&src, 4, 4);
        assert_eq!(out, src);
    }

    #[test]
    fn draw_contain_leaves_borders_transparent() {
        // 2×4 source in a 4×4 frame: 1:1 scale, centered horizontally,
        // so columns 0 and 3 stay fully transparent.
        let src = RgbaImage::from_pixel(2, 4, Rgba([255, 0, 0, 255]));
        let out = draw_contain(&src, 4, 4);
        for y in 0..4 {
            assert_eq!(out.get_pixel(0, y)[3], 0);
            assert_eq!(out.get_pixel(3, y)[3], 0);
            assert_eq!(*out.get_pixel(1, y), Rgba([255, 0, 0, 255]));
            assert_eq!(*out.get_pixel(2, y), Rgba([255, 0, 0, 255]));
        }
    }

    #[test]
    fn zero_sized_source_yields_blank_frame() {
        let src = RgbaImage::new(0, 0);
        let out = draw_contain(&src, 3, 3);
        assert_eq!(out.dimensions(), (3, 3));
        assert!(out.pixels().all(|p| p[3] == 0));
    }
}
