// ============================================================================
// DIFFERENCE ENGINE — per-pixel visual delta between two images
// ============================================================================
//
// Both sources are contain-fitted into a shared frame sized to the larger of
// each dimension, then compared channel-wise. Matching pixels come out opaque
// black; differing pixels keep their channel deltas with a fixed red bias so
// even low-magnitude changes read as reddish against the black field.

use image::RgbaImage;
use rayon::prelude::*;

use super::ProcessError;
use super::compose::draw_contain;

/// Channel deltas summing to this or less are treated as sensor/resample
/// noise and rendered black.
pub const NOISE_THRESHOLD: u16 = 10;

/// Added to the red channel of every above-threshold pixel.
pub const RED_BIAS: u16 = 100;

/// Compute the difference raster for two images of possibly different native
/// resolutions. The output is `max(widths) × max(heights)`; each source gets
/// its own independent contain-fit placement inside that frame, so sources
/// with different aspect ratios are not pixel-aligned.
///
/// The `+100` red bias saturates at 255 (e.g. a full-scale red delta of 255
/// is 355 before the clamp). Output alpha is always 255.
pub fn compute_difference(a: &RgbaImage, b: &RgbaImage) -> Result<RgbaImage, ProcessError> {
    if a.width() == 0 || a.height() == 0 || b.width() == 0 || b.height() == 0 {
        return Err(ProcessError::Processing(
            "cannot diff a zero-sized image".to_string(),
        ));
    }

    let w = a.width().max(b.width());
    let h = a.height().max(b.height());

    let frame_a = draw_contain(a, w, h);
    let frame_b = draw_contain(b, w, h);
    let raw_a = frame_a.as_raw();
    let raw_b = frame_b.as_raw();

    let stride = w as usize * 4;
    let mut out = vec![0u8; stride * h as usize];

    // Parallel by row.
    out.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_a = &raw_a[y * stride..(y + 1) * stride];
        let row_b = &raw_b[y * stride..(y + 1) * stride];
        for x in 0..w as usize {
            let i = x * 4;
            let px = diff_pixel(&row_a[i..i + 4], &row_b[i..i + 4]);
            row_out[i..i + 4].copy_from_slice(&px);
        }
    });

    RgbaImage::from_raw(w, h, out)
        .ok_or_else(|| ProcessError::Processing("difference buffer size mismatch".to_string()))
}

/// Compare one RGBA pixel pair. Order-independent in the channel deltas.
#[inline]
fn diff_pixel(pa: &[u8], pb: &[u8]) -> [u8; 4] {
    // Regions outside both contain-fit placements carry no content to
    // compare — render them as background black rather than "different".
    if pa[3] == 0 && pb[3] == 0 {
        return [0, 0, 0, 255];
    }

    let rd = pa[0].abs_diff(pb[0]);
    let gd = pa[1].abs_diff(pb[1]);
    let bd = pa[2].abs_diff(pb[2]);

    if rd as u16 + gd as u16 + bd as u16 > NOISE_THRESHOLD {
        [(rd as u16 + RED_BIAS).min(255) as u8, gd, bd, 255]
    } else {
        [0, 0, 0, 255]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn flat(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(px))
    }

    #[test]
    fn identical_images_yield_all_black() {
        let a = flat(8, 6, [120, 50, 200, 255]);
        let out = compute_difference(&a, &a).unwrap();
        assert_eq!(out.dimensions(), (8, 6));
        assert!(out.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn argument_order_does_not_change_magnitudes() {
        let a = flat(4, 4, [200, 90, 10, 255]);
        let b = flat(4, 4, [50, 140, 250, 255]);
        let ab = compute_difference(&a, &b).unwrap();
        let ba = compute_difference(&b, &a).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn threshold_boundary_total_10_is_suppressed() {
        let a = flat(2, 2, [100, 100, 100, 255]);
        let b = flat(2, 2, [104, 103, 103, 255]); // deltas 4+3+3 = 10
        let out = compute_difference(&a, &b).unwrap();
        assert!(out.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn threshold_boundary_total_11_is_highlighted() {
        let a = flat(2, 2, [100, 100, 100, 255]);
        let b = flat(2, 2, [104, 104, 103, 255]); // deltas 4+4+3 = 11
        let out = compute_difference(&a, &b).unwrap();
        // Red channel carries the bias: 4 + 100.
        assert!(out.pixels().all(|p| *p == Rgba([104, 4, 3, 255])));
    }

    #[test]
    fn solid_red_vs_solid_blue() {
        let a = flat(4, 4, [255, 0, 0, 255]);
        let b = flat(4, 4, [0, 0, 255, 255]);
        let out = compute_difference(&a, &b).unwrap();
        // Deltas: rd = 255, gd = 0, bd = 255. The red bias takes the red
        // output to 355 before saturation:
        assert_eq!(255u16 + RED_BIAS, 355);
        // ... which clamps to 255 under the documented saturate policy.
        assert!(out.pixels().all(|p| *p == Rgba([255, 0, 255, 255])));
    }

    #[test]
    fn mismatched_sizes_use_max_frame_and_black_out_shared_gaps() {
        // A is 2×4 (centered horizontally), B is 4×2 (centered vertically)
        // inside the shared 4×4 frame. The four corners fall outside both
        // placements: fully transparent in both, rendered opaque black.
        let a = flat(2, 4, [255, 255, 255, 255]);
        let b = flat(4, 2, [255, 255, 255, 255]);
        let out = compute_difference(&a, &b).unwrap();
        assert_eq!(out.dimensions(), (4, 4));
        for (x, y) in [(0, 0), (3, 0), (0, 3), (3, 3)] {
            assert_eq!(*out.get_pixel(x, y), BLACK);
        }
        // Where only one image has content, the delta is full-scale white
        // against transparent black: 255+255+255 with the red bias clamped.
        assert_eq!(*out.get_pixel(0, 1), Rgba([255, 255, 255, 255]));
        // Overlap of both solids is identical → suppressed.
        assert_eq!(*out.get_pixel(1, 1), BLACK);
    }

    #[test]
    fn zero_sized_input_is_rejected() {
        let a = RgbaImage::new(0, 0);
        let b = flat(4, 4, [1, 2, 3, 255]);
        assert!(compute_difference(&a, &b).is_err());
    }
}
