// ============================================================================
// ERROR LEVEL ANALYSIS — compression-residual forensic view
// ============================================================================
//
// The image is re-encoded through the JPEG codec at reduced quality and the
// per-channel residual against the original is amplified. Untouched regions
// of an already-compressed image re-encode with near-zero residual; regions
// pasted in later carry a different compression history and light up. The
// brightness *pattern* is the signal, not the exact values.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use rayon::prelude::*;

use super::ProcessError;

/// Default JPEG re-encode quality (percent).
pub const DEFAULT_QUALITY: u8 = 90;

/// Default residual amplification factor.
pub const DEFAULT_SCALE: u32 = 40;

/// Compute the ELA raster for a single image.
///
/// `quality` is a JPEG quality percent (clamped to 1..=100); `scale`
/// multiplies each residual channel. Amplified values are clamped to 255 on
/// write and alpha is forced opaque. Output dimensions equal the input's.
pub fn compute_ela(img: &RgbaImage, quality: u8, scale: u32) -> Result<RgbaImage, ProcessError> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(ProcessError::Processing(
            "cannot analyze a zero-sized image".to_string(),
        ));
    }

    // JPEG carries no alpha; the residual is defined over RGB only.
    let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();

    let mut encoded: Vec<u8> = Vec::new();
    let mut encoder =
        JpegEncoder::new_with_quality(Cursor::new(&mut encoded), quality.clamp(1, 100));
    encoder
        .encode(rgb.as_raw(), w, h, image::ColorType::Rgb8)
        .map_err(|e| ProcessError::Processing(format!("JPEG re-encode failed: {}", e)))?;

    let recompressed = image::load_from_memory(&encoded)
        .map_err(|e| ProcessError::Processing(format!("JPEG decode-back failed: {}", e)))?
        .to_rgb8();
    if recompressed.dimensions() != (w, h) {
        return Err(ProcessError::Processing(
            "re-encoded image changed dimensions".to_string(),
        ));
    }

    let orig_raw = rgb.as_raw();
    let recomp_raw = recompressed.as_raw();
    let src_stride = w as usize * 3;
    let out_stride = w as usize * 4;
    let mut out = vec![0u8; out_stride * h as usize];

    out.par_chunks_mut(out_stride).enumerate().for_each(|(y, row_out)| {
        let row_o = &orig_raw[y * src_stride..(y + 1) * src_stride];
        let row_r = &recomp_raw[y * src_stride..(y + 1) * src_stride];
        for x in 0..w as usize {
            let si = x * 3;
            let di = x * 4;
            for c in 0..3 {
                row_out[di + c] =
                    amplified_residual(row_o[si + c], row_r[si + c], scale).min(255) as u8;
            }
            row_out[di + 3] = 255;
        }
    });

    RgbaImage::from_raw(w, h, out)
        .ok_or_else(|| ProcessError::Processing("ELA buffer size mismatch".to_string()))
}

/// Unclamped amplified residual for one channel. The caller clamps on write;
/// keeping the raw arithmetic separate makes scale linearity observable.
#[inline]
fn amplified_residual(original: u8, recompressed: u8, scale: u32) -> u32 {
    original.abs_diff(recompressed) as u32 * scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn flat_image_at_top_quality_has_near_zero_residual() {
        // A uniform field is DC-only: the round trip through the codec's
        // color transform may wobble a channel by a couple of counts, but
        // at quality 100 and scale 1 everything stays near black.
        let img = RgbaImage::from_pixel(32, 32, Rgba([90, 140, 200, 255]));
        let out = compute_ela(&img, 100, 1).unwrap();
        assert_eq!(out.dimensions(), (32, 32));
        for p in out.pixels() {
            assert!(p[0] <= 4 && p[1] <= 4 && p[2] <= 4, "residual too large: {:?}", p);
            assert_eq!(p[3], 255);
        }
    }

    #[test]
    fn alpha_is_forced_opaque() {
        let img = RgbaImage::from_pixel(16, 16, Rgba([10, 20, 30, 0]));
        let out = compute_ela(&img, 80, DEFAULT_SCALE).unwrap();
        assert!(out.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn doubling_scale_doubles_the_unclamped_residual() {
        for (o, r) in [(10u8, 13u8), (200, 190), (0, 255), (77, 77)] {
            let once = amplified_residual(o, r, DEFAULT_SCALE);
            let twice = amplified_residual(o, r, DEFAULT_SCALE * 2);
            assert_eq!(twice, once * 2);
        }
    }

    #[test]
    fn residual_is_order_independent() {
        assert_eq!(amplified_residual(30, 90, 5), amplified_residual(90, 30, 5));
    }

    #[test]
    fn output_matches_input_dimensions() {
        let img = RgbaImage::from_pixel(21, 13, Rgba([1, 2, 3, 255]));
        let out = compute_ela(&img, DEFAULT_QUALITY, DEFAULT_SCALE).unwrap();
        assert_eq!(out.dimensions(), (21, 13));
    }

    #[test]
    fn zero_sized_input_is_rejected() {
        let img = RgbaImage::new(0, 5);
        assert!(compute_ela(&img, DEFAULT_QUALITY, DEFAULT_SCALE).is_err());
    }
}
