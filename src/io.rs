// ============================================================================
// IMAGE IO — decoding into comparison slots, encoding result rasters
// ============================================================================

use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, RgbaImage};

use crate::ops::ProcessError;

/// File extensions accepted by the open dialogs and drag-and-drop.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "tif", "tiff"];

pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

/// A decoded comparison input: the RGBA raster plus display-only file
/// metadata. The pixel buffer invariant (`len == w * h * 4`) is upheld by
/// the `image` crate's decoder.
#[derive(Debug)]
pub struct LoadedImage {
    pub pixels: RgbaImage,
    pub width: u32,
    pub height: u32,
    pub name: String,
    pub path: PathBuf,
    pub file_size: u64,
    /// Uppercase format tag for the status bar ("PNG", "JPEG", ...).
    pub format: String,
}

/// Decode an image file into a comparison slot. Synchronous — the app wraps
/// this in a background job, the CLI calls it directly.
pub fn load_image(path: &Path) -> Result<LoadedImage, ProcessError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !ext.is_empty() && !is_supported_extension(&ext) {
        return Err(ProcessError::Decode(format!(
            "unsupported file type \".{}\"",
            ext
        )));
    }

    let pixels = image::open(path)
        .map_err(|e| ProcessError::Decode(e.to_string()))?
        .to_rgba8();

    let (width, height) = pixels.dimensions();
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("image")
        .to_string();
    let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let format = match ext.as_str() {
        "jpg" | "jpeg" => "JPEG".to_string(),
        "tif" | "tiff" => "TIFF".to_string(),
        other => other.to_uppercase(),
    };

    Ok(LoadedImage {
        pixels,
        width,
        height,
        name,
        path: path.to_path_buf(),
        file_size,
        format,
    })
}

/// Write a result raster to disk. PNG or JPEG, chosen by the output path's
/// extension; anything unrecognized is written as PNG.
pub fn encode_and_write(image: &RgbaImage, path: &Path, quality: u8) -> Result<(), String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let file = std::fs::File::create(path).map_err(|e| e.to_string())?;
    let mut writer = BufWriter::new(file);

    match ext.as_str() {
        "jpg" | "jpeg" => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder
                .encode(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)
                .map_err(|e| e.to_string())?;
        }
        _ => {
            let encoder = PngEncoder::new(&mut writer);
            #[allow(deprecated)]
            encoder
                .encode(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    image::ColorType::Rgba8,
                )
                .map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

/// Encode a raster as PNG in memory (AI request payloads).
pub fn encode_png_bytes(image: &RgbaImage) -> Result<Vec<u8>, ProcessError> {
    let mut bytes: Vec<u8> = Vec::new();
    let encoder = PngEncoder::new(Cursor::new(&mut bytes));
    #[allow(deprecated)]
    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| ProcessError::Processing(format!("PNG encode failed: {}", e)))?;
    Ok(bytes)
}

/// "1.3 MB" style size for the status bar.
pub fn human_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn png_round_trip_preserves_pixels() {
        let mut img = RgbaImage::from_pixel(5, 3, Rgba([9, 8, 7, 255]));
        img.put_pixel(2, 1, Rgba([200, 100, 50, 128]));
        let bytes = encode_png_bytes(&img).unwrap();
        let back = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(back, img);
    }

    #[test]
    fn unsupported_extension_is_a_decode_error() {
        let err = load_image(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, ProcessError::Decode(_)));
    }

    #[test]
    fn human_size_units() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MB");
    }
}
