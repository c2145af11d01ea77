use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

pub const BRIGHTNESS: f32 = 1.15;
pub const SATURATION: f32 = 1.4;
pub const SHARPEN_SIGMA: f32 = 1.5;
pub const SHARPEN_THRESHOLD: i32 = 1;
pub const JPEG_QUALITY: u8 = 95;

/// Bring any still to the canonical frame and look.
///
/// Cover-crops to `width`x`height`, then applies the brightness and
/// saturation boost followed by an unsharp mask.
pub fn normalize(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let filled = image.resize_to_fill(width, height, FilterType::Lanczos3);
    let mut rgb = filled.to_rgb8();
    grade(&mut rgb, BRIGHTNESS, SATURATION);
    DynamicImage::ImageRgb8(rgb).unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD)
}

/// Scale saturation around Rec.601 luma, then scale brightness.
fn grade(image: &mut RgbImage, brightness: f32, saturation: f32) {
    for pixel in image.pixels_mut() {
        let [r, g, b] = pixel.0.map(f32::from);
        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        pixel.0 = [r, g, b].map(|c| {
            let saturated = luma + (c - luma) * saturation;
            (saturated * brightness).round().clamp(0.0, 255.0) as u8
        });
    }
}

pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    image
        .to_rgb8()
        .write_with_encoder(encoder)
        .context("Failed to encode JPEG")?;
    Ok(buffer.into_inner())
}

/// Decode downloaded bytes, normalize and write them as JPEG.
pub fn write_normalized_bytes(bytes: &[u8], width: u32, height: u32, path: &Path) -> Result<()> {
    let decoded = image::load_from_memory(bytes).context("Failed to decode generated image")?;
    write_normalized(&decoded, width, height, path)
}

pub fn write_normalized(image: &DynamicImage, width: u32, height: u32, path: &Path) -> Result<()> {
    let jpeg = encode_jpeg(&normalize(image, width, height), JPEG_QUALITY)?;
    std::fs::write(path, jpeg).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb};

    #[test]
    fn cover_crop_hits_exact_dimensions() {
        let wide = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 100, Rgb([10, 20, 30])));
        let out = normalize(&wide, 54, 96);
        assert_eq!(out.dimensions(), (54, 96));
    }

    #[test]
    fn grading_boosts_brightness_and_keeps_gray_neutral() {
        let mut gray = RgbImage::from_pixel(2, 2, Rgb([100, 100, 100]));
        grade(&mut gray, BRIGHTNESS, SATURATION);
        assert_eq!(gray.get_pixel(0, 0).0, [115, 115, 115]);

        let mut tinted = RgbImage::from_pixel(1, 1, Rgb([120, 100, 100]));
        grade(&mut tinted, 1.0, SATURATION);
        let [r, g, _] = tinted.get_pixel(0, 0).0;
        assert!(r > 120 && g < 100);
    }

    #[test]
    fn grading_clamps_highlights() {
        let mut bright = RgbImage::from_pixel(1, 1, Rgb([250, 250, 250]));
        grade(&mut bright, BRIGHTNESS, SATURATION);
        assert_eq!(bright.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn writes_decodable_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(30, 30, Rgb([200, 50, 50])));
        let bytes = encode_jpeg(&source, 90).unwrap();

        write_normalized_bytes(&bytes, 27, 48, &path).unwrap();

        let written = image::open(&path).unwrap();
        assert_eq!(written.dimensions(), (27, 48));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_normalized_bytes(b"<html>rate limited</html>", 10, 10, &dir.path().join("x.jpg"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("decode"));
    }
}
