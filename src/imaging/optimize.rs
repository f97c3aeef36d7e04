use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

use super::data_url::{encode_data_url, DataUrl};
use crate::session::ImageOptimizationSettings;

/// JPEG quality used when migrating legacy PNG slides
pub const MIGRATION_JPEG_QUALITY: u8 = 80;

/// Image optimization collaborator: `(data URL, settings) -> data URL`.
///
/// Callers must fall back to the original image when this fails.
pub trait ImageOptimizer: Send + Sync {
    fn optimize(&self, data_url: &str, settings: &ImageOptimizationSettings) -> Result<String>;
}

/// Resizes and optionally desaturates rasters with the `image` crate, emitting PNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterOptimizer;

impl ImageOptimizer for RasterOptimizer {
    fn optimize(&self, data_url: &str, settings: &ImageOptimizationSettings) -> Result<String> {
        let image = decode_data_url(data_url)?;

        let (width, height) = fit_within(image.width(), image.height(), settings.max_dimension);
        let mut image = if (width, height) == (image.width(), image.height()) {
            image
        } else {
            image.resize_exact(width, height, FilterType::Triangle)
        };

        if settings.grayscale {
            image = image.grayscale();
        }

        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .context("Failed to encode optimized image")?;

        Ok(encode_data_url("image/png", &bytes))
    }
}

/// Scale `(width, height)` so the longest side is at most `max_dimension`,
/// keeping the aspect ratio. Images already within bounds are untouched.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if max_dimension == 0 || (width <= max_dimension && height <= max_dimension) {
        return (width, height);
    }

    let scale = |side: u32, longest: u32| -> u32 {
        ((side as f64 * max_dimension as f64) / longest as f64)
            .round()
            .max(1.0) as u32
    };

    if width > height {
        (max_dimension, scale(height, width))
    } else {
        (scale(width, height), max_dimension)
    }
}

/// Slides stored before the JPEG switch still carry PNG data URLs
pub fn is_legacy_png(data_url: &str) -> bool {
    data_url.starts_with("data:image/png")
}

/// Re-encode a PNG data URL as JPEG, flattening transparency onto white
pub fn transcode_png_to_jpeg(data_url: &str, quality: u8) -> Result<String> {
    let rgba = decode_data_url(data_url)?.to_rgba8();

    let mut flattened = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend = |channel: u8| -> u8 {
            (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8
        };
        flattened.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder
        .encode_image(&DynamicImage::ImageRgb8(flattened))
        .context("Failed to encode JPEG")?;

    Ok(encode_data_url("image/jpeg", &bytes))
}

fn decode_data_url(data_url: &str) -> Result<DynamicImage> {
    let parsed = DataUrl::parse(data_url).ok_or_else(|| anyhow!("Malformed image data URL"))?;
    let bytes = parsed.decode()?;
    image::load_from_memory(&bytes).context("Failed to decode image")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_data_url(width: u32, height: u32) -> String {
        let mut image = RgbaImage::new(width, height);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgba([(x % 255) as u8, (y % 255) as u8, 200, 255]);
        }
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        encode_data_url("image/png", &bytes)
    }

    #[test]
    fn test_fit_within_keeps_aspect() {
        assert_eq!(fit_within(1600, 900, 256), (256, 144));
        assert_eq!(fit_within(900, 1600, 256), (144, 256));
        assert_eq!(fit_within(1000, 1000, 500), (500, 500));
        assert_eq!(fit_within(200, 100, 256), (200, 100));
    }

    #[test]
    fn test_optimize_resizes_and_grays() {
        let settings = ImageOptimizationSettings {
            max_dimension: 32,
            grayscale: true,
        };
        let optimized = RasterOptimizer.optimize(&png_data_url(128, 64), &settings).unwrap();
        assert!(optimized.starts_with("data:image/png;base64,"));

        let image = decode_data_url(&optimized).unwrap();
        assert_eq!((image.width(), image.height()), (32, 16));
        let pixel = image.to_rgb8().get_pixel(5, 5).0;
        assert_eq!(pixel[0], pixel[1]);
        assert_eq!(pixel[1], pixel[2]);
    }

    #[test]
    fn test_optimize_rejects_garbage() {
        let settings = ImageOptimizationSettings::default();
        assert!(RasterOptimizer.optimize("data:image/png;base64,!!!!", &settings).is_err());
        assert!(RasterOptimizer.optimize("data:image/png;base64,QUJD", &settings).is_err());
    }

    #[test]
    fn test_transcode_png_to_jpeg() {
        let jpeg = transcode_png_to_jpeg(&png_data_url(16, 16), MIGRATION_JPEG_QUALITY).unwrap();
        assert!(jpeg.starts_with("data:image/jpeg;base64,"));
        assert!(!is_legacy_png(&jpeg));
        let image = decode_data_url(&jpeg).unwrap();
        assert_eq!((image.width(), image.height()), (16, 16));
    }
}
