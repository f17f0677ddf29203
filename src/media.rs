//! Helpers for producing JPEG payloads for the keypad LCD.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use mx_console_core::Result;

const JPEG_QUALITY: u8 = 85;

/// Re-encode an image as a JPEG payload at the given dimensions, cropping
/// to fill and flattening transparency onto a background color.
pub fn encode_image(
    image: DynamicImage,
    background: [u8; 3],
    nearest: bool,
    width: u32,
    height: u32,
) -> Result<Vec<u8>> {
    let [br, bg, bb] = background;

    let rgba = image
        .resize_to_fill(
            width,
            height,
            if nearest {
                FilterType::Nearest
            } else {
                FilterType::Gaussian
            },
        )
        .to_rgba8();

    let mut rgb = RgbImage::new(width, height);
    for (dst, src) in rgb.pixels_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;

        // Mix alpha values against the background
        let a = a as f64 / 255.0;
        let ba = 1. - a;
        dst.0 = [
            ((br as f64 * ba) + (r as f64 * a)) as u8,
            ((bg as f64 * ba) + (g as f64 * a)) as u8,
            ((bb as f64 * ba) + (b as f64 * a)) as u8,
        ];
    }

    encode_jpeg(&rgb)
}

/// Solid color tile, e.g. for painting a key a flat color.
pub fn solid_color(color: [u8; 3], width: u32, height: u32) -> Result<Vec<u8>> {
    encode_jpeg(&RgbImage::from_pixel(width, height, Rgb(color)))
}

fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode_image(image)?;
    Ok(buf)
}
