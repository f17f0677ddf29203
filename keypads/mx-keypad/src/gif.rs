//! GIF decoding for animation playback.
//!
//! The device consumes one whole encoded image per frame, so an animation
//! source is decoded once up front: every frame is resized to fill the
//! target rectangle, flattened onto black, and re-encoded as JPEG. Frames
//! re-encode in parallel; large screen GIFs are a few hundred JPEG passes.

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, Frame, RgbImage, RgbaImage};
use mx_console_core::Result;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

/// One still frame of a decoded animation.
#[derive(Debug, Clone)]
pub struct GifFrame {
    /// JPEG-encoded image at the target dimensions
    pub image: Vec<u8>,
    /// How long the frame stays on screen
    pub delay: Duration,
}

/// Substitute for frames that carry no delay of their own.
const DEFAULT_DELAY: Duration = Duration::from_millis(100);

const JPEG_QUALITY: u8 = 85;

/// Decode a GIF byte buffer into frames sized `width` x `height`.
pub fn decode(data: &[u8], width: u32, height: u32) -> Result<Vec<GifFrame>> {
    let decoder = GifDecoder::new(Cursor::new(data))?;
    let frames = decoder.into_frames().collect_frames()?;
    encode_frames(frames, width, height)
}

/// Decode a GIF file into frames sized `width` x `height`.
pub fn decode_file(path: &Path, width: u32, height: u32) -> Result<Vec<GifFrame>> {
    let file = std::fs::File::open(path)?;
    let decoder = GifDecoder::new(std::io::BufReader::new(file))?;
    let frames = decoder.into_frames().collect_frames()?;
    encode_frames(frames, width, height)
}

fn encode_frames(frames: Vec<Frame>, width: u32, height: u32) -> Result<Vec<GifFrame>> {
    frames
        .into_par_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay_ms = numer / denom.max(1);
            let delay = if delay_ms == 0 {
                DEFAULT_DELAY
            } else {
                Duration::from_millis(delay_ms as u64)
            };

            let resized = DynamicImage::ImageRgba8(frame.into_buffer())
                .resize_to_fill(width, height, FilterType::Gaussian)
                .to_rgba8();

            let mut buf = Vec::new();
            JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
                .encode_image(&flatten(&resized))?;
            Ok(GifFrame { image: buf, delay })
        })
        .collect()
}

/// Blend alpha against black, matching what transparent regions look like
/// on the unlit key surface.
fn flatten(image: &RgbaImage) -> RgbImage {
    let mut out = RgbImage::new(image.width(), image.height());
    for (dst, src) in out.pixels_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        let a = a as u16;
        dst.0 = [
            ((r as u16 * a) / 255) as u8,
            ((g as u16 * a) / 255) as u8,
            ((b as u16 * a) / 255) as u8,
        ];
    }
    out
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use image::codecs::gif::GifEncoder;
    use image::{Delay, Rgba};

    use super::*;

    /// Two-frame 8x8 GIF with 200ms delays.
    fn sample_gif() -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut buf);
            for shade in [64u8, 192] {
                let image = RgbaImage::from_pixel(8, 8, Rgba([shade, 0, 0, 255]));
                let delay = Delay::from_numer_denom_ms(200, 1);
                encoder
                    .encode_frame(Frame::from_parts(image, 0, 0, delay))
                    .unwrap();
            }
        }
        buf
    }

    #[test]
    fn decodes_frames_at_target_size() {
        let frames = decode(&sample_gif(), 118, 118).unwrap();
        assert_eq!(frames.len(), 2);
        for frame in &frames {
            // JPEG SOI marker
            assert_eq!(&frame.image[..2], &[0xff, 0xd8]);
            assert_eq!(frame.delay, Duration::from_millis(200));

            let decoded = image::load_from_memory(&frame.image).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (118, 118));
        }
    }

    #[test]
    fn decodes_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&sample_gif()).unwrap();

        let frames = decode_file(file.path(), 434, 434).unwrap();
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn garbage_input_is_an_error() {
        assert!(decode(b"not a gif", 118, 118).is_err());
        assert!(decode_file(Path::new("/nonexistent.gif"), 118, 118).is_err());
    }

    #[test]
    fn flatten_blends_alpha_to_black() {
        let image = RgbaImage::from_pixel(2, 1, Rgba([200, 100, 50, 128]));
        let rgb = flatten(&image);
        let [r, g, b] = rgb.get_pixel(0, 0).0;
        assert_eq!([r, g, b], [100, 50, 25]);
    }
}
