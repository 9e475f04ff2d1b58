//! Client-side style image compression, done on the server before upload.
//!
//! Images within both the byte and the dimension bound are kept as they are.
//! Anything else is downscaled so its longest side fits and re-encoded as
//! JPEG at decreasing quality until it fits the byte bound.

use std::io::Cursor;

use image::{GenericImageView as _, ImageFormat, codecs::jpeg::JpegEncoder, imageops::FilterType};
use tracing::{debug, warn};

use crate::{Result, fetch::detect_image_mime};

const QUALITY_START: u8 = 90;
const QUALITY_FLOOR: u8 = 40;
const QUALITY_STEP: u8 = 10;

#[derive(Debug, Clone, Copy)]
pub struct CompressOptions {
  /// Target upper bound on the encoded size.
  pub max_bytes:     usize,
  /// Longest side in pixels.
  pub max_dimension: u32,
}

impl Default for CompressOptions {
  fn default() -> Self {
    Self {
      max_bytes:     1024 * 1024,
      max_dimension: 1920,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Compressed {
  pub bytes:        Vec<u8>,
  pub content_type: &'static str,
  /// False when the input was passed through untouched.
  pub reencoded:    bool,
}

/// Compress `data` according to `options`.
///
/// CPU-bound; async callers should run it on a blocking thread.
pub fn compress_image(data: &[u8], options: CompressOptions) -> Result<Compressed> {
  let img = image::load_from_memory(data)?;
  let (width, height) = img.dimensions();

  if data.len() <= options.max_bytes && width.max(height) <= options.max_dimension {
    let content_type = detect_image_mime(data).unwrap_or("application/octet-stream");
    return Ok(Compressed { bytes: data.to_vec(), content_type, reencoded: false });
  }

  let img = if width.max(height) > options.max_dimension {
    img.resize(options.max_dimension, options.max_dimension, FilterType::Lanczos3)
  } else {
    img
  };
  let rgb = img.to_rgb8();

  let mut quality = QUALITY_START;
  loop {
    let mut bytes = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))?;

    if bytes.len() <= options.max_bytes || quality <= QUALITY_FLOOR {
      if bytes.len() > options.max_bytes {
        warn!(size = bytes.len(), max = options.max_bytes, "image still above size bound");
      }
      debug!(
        from = data.len(),
        to = bytes.len(),
        quality,
        width = rgb.width(),
        height = rgb.height(),
        "compressed image"
      );
      return Ok(Compressed { bytes, content_type: "image/jpeg", reencoded: true });
    }

    quality -= QUALITY_STEP;
  }
}

/// Encode `img` as PNG.
pub fn encode_png(img: &image::DynamicImage) -> Result<Vec<u8>> {
  let mut cursor = Cursor::new(Vec::new());
  img.write_to(&mut cursor, ImageFormat::Png)?;
  Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
  use image::{DynamicImage, ImageBuffer, Rgb};

  use super::*;

  fn noisy(width: u32, height: u32) -> DynamicImage {
    let buf = ImageBuffer::from_fn(width, height, |x, y| {
      let v = (x.wrapping_mul(7919) ^ y.wrapping_mul(104729)) as u8;
      Rgb([v, v.wrapping_add(85), v.wrapping_add(170)])
    });
    DynamicImage::ImageRgb8(buf)
  }

  #[test]
  fn small_image_passes_through() {
    let png = encode_png(&noisy(64, 32)).unwrap();
    let out = compress_image(&png, CompressOptions::default()).unwrap();

    assert!(!out.reencoded);
    assert_eq!(out.bytes, png);
    assert_eq!(out.content_type, "image/png");
  }

  #[test]
  fn oversized_image_is_downscaled() {
    let png = encode_png(&noisy(400, 100)).unwrap();
    let options = CompressOptions { max_bytes: 10 * 1024 * 1024, max_dimension: 200 };

    let out = compress_image(&png, options).unwrap();
    assert!(out.reencoded);
    assert_eq!(out.content_type, "image/jpeg");

    let decoded = image::load_from_memory(&out.bytes).unwrap();
    assert_eq!(decoded.dimensions(), (200, 50));
  }

  #[test]
  fn heavy_image_is_reencoded_as_jpeg() {
    let png = encode_png(&noisy(256, 256)).unwrap();
    let options = CompressOptions { max_bytes: png.len() - 1, max_dimension: 1920 };

    let out = compress_image(&png, options).unwrap();
    assert!(out.reencoded);
    assert_eq!(detect_image_mime(&out.bytes), Some("image/jpeg"));
    assert_eq!(image::load_from_memory(&out.bytes).unwrap().dimensions(), (256, 256));
  }

  #[test]
  fn garbage_is_rejected() {
    assert!(compress_image(b"not an image", CompressOptions::default()).is_err());
  }
}
