//! Image encoding: rendered page → JPEG bytes, and bytes → data-URI.
//!
//! JPEG is what the page extraction offers for download; the data-URI form
//! is what the HTML preview embeds inline.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Encode a rendered page as JPEG at `quality` (1–100).
///
/// JPEG has no alpha channel, so the page is flattened to RGB first.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)?;

    debug!(
        "Encoded {}x{} image → {} bytes JPEG",
        rgb.width(),
        rgb.height(),
        buf.len()
    );
    Ok(buf)
}

/// Wrap bytes as a `data:` URI for inline embedding.
pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let jpeg = encode_jpeg(&img, 90).expect("encode should succeed");
        assert!(jpeg.starts_with(&[0xFF, 0xD8]), "JPEG SOI marker expected");

        let decoded = image::load_from_memory(&jpeg).expect("valid JPEG");
        assert_eq!(decoded.width(), 10);
        assert_eq!(decoded.height(), 10);
    }

    #[test]
    fn lower_quality_is_not_larger() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8, 255])
        }));
        let high = encode_jpeg(&img, 95).unwrap();
        let low = encode_jpeg(&img, 20).unwrap();
        assert!(low.len() <= high.len());
    }

    #[test]
    fn data_uri_round_trips() {
        let uri = data_uri("image/jpeg", b"abc");
        assert!(uri.starts_with("data:image/jpeg;base64,"));
        let payload = uri.split(',').nth(1).unwrap();
        assert_eq!(STANDARD.decode(payload).unwrap(), b"abc");
    }
}
