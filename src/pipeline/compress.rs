//! Re-save a document with save-time optimisations.
//!
//! Every level writes object streams: small objects are packed into
//! Flate-compressed `/ObjStm` containers indexed by a cross-reference
//! stream. What each [`CompressionLevel`] adds on top is documented on the
//! enum. No pixel
//! data is resampled; only `high` touches image streams at all, and then only
//! when the re-encoded JPEG is actually smaller.

use crate::config::CompressionLevel;
use crate::error::PdfDeskError;
use crate::output::{CompressionStats, OutputFile};
use crate::pipeline::document::{self, save_with};
use crate::pipeline::encode::encode_jpeg;
use crate::pipeline::input::SourceFile;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use lopdf::{Document, Object, ObjectId, SaveOptions};
use tracing::{debug, info};

/// Fixed download name of the compressed document.
pub const OUTPUT_NAME: &str = "compressed.pdf";

/// Produce `compressed.pdf` from `source` at `level`.
pub fn compress_document(
    source: &SourceFile,
    level: CompressionLevel,
) -> Result<(OutputFile, CompressionStats), PdfDeskError> {
    let mut doc = document::load(source)?;

    let images_reencoded = match level.image_quality() {
        Some(quality) => reencode_jpeg_images(&mut doc, quality),
        None => 0,
    };

    if level >= CompressionLevel::Medium {
        let pruned = doc.prune_objects();
        let emptied = doc.delete_zero_length_streams();
        doc.renumber_objects();
        debug!(
            "Dropped {} unreachable objects and {} empty streams",
            pruned.len(),
            emptied.len()
        );
    }
    doc.compress();

    let options = SaveOptions::builder()
        .use_object_streams(true)
        .use_xref_streams(true)
        .compression_level(level.object_stream_flate_level())
        .build();
    let bytes = save_with(&mut doc, options)?;
    let stats = CompressionStats {
        original_size: source.len(),
        compressed_size: bytes.len(),
        images_reencoded,
    };
    info!(
        "Compressed '{}' at {}: {} → {} bytes ({:.1}% saved, {} images re-encoded)",
        source.name,
        level,
        stats.original_size,
        stats.compressed_size,
        stats.savings_ratio() * 100.0,
        stats.images_reencoded
    );
    Ok((OutputFile::pdf(OUTPUT_NAME, bytes), stats))
}

fn name_of(object: Option<&Object>) -> Option<&[u8]> {
    match object? {
        Object::Name(n) => Some(n.as_slice()),
        Object::Array(arr) if arr.len() == 1 => match &arr[0] {
            Object::Name(n) => Some(n.as_slice()),
            _ => None,
        },
        _ => None,
    }
}

/// Re-encode plain 8-bit Gray/RGB JPEG image XObjects at `quality`.
/// Returns how many were replaced.
fn reencode_jpeg_images(doc: &mut Document, quality: u8) -> usize {
    let candidates: Vec<ObjectId> = doc
        .objects
        .iter()
        .filter_map(|(id, object)| match object {
            Object::Stream(stream) => {
                let dict = &stream.dict;
                let is_image = name_of(dict.get(b"Subtype").ok()) == Some(b"Image");
                let is_jpeg = name_of(dict.get(b"Filter").ok()) == Some(b"DCTDecode");
                let plain_color = matches!(
                    name_of(dict.get(b"ColorSpace").ok()),
                    Some(b"DeviceRGB") | Some(b"DeviceGray")
                );
                let eight_bit = dict
                    .get(b"BitsPerComponent")
                    .and_then(Object::as_i64)
                    .map_or(true, |b| b == 8);
                let untouched = dict.get(b"Decode").is_err() && dict.get(b"SMask").is_err();
                (is_image && is_jpeg && plain_color && eight_bit && untouched).then_some(*id)
            }
            _ => None,
        })
        .collect();

    let mut replaced = 0;
    for id in candidates {
        let Ok(Object::Stream(stream)) = doc.get_object_mut(id) else {
            continue;
        };
        let gray = name_of(stream.dict.get(b"ColorSpace").ok()) == Some(b"DeviceGray");

        let decoded = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg);
        let decoded = match decoded {
            Ok(img) => img,
            Err(e) => {
                debug!("Skipping image {:?}: {}", id, e);
                continue;
            }
        };
        let encoded = if gray {
            encode_gray(&decoded, quality)
        } else {
            encode_jpeg(&decoded, quality)
        };

        match encoded {
            Ok(bytes) if bytes.len() < stream.content.len() => {
                debug!(
                    "Image {:?}: {} → {} bytes",
                    id,
                    stream.content.len(),
                    bytes.len()
                );
                stream.set_content(bytes);
                replaced += 1;
            }
            Ok(_) => debug!("Image {:?}: re-encoding would not shrink it", id),
            Err(e) => debug!("Image {:?}: re-encoding failed: {}", id, e),
        }
    }
    replaced
}

fn encode_gray(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    DynamicImage::ImageLuma8(image.to_luma8()).write_with_encoder(encoder)?;
    Ok(buffer)
}
