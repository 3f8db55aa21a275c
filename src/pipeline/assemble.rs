//! Images → PDF: one page per image, each page exactly the image's size.
//!
//! Gray and RGB JPEG data is embedded untouched behind a `DCTDecode` filter.
//! Everything else is decoded and stored as Flate-compressed samples, with
//! the alpha channel split out into a soft mask. Adobe-tagged JPEGs (the
//! usual carriers of CMYK and YCCK) take the decoding path too.

use crate::config::ToolkitConfig;
use crate::error::PdfDeskError;
use crate::output::OutputFile;
use crate::pipeline::document::{save, PageAssembler};
use crate::pipeline::input::{compare_names, SourceFile, MIME_JPEG};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, DynamicImage, ImageDecoder, ImageFormat};
use lopdf::{Dictionary, Object, ObjectId, Stream};
use std::io::{Cursor, Write};
use tracing::{debug, info};

/// Fixed download name of the assembled document.
pub const OUTPUT_NAME: &str = "converted_images.pdf";

/// An image XObject added to the document under construction.
struct EmbeddedImage {
    id: ObjectId,
    width: u32,
    height: u32,
}

/// Build a PDF with one page per image, images taken in name order.
pub fn images_to_pdf(
    files: &[SourceFile],
    config: &ToolkitConfig,
    mut on_page: impl FnMut(usize, usize),
) -> Result<OutputFile, PdfDeskError> {
    let mut ordered: Vec<&SourceFile> = files.iter().collect();
    ordered.sort_by(|a, b| compare_names(&a.name, &b.name));
    let total = ordered.len();

    let mut assembler = PageAssembler::new(&config.pdf_version);
    for (idx, file) in ordered.into_iter().enumerate() {
        let image = embed_image(&mut assembler, file)?;
        add_image_page(&mut assembler, &image);
        debug!(
            "Page {}: '{}' ({}x{})",
            idx + 1,
            file.name,
            image.width,
            image.height
        );
        on_page(idx + 1, total);
    }

    let mut doc = assembler.finish();
    doc.compress();
    let bytes = save(&mut doc)?;
    info!("Assembled {} images into {} bytes", total, bytes.len());
    Ok(OutputFile::pdf(OUTPUT_NAME, bytes))
}

fn add_image_page(assembler: &mut PageAssembler, image: &EmbeddedImage) {
    let content = format!("q {} 0 0 {} 0 0 cm /Im0 Do Q", image.width, image.height);
    let content_id = assembler.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let mut xobjects = Dictionary::new();
    xobjects.set("Im0", Object::Reference(image.id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut page = Dictionary::new();
    page.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(image.width as i64),
            Object::Integer(image.height as i64),
        ]),
    );
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Reference(content_id));
    assembler.add_page(page);
}

fn embed_image(
    assembler: &mut PageAssembler,
    file: &SourceFile,
) -> Result<EmbeddedImage, PdfDeskError> {
    if file.mime_type == MIME_JPEG {
        embed_jpeg(assembler, file)
    } else {
        embed_decoded(assembler, file, ImageFormat::Png)
    }
}

fn unsupported(file: &SourceFile, e: impl std::fmt::Display) -> PdfDeskError {
    PdfDeskError::UnsupportedImage {
        name: file.name.clone(),
        detail: e.to_string(),
    }
}

fn image_dict(width: u32, height: u32, color_space: &str, filter: &str) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
    dict
}

fn embed_jpeg(
    assembler: &mut PageAssembler,
    file: &SourceFile,
) -> Result<EmbeddedImage, PdfDeskError> {
    // Only the headers are decoded here.
    let decoder = JpegDecoder::new(Cursor::new(&file.bytes)).map_err(|e| unsupported(file, e))?;
    let (width, height) = decoder.dimensions();
    let color_space = match decoder.color_type() {
        ColorType::L8 => "DeviceGray",
        ColorType::Rgb8 => "DeviceRGB",
        _ => return embed_decoded(assembler, file, ImageFormat::Jpeg),
    };
    if has_adobe_segment(&file.bytes) {
        debug!("'{}' is Adobe-tagged; embedding decoded samples", file.name);
        return embed_decoded(assembler, file, ImageFormat::Jpeg);
    }

    let dict = image_dict(width, height, color_space, "DCTDecode");
    let mut stream = Stream::new(dict, file.bytes.clone());
    stream.allows_compression = false;
    let id = assembler.add_object(stream);
    Ok(EmbeddedImage { id, width, height })
}

/// An APP14 "Adobe" segment, which may signal CMYK or YCCK samples.
fn has_adobe_segment(bytes: &[u8]) -> bool {
    bytes
        .windows(9)
        .any(|w| w[0] == 0xFF && w[1] == 0xEE && &w[4..9] == b"Adobe")
}

fn embed_decoded(
    assembler: &mut PageAssembler,
    file: &SourceFile,
    format: ImageFormat,
) -> Result<EmbeddedImage, PdfDeskError> {
    let image =
        image::load_from_memory_with_format(&file.bytes, format).map_err(|e| unsupported(file, e))?;
    let (width, height) = (image.width(), image.height());
    let has_alpha = image.color().has_alpha();
    let is_gray = !image.color().has_color();

    let (color_space, samples) = if is_gray {
        ("DeviceGray", image.to_luma8().into_raw())
    } else {
        ("DeviceRGB", image.to_rgb8().into_raw())
    };

    let mut dict = image_dict(width, height, color_space, "FlateDecode");
    if has_alpha {
        let alpha = alpha_channel(&image);
        let mask_dict = image_dict(width, height, "DeviceGray", "FlateDecode");
        let mask_id = assembler.add_object(flate_stream(mask_dict, &alpha, &file.name)?);
        dict.set("SMask", Object::Reference(mask_id));
    }

    let id = assembler.add_object(flate_stream(dict, &samples, &file.name)?);
    Ok(EmbeddedImage { id, width, height })
}

fn alpha_channel(image: &DynamicImage) -> Vec<u8> {
    image.to_rgba8().pixels().map(|p| p.0[3]).collect()
}

fn flate_stream(dict: Dictionary, samples: &[u8], name: &str) -> Result<Stream, PdfDeskError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(samples)
        .and_then(|_| encoder.finish())
        .map(|data| {
            let mut stream = Stream::new(dict, data);
            stream.allows_compression = false;
            stream
        })
        .map_err(|e| PdfDeskError::UnsupportedImage {
            name: name.to_string(),
            detail: format!("compressing samples: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::document::page_ids;
    use crate::pipeline::fixtures::{jpeg_bytes, png_bytes};
    use lopdf::Document;

    fn media_box(doc: &Document, page: ObjectId) -> Vec<i64> {
        doc.get_dictionary(page)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_i64().unwrap())
            .collect()
    }

    fn is_image(stream: &Stream) -> bool {
        let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name);
        subtype.ok() == Some(b"Image".as_slice())
    }

    fn image_streams(doc: &Document) -> Vec<&Stream> {
        doc.objects
            .values()
            .filter_map(|obj| obj.as_stream().ok())
            .filter(|s| is_image(s))
            .collect()
    }

    /// Splice an APP14 "Adobe" segment in right after SOI.
    fn with_adobe_segment(jpeg: &[u8]) -> Vec<u8> {
        let mut tagged = jpeg[..2].to_vec();
        tagged.extend_from_slice(&[0xFF, 0xEE, 0x00, 0x0E]);
        tagged.extend_from_slice(b"Adobe");
        tagged.extend_from_slice(&[0x00, 0x64, 0x00, 0x00, 0x00, 0x00, 0x01]);
        tagged.extend_from_slice(&jpeg[2..]);
        tagged
    }

    #[test]
    fn jpeg_size_and_colour_come_from_headers() {
        let files = vec![SourceFile::new("wide.jpg", jpeg_bytes(33, 17))];
        let out = images_to_pdf(&files, &ToolkitConfig::default(), |_, _| {}).unwrap();

        let doc = Document::load_mem(&out.bytes).unwrap();
        assert_eq!(media_box(&doc, page_ids(&doc)[0]), vec![0, 0, 33, 17]);
        let images = image_streams(&doc);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].dict.get(b"Width").unwrap().as_i64().unwrap(), 33);
        assert_eq!(images[0].dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceRGB");
        assert_eq!(images[0].dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
    }

    #[test]
    fn broken_jpeg_is_unsupported() {
        let files = vec![SourceFile::new("bad.jpg", vec![0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02])];
        let err = images_to_pdf(&files, &ToolkitConfig::default(), |_, _| {}).unwrap_err();
        assert!(matches!(err, PdfDeskError::UnsupportedImage { .. }), "got: {err:?}");
    }

    #[test]
    fn adobe_tagged_jpeg_is_decoded() {
        let tagged = with_adobe_segment(&jpeg_bytes(9, 7));
        assert!(has_adobe_segment(&tagged));
        assert!(!has_adobe_segment(&jpeg_bytes(9, 7)));

        let files = vec![SourceFile::new("adobe.jpg", tagged)];
        let out = images_to_pdf(&files, &ToolkitConfig::default(), |_, _| {}).unwrap();
        let doc = Document::load_mem(&out.bytes).unwrap();
        let images = image_streams(&doc);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].dict.get(b"Filter").unwrap().as_name().unwrap(), b"FlateDecode");
        assert_eq!(media_box(&doc, page_ids(&doc)[0]), vec![0, 0, 9, 7]);
    }

    #[test]
    fn pages_follow_name_order_and_image_size() {
        let files = vec![
            SourceFile::new("b.png", png_bytes(10, 40, false)),
            SourceFile::new("a.jpg", jpeg_bytes(30, 20)),
        ];
        let out = images_to_pdf(&files, &ToolkitConfig::default(), |_, _| {}).unwrap();
        assert_eq!(out.file_name, "converted_images.pdf");

        let doc = Document::load_mem(&out.bytes).unwrap();
        let pages = page_ids(&doc);
        assert_eq!(pages.len(), 2);
        assert_eq!(media_box(&doc, pages[0]), vec![0, 0, 30, 20]);
        assert_eq!(media_box(&doc, pages[1]), vec![0, 0, 10, 40]);
    }

    #[test]
    fn png_alpha_becomes_soft_mask() {
        let files = vec![SourceFile::new("alpha.png", png_bytes(8, 8, true))];
        let out = images_to_pdf(&files, &ToolkitConfig::default(), |_, _| {}).unwrap();

        let doc = Document::load_mem(&out.bytes).unwrap();
        let masked = doc.objects.values().any(|obj| match obj {
            Object::Stream(s) => s.dict.get(b"SMask").is_ok(),
            _ => false,
        });
        assert!(masked);
    }

    #[test]
    fn jpeg_is_embedded_verbatim() {
        let jpeg = jpeg_bytes(12, 12);
        let files = vec![SourceFile::new("photo.jpg", jpeg.clone())];
        let out = images_to_pdf(&files, &ToolkitConfig::default(), |_, _| {}).unwrap();

        let doc = Document::load_mem(&out.bytes).unwrap();
        let found = doc.objects.values().any(|obj| match obj {
            Object::Stream(s) => s.content == jpeg,
            _ => false,
        });
        assert!(found);
    }

    #[test]
    fn mislabelled_image_fails() {
        // JPEG bytes declared as PNG are decoded as PNG and rejected.
        let files = vec![SourceFile::with_mime("x.png", "image/png", jpeg_bytes(4, 4))];
        let err = images_to_pdf(&files, &ToolkitConfig::default(), |_, _| {}).unwrap_err();
        assert!(matches!(err, PdfDeskError::UnsupportedImage { .. }));
    }

    #[test]
    fn reports_each_page() {
        let files = vec![
            SourceFile::new("1.png", png_bytes(2, 2, false)),
            SourceFile::new("2.png", png_bytes(2, 2, false)),
        ];
        let mut seen = Vec::new();
        images_to_pdf(&files, &ToolkitConfig::default(), |p, t| seen.push((p, t))).unwrap();
        assert_eq!(seen, vec![(1, 2), (2, 2)]);
    }
}
