//! In-memory documents and images for unit tests.

use lopdf::{Dictionary, Document, Object, Stream};
use std::io::Cursor;

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

fn build(page_count: usize, label: &str, root_rotation: Option<i64>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut font = Dictionary::new();
    font.set("Type", name("Font"));
    font.set("Subtype", name("Type1"));
    font.set("BaseFont", name("Helvetica"));
    let font_id = doc.add_object(font);

    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(font_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    let resources_id = doc.add_object(resources);

    let mut kids = Vec::new();
    for i in 1..=page_count {
        let text = format!("BT /F1 24 Tf 72 700 Td ({}-Page-{}) Tj ET", label, i);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), text.into_bytes()));

        // MediaBox and Resources are inherited from the page tree root.
        let mut page = Dictionary::new();
        page.set("Type", name("Page"));
        page.set("Parent", Object::Reference(pages_id));
        page.set("Contents", Object::Reference(content_id));
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", name("Pages"));
    pages.set("Count", Object::Integer(page_count as i64));
    pages.set("Kids", Object::Array(kids));
    pages.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ]),
    );
    pages.set("Resources", Object::Reference(resources_id));
    if let Some(rotation) = root_rotation {
        pages.set("Rotate", Object::Integer(rotation));
    }
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", name("Catalog"));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut info = Dictionary::new();
    info.set("Title", Object::string_literal(format!("{} fixture", label)));
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", Object::Reference(info_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// A PDF whose page `i` draws the text `{label}-Page-{i}`.
pub fn sample_pdf(page_count: usize, label: &str) -> Vec<u8> {
    build(page_count, label, None)
}

/// Like [`sample_pdf`], with `/Rotate` set on the page tree root only.
pub fn sample_pdf_with_root_rotation(page_count: usize, label: &str, degrees: i64) -> Vec<u8> {
    build(page_count, label, Some(degrees))
}

/// The `{label}-Page-{i}` markers of every page, in page order.
pub fn page_labels(bytes: &[u8]) -> Vec<String> {
    let mut doc = Document::load_mem(bytes).unwrap();
    doc.decompress();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let content = doc.get_page_content(page_id).unwrap();
            let text = String::from_utf8_lossy(&content);
            let start = text.find('(').unwrap() + 1;
            let end = text[start..].find(')').unwrap() + start;
            text[start..end].to_string()
        })
        .collect()
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}

pub fn png_bytes(width: u32, height: u32, with_alpha: bool) -> Vec<u8> {
    let img = if with_alpha {
        image::DynamicImage::ImageRgba8(image::RgbaImage::from_fn(width, height, |x, _| {
            image::Rgba([200, 10, 10, (x * 9 % 256) as u8])
        }))
    } else {
        image::DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |_, y| {
            image::Rgb([10, (y * 3 % 256) as u8, 200])
        }))
    };
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
