//! Set every page of a document to the same absolute rotation.

use crate::config::RotationAngle;
use crate::error::PdfDeskError;
use crate::output::OutputFile;
use crate::pipeline::document::{self, page_ids, save};
use crate::pipeline::input::SourceFile;
use lopdf::Object;
use tracing::info;

/// Fixed download name of the rotated document.
pub const OUTPUT_NAME: &str = "rotated.pdf";

/// Write `/Rotate angle` on every page. Any previous rotation, set on the
/// page or inherited from the page tree, is replaced rather than added to.
pub fn rotate_pages(
    source: &SourceFile,
    angle: RotationAngle,
    mut on_page: impl FnMut(usize, usize),
) -> Result<OutputFile, PdfDeskError> {
    let mut doc = document::load(source)?;
    let pages = page_ids(&doc);
    let total = pages.len();

    for (idx, page_id) in pages.into_iter().enumerate() {
        let page = doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
        page.set("Rotate", Object::Integer(angle.degrees()));
        on_page(idx + 1, total);
    }

    let bytes = save(&mut doc)?;
    info!("Rotated {} pages of '{}' to {}", total, source.name, angle);
    Ok(OutputFile::pdf(OUTPUT_NAME, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::document::effective_rotation;
    use crate::pipeline::fixtures::{page_labels, sample_pdf, sample_pdf_with_root_rotation};
    use lopdf::Document;

    fn rotations(bytes: &[u8]) -> Vec<i64> {
        let doc = Document::load_mem(bytes).unwrap();
        page_ids(&doc)
            .into_iter()
            .map(|id| effective_rotation(&doc, id))
            .collect()
    }

    #[test]
    fn every_angle_is_absolute() {
        for angle in RotationAngle::all() {
            let source = SourceFile::new("r.pdf", sample_pdf(3, "R"));
            let out = rotate_pages(&source, angle, |_, _| {}).unwrap();
            assert_eq!(out.file_name, "rotated.pdf");
            assert_eq!(rotations(&out.bytes), vec![angle.degrees(); 3]);
        }
    }

    #[test]
    fn replaces_inherited_rotation() {
        let source = SourceFile::new("r.pdf", sample_pdf_with_root_rotation(2, "R", 90));
        let out = rotate_pages(&source, RotationAngle::Deg90, |_, _| {}).unwrap();
        // 90 on top of 90 stays 90: rotation is set, not accumulated.
        assert_eq!(rotations(&out.bytes), vec![90, 90]);

        let out = rotate_pages(&source, RotationAngle::Deg0, |_, _| {}).unwrap();
        assert_eq!(rotations(&out.bytes), vec![0, 0]);
    }

    #[test]
    fn content_is_untouched() {
        let source = SourceFile::new("r.pdf", sample_pdf(2, "Keep"));
        let out = rotate_pages(&source, RotationAngle::Deg270, |_, _| {}).unwrap();
        assert_eq!(page_labels(&out.bytes), vec!["Keep-Page-1", "Keep-Page-2"]);
    }
}
