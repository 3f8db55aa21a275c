//! Merge several documents into one, sources taken in name order.

use crate::config::ToolkitConfig;
use crate::error::PdfDeskError;
use crate::output::OutputFile;
use crate::pipeline::document::{self, save, PageAssembler};
use crate::pipeline::input::{compare_names, SourceFile};
use tracing::{debug, info};

/// Fixed download name of the merged document.
pub const OUTPUT_NAME: &str = "merged.pdf";

/// Concatenate every page of every source. Each source is fully parsed
/// before anything is copied, so one broken file fails the whole merge.
pub fn merge_documents(
    files: &[SourceFile],
    config: &ToolkitConfig,
    mut on_page: impl FnMut(usize, usize),
) -> Result<OutputFile, PdfDeskError> {
    let mut ordered: Vec<&SourceFile> = files.iter().collect();
    ordered.sort_by(|a, b| compare_names(&a.name, &b.name));

    let docs = ordered
        .iter()
        .map(|file| document::load(file))
        .collect::<Result<Vec<_>, _>>()?;
    let total: usize = docs.iter().map(|d| d.get_pages().len()).sum();

    let mut assembler = PageAssembler::new(&config.pdf_version);
    for (file, doc) in ordered.iter().zip(&docs) {
        let indices: Vec<usize> = (0..doc.get_pages().len()).collect();
        assembler.copy_pages(doc, &indices)?;
        debug!("Appended {} pages from '{}'", indices.len(), file.name);
        on_page(assembler.page_count(), total);
    }

    let mut merged = assembler.finish();
    let bytes = save(&mut merged)?;
    info!("Merged {} documents, {} pages", docs.len(), total);
    Ok(OutputFile::pdf(OUTPUT_NAME, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fixtures::{page_labels, sample_pdf};

    #[test]
    fn pages_follow_source_name_order() {
        let files = vec![
            SourceFile::new("b.pdf", sample_pdf(2, "B")),
            SourceFile::new("a.pdf", sample_pdf(3, "A")),
        ];
        let out = merge_documents(&files, &ToolkitConfig::default(), |_, _| {}).unwrap();
        assert_eq!(out.file_name, "merged.pdf");
        assert_eq!(
            page_labels(&out.bytes),
            vec!["A-Page-1", "A-Page-2", "A-Page-3", "B-Page-1", "B-Page-2"]
        );
    }

    #[test]
    fn single_source_is_copied() {
        let files = vec![SourceFile::new("only.pdf", sample_pdf(2, "O"))];
        let out = merge_documents(&files, &ToolkitConfig::default(), |_, _| {}).unwrap();
        assert_eq!(page_labels(&out.bytes), vec!["O-Page-1", "O-Page-2"]);
    }

    #[test]
    fn one_bad_source_fails_the_merge() {
        let files = vec![
            SourceFile::new("a.pdf", sample_pdf(1, "A")),
            SourceFile::new("b.pdf", b"%PDF-1.4 garbage".to_vec()),
        ];
        let err = merge_documents(&files, &ToolkitConfig::default(), |_, _| {}).unwrap_err();
        assert!(matches!(err, PdfDeskError::CorruptPdf { .. }), "got: {err:?}");
    }

    #[test]
    fn progress_counts_pages() {
        let files = vec![
            SourceFile::new("a.pdf", sample_pdf(1, "A")),
            SourceFile::new("b.pdf", sample_pdf(2, "B")),
        ];
        let mut seen = Vec::new();
        merge_documents(&files, &ToolkitConfig::default(), |p, t| seen.push((p, t))).unwrap();
        assert_eq!(seen, vec![(1, 3), (3, 3)]);
    }
}
