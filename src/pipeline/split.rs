//! Split a document into one single-page PDF per page.

use crate::config::ToolkitConfig;
use crate::error::PdfDeskError;
use crate::output::OutputFile;
use crate::pipeline::document::{self, save, PageAssembler, PreparedSource};
use crate::pipeline::input::SourceFile;
use tracing::info;

/// Download name of the file holding page `page_num` (1-indexed).
pub fn page_file_name(page_num: usize) -> String {
    format!("page_{}.pdf", page_num)
}

/// One `page_N.pdf` per source page, in page order.
pub fn split_pages(
    source: &SourceFile,
    config: &ToolkitConfig,
    mut on_page: impl FnMut(usize, usize),
) -> Result<Vec<OutputFile>, PdfDeskError> {
    let doc = document::load(source)?;
    let total = doc.get_pages().len();
    if total == 0 {
        return Err(PdfDeskError::PdfOperation(format!(
            "'{}' has no pages",
            source.name
        )));
    }

    // Every fresh assembler hands out the same first id, so one prepared
    // copy of the source serves all pages.
    let first_id = PageAssembler::new(&config.pdf_version).next_id();
    let prepared = PreparedSource::new(&doc, first_id)?;

    let mut files = Vec::with_capacity(total);
    for idx in 0..total {
        let mut assembler = PageAssembler::new(&config.pdf_version);
        assembler.copy_prepared(&prepared, &[idx])?;
        let mut single = assembler.finish();
        files.push(OutputFile::pdf(page_file_name(idx + 1), save(&mut single)?));
        on_page(idx + 1, total);
    }

    info!("Split '{}' into {} files", source.name, files.len());
    Ok(files)
}
