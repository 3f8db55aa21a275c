//! PDF rasterisation: render every page to a JPEG via PDFium.
//!
//! PDFium is not async-safe, so everything here is blocking; the dispatcher
//! calls it from `tokio::task::spawn_blocking`.

use crate::config::ToolkitConfig;
use crate::error::PdfDeskError;
use crate::output::{OutputFile, PageImage};
use crate::pipeline::encode;
use crate::pipeline::input::{SourceFile, MIME_JPEG};
use crate::pipeline::pdfium::bind_pdfium;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Render every page of `source` and encode it as `page_N.jpg`.
///
/// `on_page` is called after each page with `(page_num, total_pages)`.
pub fn render_to_images(
    source: &SourceFile,
    config: &ToolkitConfig,
    mut on_page: impl FnMut(usize, usize),
) -> Result<Vec<PageImage>, PdfDeskError> {
    source.ensure_pdf()?;
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(&source.bytes, config.password.as_deref())
        .map_err(|e| map_load_error(&source.name, e))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new().scale_page_by_factor(config.render_scale);

    let mut results = Vec::with_capacity(total_pages);
    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            PdfDeskError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        let jpeg = encode::encode_jpeg(&image, config.jpeg_quality).map_err(|e| {
            PdfDeskError::EncodingFailed {
                page: page_num,
                detail: e.to_string(),
            }
        })?;

        results.push(PageImage {
            page_num,
            width: image.width(),
            height: image.height(),
            file: OutputFile::new(format!("page_{page_num}.jpg"), MIME_JPEG, jpeg),
        });
        on_page(page_num, total_pages);
    }

    Ok(results)
}

fn map_load_error(name: &str, e: PdfiumError) -> PdfDeskError {
    let detail = format!("{:?}", e);
    if detail.to_lowercase().contains("password") {
        PdfDeskError::PasswordRequired {
            name: name.to_string(),
        }
    } else {
        PdfDeskError::CorruptPdf {
            name: name.to_string(),
            detail,
        }
    }
}
