//! The presentation side of the toolkit: selections, status lines,
//! downloads and page previews.
//!
//! A [`Workspace`] is what the user sees and holds between actions. The
//! dispatcher knows nothing about it; callers feed it an
//! [`OperationReport`] via [`Workspace::present`].
//!
//! Downloads are written atomically into the output directory (temp file in
//! the same directory, then rename), so a failed write never leaves a
//! half-written `merged.pdf` behind. Page previews from the pages → images
//! action are written as a self-contained HTML page under the preview
//! directory and are replaced on every run.

use crate::config::cache_root;
use crate::dispatch::Action;
use crate::error::PdfDeskError;
use crate::output::{OperationOutput, OperationReport, PageImage, StatusMessage};
use crate::pipeline::encode::data_uri;
use crate::pipeline::input::{read_sources, SourceFile};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the preview page inside an action's preview directory.
pub const PREVIEW_PAGE: &str = "index.html";

/// Where the files of one presented report ended up.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Presentation {
    /// Every written download, in presentation order.
    pub downloads: Vec<PathBuf>,
    /// The preview page, for actions that produce previews.
    pub preview_page: Option<PathBuf>,
}

/// What [`Workspace::clear`] released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearSummary {
    pub selections_cleared: usize,
    pub statuses_cleared: usize,
    pub preview_files_removed: usize,
}

/// Per-action selections and statuses plus the on-disk output locations.
#[derive(Debug)]
pub struct Workspace {
    output_dir: PathBuf,
    preview_dir: PathBuf,
    previews_enabled: bool,
    selections: BTreeMap<Action, Vec<PathBuf>>,
    statuses: BTreeMap<Action, StatusMessage>,
}

impl Workspace {
    pub fn new(output_dir: impl Into<PathBuf>, preview_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            preview_dir: preview_dir.into(),
            previews_enabled: true,
            selections: BTreeMap::new(),
            statuses: BTreeMap::new(),
        }
    }

    /// Previews go under `<cache_root>/previews`.
    pub fn with_default_preview_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self::new(output_dir, cache_root().join("previews"))
    }

    /// Turn the preview page off (downloads are still written).
    pub fn set_previews_enabled(&mut self, enabled: bool) {
        self.previews_enabled = enabled;
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn preview_dir(&self) -> &Path {
        &self.preview_dir
    }

    /// Replace the selection of `action`.
    pub fn select(&mut self, action: Action, paths: Vec<PathBuf>) {
        self.selections.insert(action, paths);
    }

    /// Current selection of `action` (empty when nothing was selected).
    pub fn selection(&self, action: Action) -> &[PathBuf] {
        self.selections.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Read the selection of `action` into memory.
    pub async fn load_selection(&self, action: Action) -> Result<Vec<SourceFile>, PdfDeskError> {
        read_sources(self.selection(action)).await
    }

    /// Last status shown for `action`.
    pub fn status(&self, action: Action) -> Option<&StatusMessage> {
        self.statuses.get(&action)
    }

    /// Show a report: record its status, write its downloads and, for
    /// rendered pages, its preview page.
    pub fn present(&mut self, report: &OperationReport) -> Result<Presentation, PdfDeskError> {
        self.statuses.insert(report.action, report.status.clone());
        let Some(output) = &report.output else {
            return Ok(Presentation::default());
        };

        std::fs::create_dir_all(&self.output_dir).map_err(|e| PdfDeskError::OutputWriteFailed {
            path: self.output_dir.clone(),
            source: e,
        })?;

        let mut downloads = Vec::new();
        for file in output.files() {
            downloads.push(write_atomic(&self.output_dir, &file.file_name, &file.bytes)?);
        }

        let preview_page = match output {
            OperationOutput::Previews { pages } if self.previews_enabled => {
                Some(self.write_preview(report.action, pages)?)
            }
            _ => None,
        };

        info!(
            "{}: wrote {} download(s) to {}",
            report.action,
            downloads.len(),
            self.output_dir.display()
        );
        Ok(Presentation {
            downloads,
            preview_page,
        })
    }

    fn write_preview(&self, action: Action, pages: &[PageImage]) -> Result<PathBuf, PdfDeskError> {
        let dir = self.preview_dir.join(action.slug());
        // Previous previews of this action are replaced, not appended to.
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| PdfDeskError::OutputWriteFailed {
                path: dir.clone(),
                source: e,
            })?;
        }
        std::fs::create_dir_all(&dir).map_err(|e| PdfDeskError::OutputWriteFailed {
            path: dir.clone(),
            source: e,
        })?;

        let html = preview_html(pages);
        let path = write_atomic(&dir, PREVIEW_PAGE, html.as_bytes())?;
        debug!("Preview of {} pages at {}", pages.len(), path.display());
        Ok(path)
    }

    /// Drop every selection, status and preview. Downloads already written
    /// to the output directory are the user's and are kept.
    ///
    /// Safe to call repeatedly; a second call releases nothing.
    pub fn clear(&mut self) -> Result<ClearSummary, PdfDeskError> {
        let selections_cleared = self.selections.values().filter(|s| !s.is_empty()).count();
        let statuses_cleared = self.statuses.len();
        self.selections.clear();
        self.statuses.clear();

        let preview_files_removed = count_files(&self.preview_dir);
        if self.preview_dir.exists() {
            std::fs::remove_dir_all(&self.preview_dir).map_err(|e| {
                PdfDeskError::OutputWriteFailed {
                    path: self.preview_dir.clone(),
                    source: e,
                }
            })?;
        }

        let summary = ClearSummary {
            selections_cleared,
            statuses_cleared,
            preview_files_removed,
        };
        info!("Workspace cleared: {:?}", summary);
        Ok(summary)
    }
}

/// Write `bytes` to `dir/name` via a temp file in `dir`.
fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, PdfDeskError> {
    let path = dir.join(name);
    let write_err = |source: std::io::Error| PdfDeskError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(&path).map_err(|e| write_err(e.error))?;
    Ok(path)
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

fn preview_html(pages: &[PageImage]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
<title>Page previews</title>\n<style>\n\
body { font-family: sans-serif; margin: 2em; }\n\
.preview { display: inline-block; margin: 1em; text-align: center; }\n\
.preview img { max-width: 320px; border: 1px solid #ccc; }\n\
.download-link { display: block; margin-top: 0.5em; }\n\
</style>\n</head>\n<body>\n",
    );

    for page in pages {
        let uri = data_uri(&page.file.mime_type, &page.file.bytes);
        let (n, w, h) = (page.page_num, page.width, page.height);
        html.push_str("<div class=\"preview\">\n");
        html.push_str(&format!(
            "<img src=\"{uri}\" alt=\"Page {n}\" width=\"{w}\" height=\"{h}\">\n"
        ));
        html.push_str(&format!(
            "<a class=\"download-link\" href=\"{uri}\" download=\"{}\">Download Page {n}</a>\n",
            page.file.file_name
        ));
        html.push_str("</div>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}
