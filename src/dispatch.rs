//! Operation dispatch: one handler per action, each wrapped in the same
//! validate → busy → work → status sequence.
//!
//! ```text
//! run(op, files)
//!  │
//!  ├─ empty selection?  ──▶ "Please select …" (no busy indicator)
//!  ├─ slot taken?       ──▶ "… is already running" (no busy indicator)
//!  ├─ BusyGuard::start  ──▶ busy indicator on, neutral status
//!  ├─ execute()         ──▶ library work on the blocking pool
//!  └─ success / error status, BusyGuard dropped ──▶ busy indicator off
//! ```
//!
//! [`execute`] is the pure part: files in, [`OperationOutput`] out. The
//! [`Dispatcher`] adds the busy state, status messages and timing, and never
//! returns an error; failures are reported in the [`OperationReport`].

use crate::config::{CompressionLevel, RotationAngle, ToolkitConfig};
use crate::error::PdfDeskError;
use crate::output::{OperationOutput, OperationReport, StatusMessage};
use crate::pipeline::input::{require_files, SourceFile};
use crate::pipeline::{assemble, compress, merge, render, rotate, split};
use crate::progress::{BusyGuard, NoopProgressCallback, ProgressCallback};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// The six user-facing actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    PdfToImages,
    ImagesToPdf,
    Split,
    Merge,
    Rotate,
    Compress,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::PdfToImages,
        Action::ImagesToPdf,
        Action::Split,
        Action::Merge,
        Action::Rotate,
        Action::Compress,
    ];

    /// Short name used on the command line and in preview paths.
    pub fn slug(self) -> &'static str {
        match self {
            Action::PdfToImages => "to-images",
            Action::ImagesToPdf => "from-images",
            Action::Split => "split",
            Action::Merge => "merge",
            Action::Rotate => "rotate",
            Action::Compress => "compress",
        }
    }

    /// Prompt shown when the action runs with nothing selected.
    pub fn empty_selection_message(self) -> &'static str {
        match self {
            Action::PdfToImages | Action::Split | Action::Rotate | Action::Compress => {
                "Please select a PDF file"
            }
            Action::ImagesToPdf => "Please select one or more image files",
            Action::Merge => "Please select one or more PDF files",
        }
    }

    /// Neutral status shown while the action works.
    pub fn progress_message(self) -> &'static str {
        match self {
            Action::PdfToImages => "Processing...",
            Action::ImagesToPdf => "Creating PDF...",
            Action::Split => "Splitting PDF...",
            Action::Merge => "Merging PDFs...",
            Action::Rotate => "Rotating PDF...",
            Action::Compress => "Compressing PDF...",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// An action together with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Operation {
    PdfToImages,
    ImagesToPdf,
    Split,
    Merge,
    Rotate { angle: RotationAngle },
    Compress { level: CompressionLevel },
}

impl Operation {
    pub fn action(&self) -> Action {
        match self {
            Operation::PdfToImages => Action::PdfToImages,
            Operation::ImagesToPdf => Action::ImagesToPdf,
            Operation::Split => Action::Split,
            Operation::Merge => Action::Merge,
            Operation::Rotate { .. } => Action::Rotate,
            Operation::Compress { .. } => Action::Compress,
        }
    }

    /// Success status for a finished run.
    pub fn success_message(&self, output: &OperationOutput) -> String {
        match self {
            Operation::PdfToImages => "Conversion complete!".to_string(),
            Operation::ImagesToPdf => "PDF created successfully!".to_string(),
            Operation::Split => format!("PDF split into {} files!", output.files().len()),
            Operation::Merge => "PDFs merged successfully!".to_string(),
            Operation::Rotate { .. } => "PDF rotated successfully!".to_string(),
            Operation::Compress { .. } => "PDF compressed successfully!".to_string(),
        }
    }
}

/// Run `operation` over `files` synchronously.
///
/// Single-file actions use the first file and ignore the rest. `on_page`
/// receives `(page_num, total_pages)` as pages are finished.
pub fn execute(
    operation: Operation,
    files: &[SourceFile],
    config: &ToolkitConfig,
    on_page: impl FnMut(usize, usize),
) -> Result<OperationOutput, PdfDeskError> {
    require_files(operation.action(), files)?;
    let first = &files[0];

    let output = match operation {
        Operation::PdfToImages => OperationOutput::Previews {
            pages: render::render_to_images(first, config, on_page)?,
        },
        Operation::ImagesToPdf => OperationOutput::File {
            file: assemble::images_to_pdf(files, config, on_page)?,
        },
        Operation::Split => OperationOutput::Files {
            files: split::split_pages(first, config, on_page)?,
        },
        Operation::Merge => OperationOutput::File {
            file: merge::merge_documents(files, config, on_page)?,
        },
        Operation::Rotate { angle } => OperationOutput::File {
            file: rotate::rotate_pages(first, angle, on_page)?,
        },
        Operation::Compress { level } => {
            let (file, stats) = compress::compress_document(first, level)?;
            OperationOutput::Compressed { file, stats }
        }
    };
    Ok(output)
}

/// Marks one action as running; released on drop.
struct SlotGuard {
    slots: Arc<[AtomicBool; 6]>,
    index: usize,
}

impl SlotGuard {
    fn acquire(slots: &Arc<[AtomicBool; 6]>, action: Action) -> Option<Self> {
        let index = action.slot();
        slots[index]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                slots: Arc::clone(slots),
                index,
            })
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slots[self.index].store(false, Ordering::Release);
    }
}

/// Runs operations with busy state and status reporting.
///
/// Cloning is cheap and clones share busy state, so the same action cannot
/// run twice at once through any clone. Different actions may overlap.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<ToolkitConfig>,
    progress: ProgressCallback,
    slots: Arc<[AtomicBool; 6]>,
}

impl Dispatcher {
    pub fn new(config: ToolkitConfig) -> Self {
        Self {
            config: Arc::new(config),
            progress: Arc::new(NoopProgressCallback),
            slots: Arc::new(Default::default()),
        }
    }

    /// Receive busy, status and page events.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    /// Whether `action` is currently running.
    pub fn is_busy(&self, action: Action) -> bool {
        self.slots[action.slot()].load(Ordering::Acquire)
    }

    /// Run one operation to completion.
    pub async fn run(&self, operation: Operation, files: Vec<SourceFile>) -> OperationReport {
        let started = Instant::now();
        let action = operation.action();

        let report = |status: StatusMessage, output: Option<OperationOutput>| OperationReport {
            action,
            status,
            output,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        if let Err(e) = require_files(action, &files) {
            let status = StatusMessage::error(&e);
            self.progress.on_status(action, &status);
            return report(status, None);
        }

        let Some(_slot) = SlotGuard::acquire(&self.slots, action) else {
            warn!("{} requested while already running", action);
            let status = StatusMessage::error(&PdfDeskError::Busy { action });
            self.progress.on_status(action, &status);
            return report(status, None);
        };

        let mut busy = BusyGuard::start(action, Arc::clone(&self.progress));
        self.progress
            .on_status(action, &StatusMessage::neutral(action.progress_message()));
        info!("Starting {} with {} file(s)", action, files.len());

        let config = Arc::clone(&self.config);
        let progress = Arc::clone(&self.progress);
        let outcome = tokio::task::spawn_blocking(move || {
            execute(operation, &files, &config, |page, total| {
                progress.on_page_complete(action, page, total)
            })
        })
        .await
        .map_err(|e| PdfDeskError::Internal(format!("{} task failed: {}", action, e)))
        .and_then(|result| result);

        let (status, output) = match outcome {
            Ok(output) => {
                let status = StatusMessage::success(operation.success_message(&output));
                info!(
                    "{} finished in {}ms: {} file(s)",
                    action,
                    started.elapsed().as_millis(),
                    output.files().len()
                );
                (status, Some(output))
            }
            Err(e) => {
                warn!("{} failed: {}", action, e);
                (StatusMessage::error(&e), None)
            }
        };

        self.progress.on_status(action, &status);
        busy.finish(status.clone());
        drop(busy);
        report(status, output)
    }
}
