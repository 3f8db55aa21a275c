//! Result types handed from the dispatcher to the presentation layer.
//!
//! Byte payloads are skipped when serialising so `--json` output stays small;
//! sizes are reported instead.

use crate::dispatch::Action;
use crate::error::{ErrorKind, PdfDeskError};
use crate::pipeline::input::MIME_PDF;
use serde::Serialize;
use std::fmt;

/// A finished file ready to be "downloaded" (written out by the workspace).
#[derive(Clone, Serialize)]
pub struct OutputFile {
    /// Fixed download name, e.g. `merged.pdf` or `page_3.pdf`.
    pub file_name: String,
    pub mime_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Byte length of `bytes`.
    pub size: usize,
}

impl OutputFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = bytes.len();
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
            size,
        }
    }

    /// Shorthand for a PDF output.
    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(file_name, MIME_PDF, bytes)
    }
}

impl fmt::Debug for OutputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.size)
            .finish()
    }
}

/// One rendered page: an inline preview plus its own download.
#[derive(Debug, Clone, Serialize)]
pub struct PageImage {
    /// 1-indexed page number.
    pub page_num: usize,
    pub width: u32,
    pub height: u32,
    /// The JPEG, named `page_N.jpg`.
    pub file: OutputFile,
}

/// Byte counts around one compression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressionStats {
    pub original_size: usize,
    pub compressed_size: usize,
    pub images_reencoded: usize,
}

impl CompressionStats {
    /// Saved fraction of the original size; negative when the output grew.
    pub fn savings_ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        1.0 - self.compressed_size as f64 / self.original_size as f64
    }
}

/// What an action produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationOutput {
    /// Per-page previews with individual downloads (pages → images).
    Previews { pages: Vec<PageImage> },
    /// Several independent downloads (split).
    Files { files: Vec<OutputFile> },
    /// One download (assemble, merge, rotate).
    File { file: OutputFile },
    /// The compressed document and how much it shrank.
    Compressed {
        file: OutputFile,
        stats: CompressionStats,
    },
}

impl OperationOutput {
    /// Every downloadable file in presentation order.
    pub fn files(&self) -> Vec<&OutputFile> {
        match self {
            OperationOutput::Previews { pages } => pages.iter().map(|p| &p.file).collect(),
            OperationOutput::Files { files } => files.iter().collect(),
            OperationOutput::File { file } | OperationOutput::Compressed { file, .. } => {
                vec![file]
            }
        }
    }
}

/// Styling category of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Neutral,
    Success,
    Error,
}

/// Transient text shown under an action's button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
    /// Error class, when `kind` is `Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl StatusMessage {
    pub fn neutral(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Neutral,
            error_kind: None,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Success,
            error_kind: None,
        }
    }

    /// Error status. Validation failures show their message as-is; every
    /// other failure is prefixed with `Error: `.
    pub fn error(err: &PdfDeskError) -> Self {
        let kind = err.kind();
        let text = match kind {
            ErrorKind::Validation => err.to_string(),
            _ => format!("Error: {}", err),
        };
        Self {
            text,
            kind: StatusKind::Error,
            error_kind: Some(kind),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// The explicit result of one handler invocation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationReport {
    pub action: Action,
    pub status: StatusMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OperationOutput>,
    pub duration_ms: u64,
}

impl OperationReport {
    pub fn is_success(&self) -> bool {
        self.status.kind == StatusKind::Success
    }
}

/// Document facts read without rendering.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub pdf_version: String,
    pub encrypted: bool,
    pub title: Option<String>,
    pub author: Option<String>,
    pub producer: Option<String>,
    /// Effective `/Rotate` of each page, in page order.
    pub page_rotations: Vec<i64>,
}
