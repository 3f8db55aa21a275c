//! Error types for the pdfdesk library.
//!
//! A single fatal error type, [`PdfDeskError`], covers every way an action can
//! fail. The dispatcher never lets one escape a handler: it is caught at the
//! handler boundary and turned into an error-styled
//! [`crate::output::StatusMessage`].
//!
//! [`ErrorKind`] groups the variants into the three classes the presentation
//! layer cares about:
//!
//! * `Validation`: the operation was never attempted (nothing selected, a
//!   bad parameter, the action slot is busy).
//! * `ExternalLibrary`: PDFium, lopdf or an image codec rejected the input.
//! * `Environment`: the file system or the PDFium binding let us down.

use crate::dispatch::Action;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdfdesk library.
#[derive(Debug, Error)]
pub enum PdfDeskError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The action was triggered with an empty file selection.
    #[error("{message}")]
    NoFileSelected { action: Action, message: String },

    /// Rotation angle outside {0, 90, 180, 270}.
    #[error("Unsupported rotation angle {degrees}° (expected 0, 90, 180 or 270)")]
    InvalidRotation { degrees: i64 },

    /// Compression level name not recognised.
    #[error("Unknown compression level '{0}' (expected low, medium or high)")]
    InvalidCompressionLevel(String),

    /// The same action is already running.
    #[error("{action} is already running; wait for it to finish")]
    Busy { action: Action },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file was read, but is not a PDF.
    #[error("'{name}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── External library errors ───────────────────────────────────────────
    /// lopdf or PDFium could not parse the document.
    #[error("PDF '{name}' is corrupt: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// The document requires a password but none (or a wrong one) was given.
    #[error("PDF '{name}' is encrypted and requires a password")]
    PasswordRequired { name: String },

    /// The image could not be decoded or is of an unsupported type.
    #[error("Unsupported image '{name}': {detail}")]
    UnsupportedImage { name: String, detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// A rendered page could not be encoded.
    #[error("Image encoding failed for page {page}: {detail}")]
    EncodingFailed { page: usize, detail: String },

    /// lopdf failed while building or serialising a document.
    #[error("PDF operation failed: {0}")]
    PdfOperation(String),

    // ── Environment errors ────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Converting pages to images needs the PDFium shared library.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium, or\n\
  • place libpdfium next to the executable or in the pdfdesk cache directory, or\n\
  • install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`PdfDeskError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    ExternalLibrary,
    Environment,
}

impl PdfDeskError {
    /// Which class of failure this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PdfDeskError::NoFileSelected { .. }
            | PdfDeskError::InvalidRotation { .. }
            | PdfDeskError::InvalidCompressionLevel(_)
            | PdfDeskError::Busy { .. }
            | PdfDeskError::InvalidConfig(_) => ErrorKind::Validation,

            PdfDeskError::NotAPdf { .. }
            | PdfDeskError::CorruptPdf { .. }
            | PdfDeskError::PasswordRequired { .. }
            | PdfDeskError::UnsupportedImage { .. }
            | PdfDeskError::RasterisationFailed { .. }
            | PdfDeskError::EncodingFailed { .. }
            | PdfDeskError::PdfOperation(_) => ErrorKind::ExternalLibrary,

            PdfDeskError::FileNotFound { .. }
            | PdfDeskError::PermissionDenied { .. }
            | PdfDeskError::PdfiumBindingFailed(_)
            | PdfDeskError::OutputWriteFailed { .. }
            | PdfDeskError::Internal(_) => ErrorKind::Environment,
        }
    }

    /// Shorthand for the `NoFileSelected` variant with the action's prompt.
    pub fn no_file_selected(action: Action) -> Self {
        PdfDeskError::NoFileSelected {
            action,
            message: action.empty_selection_message().to_string(),
        }
    }
}

impl From<lopdf::Error> for PdfDeskError {
    fn from(e: lopdf::Error) -> Self {
        PdfDeskError::PdfOperation(e.to_string())
    }
}
