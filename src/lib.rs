//! # pdfdesk
//!
//! A local PDF desk: turn pages into images, images into a PDF, and split,
//! merge, rotate or compress documents. Everything runs on the local machine;
//! no file leaves it.
//!
//! ## Actions
//!
//! | Action | Input | Output |
//! |--------|-------|--------|
//! | pages → images | one PDF | `page_N.jpg` per page, plus an HTML preview |
//! | images → PDF | JPEG/PNG files | `converted_images.pdf`, one page per image |
//! | split | one PDF | `page_N.pdf` per page |
//! | merge | PDF files | `merged.pdf` |
//! | rotate | one PDF, angle | `rotated.pdf` |
//! | compress | one PDF, level | `compressed.pdf` |
//!
//! Multi-file inputs are processed in file-name order, not selection order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfdesk::{read_sources, Dispatcher, Operation, ToolkitConfig};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::new(ToolkitConfig::default());
//!     let files = read_sources(&[PathBuf::from("b.pdf"), PathBuf::from("a.pdf")]).await?;
//!     let report = dispatcher.run(Operation::Merge, files).await;
//!     println!("{}", report.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfdesk` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## Engines
//!
//! Rendering pages needs the PDFium shared library at runtime (see
//! [`pipeline::pdfium`]). Every other action is pure Rust via `lopdf`.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod dispatch;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod workspace;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{cache_root, CompressionLevel, RotationAngle, ToolkitConfig, ToolkitConfigBuilder};
pub use dispatch::{execute, Action, Dispatcher, Operation};
pub use error::{ErrorKind, PdfDeskError};
pub use output::{
    CompressionStats, DocumentInfo, OperationOutput, OperationReport, OutputFile, PageImage,
    StatusKind, StatusMessage,
};
pub use pipeline::input::{read_source, read_sources, SourceFile};
pub use progress::{NoopProgressCallback, OperationProgressCallback, ProgressCallback};
pub use workspace::{ClearSummary, Presentation, Workspace};

/// Read document facts (page count, version, metadata, rotations) without
/// rendering.
pub async fn inspect(source: SourceFile) -> Result<DocumentInfo, PdfDeskError> {
    tokio::task::spawn_blocking(move || pipeline::document::inspect(&source))
        .await
        .map_err(|e| PdfDeskError::Internal(format!("inspect task failed: {}", e)))?
}
