//! Input handling: turn user-selected paths into in-memory [`SourceFile`]s.
//!
//! Every action reads its files exactly once, up front, into owned byte
//! buffers. Nothing downstream touches the file system for input, so the
//! handlers behave the same whether the bytes came from disk, a test fixture
//! or an embedding application.

use crate::dispatch::Action;
use crate::error::PdfDeskError;
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_UNKNOWN: &str = "application/octet-stream";

/// How far into a file the `%PDF` header may appear.
const PDF_HEADER_WINDOW: usize = 1024;

/// A user-selected file, read into memory.
#[derive(Clone)]
pub struct SourceFile {
    /// File name without directories, used for ordering and messages.
    pub name: String,
    /// Declared MIME type (from the extension, or sniffed when unknown).
    pub mime_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Create a source file, declaring its MIME type from the name.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = declared_mime(&name, &bytes).to_string();
        Self {
            name,
            mime_type,
            bytes,
        }
    }

    /// Create a source file with an explicit MIME type.
    pub fn with_mime(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Byte length of the contents.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Check that the contents carry a `%PDF` header.
    pub fn ensure_pdf(&self) -> Result<(), PdfDeskError> {
        let window = &self.bytes[..self.bytes.len().min(PDF_HEADER_WINDOW)];
        if window.windows(4).any(|w| w == b"%PDF") {
            Ok(())
        } else {
            Err(PdfDeskError::NotAPdf {
                name: self.name.clone(),
                magic: self.bytes.iter().take(4).copied().collect(),
            })
        }
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Work out the MIME type a file picker would declare for `name`.
///
/// The extension wins; content sniffing is only a fallback for names without
/// a recognised extension.
pub fn declared_mime(name: &str, bytes: &[u8]) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => MIME_PDF,
        Some("jpg") | Some("jpeg") | Some("jpe") | Some("jfif") => MIME_JPEG,
        Some("png") => MIME_PNG,
        _ => sniff_mime(bytes),
    }
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"%PDF") {
        MIME_PDF
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        MIME_JPEG
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        MIME_PNG
    } else {
        MIME_UNKNOWN
    }
}

/// Compare two file names for display and processing order.
///
/// Case-insensitive first so `b.png` does not jump ahead of `A.jpg`. Names
/// that differ only in case put lowercase first (`a.pdf` before `A.pdf`), as
/// locale-aware collation does, which keeps the result total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Order files by name. Stable, so duplicate names keep selection order.
pub fn sort_by_name(files: &mut [SourceFile]) {
    files.sort_by(|a, b| compare_names(&a.name, &b.name));
}

/// Fail with the action's "please select" message when nothing is selected.
pub fn require_files(action: Action, files: &[SourceFile]) -> Result<(), PdfDeskError> {
    if files.is_empty() {
        return Err(PdfDeskError::no_file_selected(action));
    }
    Ok(())
}

/// Read one file from disk.
pub async fn read_source(path: &Path) -> Result<SourceFile, PdfDeskError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PdfDeskError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => PdfDeskError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => PdfDeskError::Internal(format!("Failed to read {}: {}", path.display(), e)),
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read {} ({} bytes)", path.display(), bytes.len());
    Ok(SourceFile::new(name, bytes))
}

/// Read every selected file, in selection order.
pub async fn read_sources(paths: &[PathBuf]) -> Result<Vec<SourceFile>, PdfDeskError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(read_source(path).await?);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_from_extension() {
        assert_eq!(declared_mime("scan.JPG", b""), MIME_JPEG);
        assert_eq!(declared_mime("photo.jpeg", b""), MIME_JPEG);
        assert_eq!(declared_mime("shot.png", b""), MIME_PNG);
        assert_eq!(declared_mime("doc.pdf", b""), MIME_PDF);
    }

    #[test]
    fn extension_wins_over_content() {
        // A PNG named .jpg is declared as JPEG, like a browser file picker would.
        assert_eq!(declared_mime("odd.jpg", b"\x89PNG\r\n\x1a\n"), MIME_JPEG);
    }

    #[test]
    fn mime_sniffed_without_extension() {
        assert_eq!(declared_mime("blob", b"%PDF-1.7"), MIME_PDF);
        assert_eq!(declared_mime("blob", &[0xFF, 0xD8, 0xFF, 0xE0]), MIME_JPEG);
        assert_eq!(declared_mime("blob", b"\x89PNG\r\n\x1a\n...."), MIME_PNG);
        assert_eq!(declared_mime("blob", b"GIF89a"), MIME_UNKNOWN);
    }

    #[test]
    fn sort_orders_by_name() {
        let mut files = vec![
            SourceFile::new("b.png", vec![]),
            SourceFile::new("a.jpg", vec![]),
            SourceFile::new("C.png", vec![]),
        ];
        sort_by_name(&mut files);
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.png", "C.png"]);
    }

    #[test]
    fn compare_names_is_total() {
        assert_eq!(compare_names("a.pdf", "a.pdf"), Ordering::Equal);
        assert_eq!(compare_names("a.pdf", "A.pdf"), Ordering::Less);
        assert_eq!(compare_names("aB.pdf", "Ab.pdf"), Ordering::Less);
    }

    #[test]
    fn lowercase_sorts_before_uppercase_twin() {
        let mut files = vec![
            SourceFile::new("B.pdf", vec![]),
            SourceFile::new("A.pdf", vec![]),
            SourceFile::new("a.pdf", vec![]),
        ];
        sort_by_name(&mut files);
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "A.pdf", "B.pdf"]);
    }

    #[test]
    fn require_files_rejects_empty() {
        let err = require_files(Action::Split, &[]).unwrap_err();
        assert_eq!(err.to_string(), "Please select a PDF file");
        assert!(require_files(Action::Split, &[SourceFile::new("x.pdf", vec![])]).is_ok());
    }

    #[test]
    fn ensure_pdf_checks_header() {
        assert!(SourceFile::new("a.pdf", b"%PDF-1.4\n".to_vec()).ensure_pdf().is_ok());
        let err = SourceFile::new("a.pdf", b"hello".to_vec()).ensure_pdf().unwrap_err();
        assert!(matches!(err, PdfDeskError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn read_source_missing_file() {
        let err = read_source(Path::new("/definitely/not/here.pdf")).await.unwrap_err();
        assert!(matches!(err, PdfDeskError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn read_sources_keeps_selection_order() {
        let dir = tempfile::tempdir().unwrap();
        let b = dir.path().join("b.pdf");
        let a = dir.path().join("a.pdf");
        std::fs::write(&b, b"%PDF-b").unwrap();
        std::fs::write(&a, b"%PDF-a").unwrap();

        let files = read_sources(&[b, a]).await.unwrap();
        assert_eq!(files[0].name, "b.pdf");
        assert_eq!(files[1].name, "a.pdf");
        assert_eq!(files[1].mime_type, MIME_PDF);
        assert_eq!(files[1].len(), 6);
    }
}
