//! Locating and binding the PDFium shared library.
//!
//! pdfium-render loads PDFium at runtime, so the library has to be found on
//! disk before any page can be rendered. Lookup order (first hit wins):
//!
//! 1. `PDFIUM_LIB_PATH`: a library file, or a directory containing one.
//! 2. The directory of the running executable.
//! 3. `{cache_root}/pdfium/` (see [`crate::config::cache_root`]).
//! 4. The system library search path.
//!
//! Only the rendering action needs this; the construction operations work
//! without PDFium.

use crate::config::cache_root;
use crate::error::PdfDeskError;
use pdfium_render::prelude::Pdfium;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit PDFium library.
pub const LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Directory under the cache root where a private PDFium copy may live.
pub fn pdfium_cache_dir() -> PathBuf {
    cache_root().join("pdfium")
}

/// Platform library file expected inside `dir` (`libpdfium.so`, `pdfium.dll`, …).
fn library_in(dir: &Path) -> PathBuf {
    Pdfium::pdfium_platform_library_name_at_path(dir)
}

/// Candidate library files, in lookup order. Only existing files are returned.
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(env_path) = std::env::var(LIB_PATH_ENV) {
        let p = PathBuf::from(env_path);
        if p.is_dir() {
            candidates.push(library_in(&p));
        } else {
            candidates.push(p);
        }
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(library_in(&exe_dir));
    }

    candidates.push(library_in(&pdfium_cache_dir()));

    candidates.retain(|p| p.is_file());
    candidates
}

/// Bind to the first usable PDFium library.
pub fn bind_pdfium() -> Result<Pdfium, PdfDeskError> {
    let mut failures = Vec::new();

    for path in candidate_paths() {
        match Pdfium::bind_to_library(&path) {
            Ok(bindings) => {
                debug!("Bound PDFium from {}", path.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => {
                warn!("Could not bind PDFium at {}: {}", path.display(), e);
                failures.push(format!("{}: {}", path.display(), e));
            }
        }
    }

    Pdfium::bind_to_system_library()
        .map(|bindings| {
            debug!("Bound system PDFium library");
            Pdfium::new(bindings)
        })
        .map_err(|e| {
            failures.push(format!("system library: {}", e));
            PdfDeskError::PdfiumBindingFailed(failures.join("; "))
        })
}

/// `true` when some PDFium library can be bound right now.
pub fn is_pdfium_available() -> bool {
    bind_pdfium().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_dir_lives_under_cache_root() {
        assert!(pdfium_cache_dir().starts_with(cache_root()));
        assert!(pdfium_cache_dir().ends_with("pdfium"));
    }

    #[test]
    fn candidates_only_contain_existing_files() {
        for p in candidate_paths() {
            assert!(p.is_file(), "{} should exist", p.display());
        }
    }

    #[test]
    fn library_name_is_platform_specific() {
        let name = library_in(Path::new("/opt/lib"));
        let file = name.file_name().unwrap().to_string_lossy().to_string();
        assert!(file.contains("pdfium"), "got: {file}");
        assert!(name.starts_with("/opt/lib"));
    }
}
