//! The library work behind each action.
//!
//! Two PDF engines are involved:
//!
//! ```text
//! render ──────────▶ pdfium  (rendering library: page → raster)
//! assemble ─┐
//! split ────┤
//! merge ────┼──────▶ document ──▶ lopdf  (construction library)
//! rotate ───┤
//! compress ─┘
//! ```
//!
//! 1. [`input`]   : in-memory source files, MIME detection, name ordering
//! 2. [`pdfium`]  : locate and bind the PDFium shared library
//! 3. [`render`]  : rasterise every page; blocking, run on the blocking pool
//! 4. [`encode`]  : JPEG encoding and data URIs for previews
//! 5. [`document`]: load/save helpers and the page assembler
//! 6. [`assemble`], [`split`], [`merge`], [`rotate`], [`compress`]: one
//!    module per construction action

pub mod assemble;
pub mod compress;
pub mod document;
pub mod encode;
pub mod input;
pub mod merge;
pub mod pdfium;
pub mod render;
pub mod rotate;
pub mod split;

#[cfg(test)]
pub(crate) mod fixtures;
