//! Configuration types for pdfdesk operations.
//!
//! All tunable behaviour lives in [`ToolkitConfig`], built via its
//! [`ToolkitConfigBuilder`]. The per-invocation parameters that the user picks
//! next to a button (rotation angle, compression level) are carried by the
//! operation itself, see [`crate::dispatch::Operation`].

use crate::error::PdfDeskError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable overriding [`cache_root`].
pub const CACHE_DIR_ENV: &str = "PDFDESK_CACHE_DIR";

/// Root directory for pdfdesk's own files (previews, a private PDFium copy).
///
/// Default locations:
/// - **macOS**: `~/Library/Caches/pdfdesk/`
/// - **Linux**: `~/.cache/pdfdesk/`
/// - **Windows**: `%LOCALAPPDATA%\pdfdesk\`
///
/// Override by setting `PDFDESK_CACHE_DIR`.
pub fn cache_root() -> PathBuf {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join("pdfdesk")
}

/// Configuration shared by every action of a [`crate::dispatch::Dispatcher`].
///
/// # Example
/// ```rust
/// use pdfdesk::ToolkitConfig;
///
/// let config = ToolkitConfig::builder()
///     .render_scale(2.0)
///     .jpeg_quality(80)
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality, 80);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolkitConfig {
    /// Scale factor used when rendering a page to an image. Range: 0.25–8.0. Default: 1.5.
    ///
    /// A scale of 1.0 maps one PDF point to one pixel.
    pub render_scale: f32,

    /// JPEG quality for extracted page images. Range: 1–100. Default: 92.
    pub jpeg_quality: u8,

    /// PDF version written into newly constructed documents. Default: "1.7".
    pub pdf_version: String,

    /// User password for encrypted documents (rendering only).
    pub password: Option<String>,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            render_scale: 1.5,
            jpeg_quality: 92,
            pdf_version: "1.7".to_string(),
            password: None,
        }
    }
}

impl ToolkitConfig {
    /// Create a new builder for `ToolkitConfig`.
    pub fn builder() -> ToolkitConfigBuilder {
        ToolkitConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ToolkitConfig`].
#[derive(Debug)]
pub struct ToolkitConfigBuilder {
    config: ToolkitConfig,
}

impl ToolkitConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn pdf_version(mut self, version: impl Into<String>) -> Self {
        self.config.pdf_version = version.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ToolkitConfig, PdfDeskError> {
        let c = &self.config;
        if !c.render_scale.is_finite() || !(0.25..=8.0).contains(&c.render_scale) {
            return Err(PdfDeskError::InvalidConfig(format!(
                "render scale must be 0.25–8.0, got {}",
                c.render_scale
            )));
        }
        if !matches!(c.pdf_version.as_str(), "1.4" | "1.5" | "1.6" | "1.7" | "2.0") {
            return Err(PdfDeskError::InvalidConfig(format!(
                "unsupported PDF version '{}'",
                c.pdf_version
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The fixed set of page rotations offered next to the rotate button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotationAngle {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl RotationAngle {
    /// The value written into a page's `/Rotate` entry.
    pub fn degrees(self) -> i64 {
        match self {
            RotationAngle::Deg0 => 0,
            RotationAngle::Deg90 => 90,
            RotationAngle::Deg180 => 180,
            RotationAngle::Deg270 => 270,
        }
    }

    /// All angles, in menu order.
    pub fn all() -> [RotationAngle; 4] {
        [
            RotationAngle::Deg0,
            RotationAngle::Deg90,
            RotationAngle::Deg180,
            RotationAngle::Deg270,
        ]
    }
}

impl TryFrom<i64> for RotationAngle {
    type Error = PdfDeskError;

    fn try_from(degrees: i64) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(RotationAngle::Deg0),
            90 => Ok(RotationAngle::Deg90),
            180 => Ok(RotationAngle::Deg180),
            270 => Ok(RotationAngle::Deg270),
            other => Err(PdfDeskError::InvalidRotation { degrees: other }),
        }
    }
}

impl fmt::Display for RotationAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// How hard the compress action works on a document.
///
/// Every level saves with object streams and a cross-reference stream.
///
/// | Level  | Save-time optimisation |
/// |--------|------------------------|
/// | low    | Flate-encode every uncompressed stream |
/// | medium | low + drop unreachable objects and empty streams, renumber objects (default) |
/// | high   | medium + re-encode embedded JPEG images at a lower quality |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl CompressionLevel {
    /// JPEG quality used when re-encoding images, if this level does so.
    pub fn image_quality(self) -> Option<u8> {
        match self {
            CompressionLevel::High => Some(60),
            _ => None,
        }
    }

    /// Flate level (0-9) for the object streams written at save time.
    pub fn object_stream_flate_level(self) -> u32 {
        match self {
            CompressionLevel::Low => 6,
            CompressionLevel::Medium => 6,
            CompressionLevel::High => 9,
        }
    }
}

impl FromStr for CompressionLevel {
    type Err = PdfDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(CompressionLevel::Low),
            "medium" => Ok(CompressionLevel::Medium),
            "high" => Ok(CompressionLevel::High),
            other => Err(PdfDeskError::InvalidCompressionLevel(other.to_string())),
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompressionLevel::Low => "low",
            CompressionLevel::Medium => "medium",
            CompressionLevel::High => "high",
        };
        f.write_str(s)
    }
}
