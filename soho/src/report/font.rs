//! Font configuration and TTF access for PDF rendering.
//!
//! Korean text needs an embedded font; the PDF base-14 fonts cannot
//! encode it. Font files and the family name come from the environment,
//! collected once at startup into a [`FontConfig`] and loaded into a
//! [`FontSet`] before rendering begins.

use std::path::PathBuf;

use ttf_parser::Face;

use crate::error::{Error, Result};

/// Font file locations and family name.
#[derive(Debug, Clone)]
pub struct FontConfig {
    /// Font family name used inside the PDF.
    pub family: String,
    /// Path to the regular-weight TTF.
    pub regular: PathBuf,
    /// Path to the bold-weight TTF.
    pub bold: PathBuf,
}

impl FontConfig {
    /// Default font family name.
    pub const DEFAULT_FAMILY: &'static str = "NotoSansKR";
    /// Default regular-weight font path.
    pub const DEFAULT_REGULAR: &'static str = "fonts/NotoSansKR-Regular.ttf";
    /// Default bold-weight font path.
    pub const DEFAULT_BOLD: &'static str = "fonts/NotoSansKR-Bold.ttf";

    /// Creates configuration from environment variables.
    ///
    /// Reads `PDF_FONT_NAME`, `PDF_FONT_REGULAR` and `PDF_FONT_BOLD`,
    /// falling back to the Noto Sans KR defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            family: std::env::var("PDF_FONT_NAME")
                .unwrap_or_else(|_| Self::DEFAULT_FAMILY.to_owned()),
            regular: std::env::var("PDF_FONT_REGULAR")
                .map_or_else(|_| PathBuf::from(Self::DEFAULT_REGULAR), PathBuf::from),
            bold: std::env::var("PDF_FONT_BOLD")
                .map_or_else(|_| PathBuf::from(Self::DEFAULT_BOLD), PathBuf::from),
        }
    }

    /// Creates configuration from explicit paths.
    #[must_use]
    pub fn new(
        family: impl Into<String>,
        regular: impl Into<PathBuf>,
        bold: impl Into<PathBuf>,
    ) -> Self {
        Self {
            family: family.into(),
            regular: regular.into(),
            bold: bold.into(),
        }
    }
}

/// One shaped glyph: id, source character and advance in font units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    /// Glyph id in the font (0 is .notdef).
    pub gid: u16,
    /// The character this glyph renders.
    pub ch: char,
    /// Horizontal advance in font units.
    pub advance: u16,
}

/// A loaded TTF with the lookups PDF embedding needs.
#[derive(Debug, Clone)]
pub struct LoadedFont {
    /// PostScript-ish name used in the PDF font dictionaries.
    pub name: String,
    /// Raw TTF bytes, embedded verbatim as FontFile2.
    pub data: Vec<u8>,
    /// Font units per em.
    pub units_per_em: u16,
    /// Typographic ascender, font units.
    pub ascender: i16,
    /// Typographic descender, font units (negative).
    pub descender: i16,
    /// Cap height, font units.
    pub cap_height: i16,
    /// Font bounding box (`x_min, y_min, x_max, y_max`), font units.
    pub bbox: [i16; 4],
}

impl LoadedFont {
    /// Loads and validates a TTF file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Render`] when the file cannot be read or is not
    /// a parseable TTF.
    pub fn load(name: impl Into<String>, path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| Error::render(format!("failed to read font {}: {e}", path.display())))?;
        let face = Face::parse(&data, 0)
            .map_err(|e| Error::render(format!("failed to parse font {}: {e}", path.display())))?;

        let bbox = face.global_bounding_box();
        let loaded = Self {
            name: name.into(),
            units_per_em: face.units_per_em(),
            ascender: face.ascender(),
            descender: face.descender(),
            cap_height: face.capital_height().unwrap_or(face.ascender()),
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            data,
        };
        Ok(loaded)
    }

    fn with_face<T>(&self, f: impl FnOnce(&Face<'_>) -> T) -> Result<T> {
        let face = Face::parse(&self.data, 0)
            .map_err(|e| Error::render(format!("font became unreadable: {e}")))?;
        Ok(f(&face))
    }

    /// Shapes text into glyphs using the font's character map.
    ///
    /// Unmapped characters shape to glyph 0 (.notdef) rather than failing;
    /// a report with one odd character should still render.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Render`] when the font data cannot be re-parsed.
    pub fn shape(&self, text: &str) -> Result<Vec<Glyph>> {
        self.with_face(|face| {
            text.chars()
                .map(|ch| {
                    let gid = face.glyph_index(ch).map_or(0, |g| g.0);
                    let advance = face
                        .glyph_hor_advance(ttf_parser::GlyphId(gid))
                        .unwrap_or(self.units_per_em / 2);
                    Glyph { gid, ch, advance }
                })
                .collect()
        })
    }

    /// Measures text width in points at the given size.
    ///
    /// # Errors
    ///
    /// Propagates shaping failures from [`LoadedFont::shape`].
    pub fn measure(&self, text: &str, size: f32) -> Result<f32> {
        let glyphs = self.shape(text)?;
        let units: u32 = glyphs.iter().map(|g| u32::from(g.advance)).sum();
        Ok(units as f32 * size / f32::from(self.units_per_em))
    }

    /// Converts a font-unit value to 1000-per-em PDF glyph space.
    #[must_use]
    pub fn to_pdf_units(&self, value: i32) -> i64 {
        i64::from(value) * 1000 / i64::from(self.units_per_em)
    }
}

/// Regular and bold faces of one family.
#[derive(Debug, Clone)]
pub struct FontSet {
    /// Regular weight.
    pub regular: LoadedFont,
    /// Bold weight.
    pub bold: LoadedFont,
}

impl FontSet {
    /// Loads both weights named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Render`] when either font file fails to load.
    pub fn load(config: &FontConfig) -> Result<Self> {
        let regular = LoadedFont::load(config.family.clone(), &config.regular)?;
        let bold = LoadedFont::load(format!("{}-Bold", config.family), &config.bold)?;
        Ok(Self { regular, bold })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn from_env_defaults_without_vars() {
        // Only assert the defaults; CI may set the env vars.
        if std::env::var("PDF_FONT_NAME").is_err() {
            let config = FontConfig::from_env();
            assert_eq!(config.family, FontConfig::DEFAULT_FAMILY);
        }
    }

    #[test]
    fn load_missing_font_is_render_error() {
        let err = LoadedFont::load("Missing", std::path::Path::new("/nonexistent.ttf"))
            .unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn load_garbage_font_is_render_error() {
        let dir = std::env::temp_dir().join("soho_font_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("garbage.ttf");
        std::fs::write(&path, b"not a font").unwrap();

        let err = LoadedFont::load("Garbage", &path).unwrap_err();
        assert!(matches!(err, Error::Render(_)));

        let _ = std::fs::remove_file(&path);
    }
}
