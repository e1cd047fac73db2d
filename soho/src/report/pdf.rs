//! PDF encoding of a report flow.
//!
//! Builds the whole document in memory with `lopdf` and writes it once,
//! so a failure partway through leaves no partial file behind. Korean
//! text is drawn through an embedded `CIDFontType2` font with Identity-H
//! encoding; glyph ids and widths come from the TTF via `ttf-parser`.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};

use crate::error::{Error, Result};

use super::font::{FontSet, Glyph, LoadedFont};
use super::{Flow, FlowTable, ReportBundle, build_flow};

const PAGE_WIDTH: f32 = 595.28; // A4 portrait, points
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN_X: f32 = 56.69; // 20 mm
const MARGIN_Y: f32 = 51.02; // 18 mm

const TITLE_SIZE: f32 = 18.0;
const TITLE_LEADING: f32 = 22.0;
const BODY_SIZE: f32 = 10.0;
const BODY_LEADING: f32 = 13.0;
const CELL_PAD: f32 = 3.0;
const SECTION_GAP: f32 = 8.0;

/// Millimeters to points.
fn mm(v: f32) -> f32 {
    v * 72.0 / 25.4
}

fn real(v: f32) -> Object {
    Object::Real(v.into())
}

/// Renders a bundle to a PDF file at `out_path`.
///
/// # Errors
///
/// Fails when fonts cannot be shaped or the file cannot be written;
/// nothing is written on failure.
pub fn render_pdf(bundle: &ReportBundle, fonts: &FontSet, out_path: &Path) -> Result<()> {
    let flow = build_flow(bundle);
    let mut renderer = Renderer::new(fonts);

    for element in &flow {
        match element {
            Flow::Title(text) => renderer.draw_title(text)?,
            Flow::Heading(text) => renderer.draw_heading(text)?,
            Flow::Paragraph(text) => {
                renderer.draw_paragraph(text, false)?;
                renderer.gap(SECTION_GAP);
            }
            Flow::Bullets(items) => {
                for item in items {
                    renderer.draw_paragraph(&format!("- {item}"), false)?;
                }
                renderer.gap(SECTION_GAP);
            }
            Flow::Table(table) => {
                renderer.draw_table(table)?;
                renderer.gap(SECTION_GAP);
            }
        }
    }

    renderer.finish(out_path)
}

/// Which weight to draw with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Weight {
    Regular,
    Bold,
}

impl Weight {
    const fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

/// Glyphs actually drawn, per font: gid -> (unicode, width in 1000/em).
type UsedGlyphs = BTreeMap<u16, (char, i64)>;

struct Renderer<'a> {
    fonts: &'a FontSet,
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    /// Top of the next line, in page coordinates.
    y: f32,
    used_regular: UsedGlyphs,
    used_bold: UsedGlyphs,
}

impl<'a> Renderer<'a> {
    fn new(fonts: &'a FontSet) -> Self {
        Self {
            fonts,
            pages: Vec::new(),
            ops: Vec::new(),
            y: PAGE_HEIGHT - MARGIN_Y,
            used_regular: UsedGlyphs::new(),
            used_bold: UsedGlyphs::new(),
        }
    }

    fn font(&self, weight: Weight) -> &LoadedFont {
        match weight {
            Weight::Regular => &self.fonts.regular,
            Weight::Bold => &self.fonts.bold,
        }
    }

    fn break_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(ops);
        self.y = PAGE_HEIGHT - MARGIN_Y;
    }

    /// Starts a new page when fewer than `height` points remain.
    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN_Y && !self.ops.is_empty() {
            self.break_page();
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn record(&mut self, weight: Weight, glyphs: &[Glyph]) {
        let upem = i64::from(self.font(weight).units_per_em);
        let used = match weight {
            Weight::Regular => &mut self.used_regular,
            Weight::Bold => &mut self.used_bold,
        };
        for g in glyphs {
            let width = i64::from(g.advance) * 1000 / upem;
            used.entry(g.gid).or_insert((g.ch, width));
        }
    }

    /// Draws one already-wrapped line at a baseline position.
    fn draw_line_at(&mut self, x: f32, baseline: f32, text: &str, weight: Weight, size: f32)
    -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let glyphs = self.font(weight).shape(text)?;
        self.record(weight, &glyphs);

        let mut bytes = Vec::with_capacity(glyphs.len() * 2);
        for g in &glyphs {
            bytes.extend_from_slice(&g.gid.to_be_bytes());
        }

        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tf",
            vec![weight.resource().into(), real(size)],
        ));
        self.ops
            .push(Operation::new("Td", vec![real(x), real(baseline)]));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::String(bytes, StringFormat::Hexadecimal)],
        ));
        self.ops.push(Operation::new("ET", vec![]));
        Ok(())
    }

    /// Wraps `text` (no embedded newlines) to `max_width` points.
    fn wrap(&self, text: &str, weight: Weight, size: f32, max_width: f32) -> Result<Vec<String>> {
        let font = self.font(weight);
        let glyphs = font.shape(text)?;
        let scale = size / f32::from(font.units_per_em);
        let widths: Vec<(char, f32)> = glyphs
            .iter()
            .map(|g| (g.ch, f32::from(g.advance) * scale))
            .collect();
        Ok(wrap_widths(&widths, max_width))
    }

    fn draw_title(&mut self, text: &str) -> Result<()> {
        self.ensure_space(TITLE_LEADING);
        let width = self.fonts.bold.measure(text, TITLE_SIZE)?;
        let x = (PAGE_WIDTH - width) / 2.0;
        let baseline = self.y - TITLE_SIZE;
        self.draw_line_at(x, baseline, text, Weight::Bold, TITLE_SIZE)?;
        self.y -= TITLE_LEADING + 6.0;
        Ok(())
    }

    fn draw_heading(&mut self, text: &str) -> Result<()> {
        self.ensure_space(BODY_LEADING * 2.0);
        let baseline = self.y - BODY_SIZE;
        self.draw_line_at(MARGIN_X, baseline, text, Weight::Bold, BODY_SIZE)?;
        self.y -= BODY_LEADING + 2.0;
        Ok(())
    }

    fn draw_paragraph(&mut self, text: &str, bold: bool) -> Result<()> {
        let weight = if bold { Weight::Bold } else { Weight::Regular };
        let max_width = PAGE_WIDTH - 2.0 * MARGIN_X;

        for raw_line in text.split('\n') {
            for line in self.wrap(raw_line, weight, BODY_SIZE, max_width)? {
                self.ensure_space(BODY_LEADING);
                let baseline = self.y - BODY_SIZE;
                self.draw_line_at(MARGIN_X, baseline, &line, weight, BODY_SIZE)?;
                self.y -= BODY_LEADING;
            }
        }
        Ok(())
    }

    fn draw_table(&mut self, table: &FlowTable) -> Result<()> {
        let col_widths: Vec<f32> = table.col_widths_mm.iter().map(|&w| mm(w)).collect();

        for (row_idx, row) in table.rows.iter().enumerate() {
            let is_header = table.header && row_idx == 0;
            let weight = if is_header {
                Weight::Bold
            } else {
                Weight::Regular
            };

            // Wrap every cell first; the tallest cell sets the row height.
            let mut cells: Vec<Vec<String>> = Vec::with_capacity(row.len());
            for (col_idx, cell) in row.iter().enumerate() {
                let width = col_widths.get(col_idx).copied().unwrap_or(mm(30.0));
                let mut lines = Vec::new();
                for raw_line in cell.split('\n') {
                    lines.extend(self.wrap(raw_line, weight, BODY_SIZE, width - 2.0 * CELL_PAD)?);
                }
                cells.push(lines);
            }
            let line_count = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
            let row_height = line_count as f32 * BODY_LEADING + 2.0 * CELL_PAD;

            self.ensure_space(row_height);
            let top = self.y;

            if is_header {
                self.fill_rect(MARGIN_X, top - row_height, col_widths.iter().sum(), row_height);
            }

            let mut x = MARGIN_X;
            for (col_idx, lines) in cells.iter().enumerate() {
                let width = col_widths.get(col_idx).copied().unwrap_or(mm(30.0));
                self.stroke_rect(x, top - row_height, width, row_height);

                let mut baseline = top - CELL_PAD - BODY_SIZE;
                for line in lines {
                    self.draw_line_at(x + CELL_PAD, baseline, line, weight, BODY_SIZE)?;
                    baseline -= BODY_LEADING;
                }
                x += width;
            }

            self.y -= row_height;
        }
        Ok(())
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new("w", vec![real(0.4)]));
        self.ops.push(Operation::new("G", vec![real(0.3)]));
        self.ops.push(Operation::new(
            "re",
            vec![real(x), real(y), real(w), real(h)],
        ));
        self.ops.push(Operation::new("S", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new("g", vec![real(0.93)]));
        self.ops.push(Operation::new(
            "re",
            vec![real(x), real(y), real(w), real(h)],
        ));
        self.ops.push(Operation::new("f", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    /// Assembles the document and writes it to disk in one pass.
    fn finish(mut self, out_path: &Path) -> Result<()> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            let ops = std::mem::take(&mut self.ops);
            self.pages.push(ops);
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = add_type0_font(&mut doc, &self.fonts.regular, &self.used_regular);
        let bold_id = add_type0_font(&mut doc, &self.fonts.bold, &self.used_bold);
        let resources = dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
            },
        };

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for ops in std::mem::take(&mut self.pages) {
            let content = Content { operations: ops };
            let encoded = content
                .encode()
                .map_err(|e| Error::render(format!("failed to encode page content: {e}")))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), real(PAGE_WIDTH), real(PAGE_HEIGHT)],
                "Resources" => resources,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        doc.save(out_path)
            .map_err(|e| Error::render(format!("failed to write PDF: {e}")))?;
        tracing::info!(path = %out_path.display(), pages = count, "report written");
        Ok(())
    }
}

/// Embeds a TTF as a Type0/CIDFontType2 font and returns its object id.
fn add_type0_font(doc: &mut Document, font: &LoadedFont, used: &UsedGlyphs) -> ObjectId {
    let font_file_id = doc.add_object(Stream::new(
        dictionary! { "Length1" => font.data.len() as i64 },
        font.data.clone(),
    ));

    let base_name = format!("SOHO+{}", font.name.replace(' ', ""));
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => base_name.as_str(),
        "Flags" => 4,
        "FontBBox" => vec![
            font.to_pdf_units(i32::from(font.bbox[0])).into(),
            font.to_pdf_units(i32::from(font.bbox[1])).into(),
            font.to_pdf_units(i32::from(font.bbox[2])).into(),
            font.to_pdf_units(i32::from(font.bbox[3])).into(),
        ],
        "ItalicAngle" => 0,
        "Ascent" => font.to_pdf_units(i32::from(font.ascender)),
        "Descent" => font.to_pdf_units(i32::from(font.descender)),
        "CapHeight" => font.to_pdf_units(i32::from(font.cap_height)),
        "StemV" => 80,
        "FontFile2" => font_file_id,
    });

    let mut widths: Vec<Object> = Vec::with_capacity(used.len() * 2);
    for (&gid, &(_, width)) in used {
        widths.push(i64::from(gid).into());
        widths.push(vec![Object::from(width)].into());
    }

    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => base_name.as_str(),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 1000,
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });

    let to_unicode_id = doc.add_object(Stream::new(
        dictionary! {},
        to_unicode_cmap(used).into_bytes(),
    ));

    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => base_name.as_str(),
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::from(cid_font_id)],
        "ToUnicode" => to_unicode_id,
    })
}

/// Builds a ToUnicode CMap so text extraction maps glyphs back to text.
fn to_unicode_cmap(used: &UsedGlyphs) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );

    let entries: Vec<(u16, char)> = used.iter().map(|(&gid, &(ch, _))| (gid, ch)).collect();
    for chunk in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for &(gid, ch) in chunk {
            let mut units = [0_u16; 2];
            let encoded = ch.encode_utf16(&mut units);
            let target: String = encoded.iter().map(|u| format!("{u:04X}")).collect();
            cmap.push_str(&format!("<{gid:04X}> <{target}>\n"));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\nend\n",
    );
    cmap
}

/// Greedy line wrapping over pre-measured character widths.
///
/// Prefers breaking at the last space on the line; otherwise breaks at
/// the character boundary (the common case for Korean text).
fn wrap_widths(chars: &[(char, f32)], max_width: f32) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut cur: Vec<(char, f32)> = Vec::new();
    let mut cur_width = 0.0_f32;

    for &(ch, width) in chars {
        if ch == ' ' && cur.is_empty() {
            continue;
        }
        if cur_width + width > max_width && !cur.is_empty() {
            if ch == ' ' {
                // The line ends exactly here; the space itself is dropped.
                lines.push(cur.iter().map(|&(c, _)| c).collect());
                cur = Vec::new();
                cur_width = 0.0;
                continue;
            }
            if let Some(pos) = cur.iter().rposition(|&(c, _)| c == ' ') {
                let rest = cur.split_off(pos + 1);
                cur.pop(); // drop the break space
                lines.push(cur.iter().map(|&(c, _)| c).collect());
                cur = rest;
            } else {
                lines.push(cur.iter().map(|&(c, _)| c).collect());
                cur = Vec::new();
            }
            cur_width = cur.iter().map(|&(_, w)| w).sum();
        }
        cur.push((ch, width));
        cur_width += width;
    }

    if !cur.is_empty() || lines.is_empty() {
        lines.push(cur.iter().map(|&(c, _)| c).collect());
    }
    lines
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn fixed(text: &str, w: f32) -> Vec<(char, f32)> {
        text.chars().map(|c| (c, w)).collect()
    }

    mod wrap_widths {
        use super::*;

        #[test]
        fn short_text_stays_on_one_line() {
            let lines = wrap_widths(&fixed("hello", 1.0), 10.0);
            assert_eq!(lines, vec!["hello"]);
        }

        #[test]
        fn breaks_at_last_space() {
            let lines = wrap_widths(&fixed("aaa bbb ccc", 1.0), 9.0);
            assert_eq!(lines, vec!["aaa bbb", "ccc"]);
        }

        #[test]
        fn breaks_mid_word_without_spaces() {
            // Korean text usually has no break opportunities.
            let lines = wrap_widths(&fixed("가나다라마바사", 2.0), 6.0);
            assert_eq!(lines, vec!["가나다", "라마바", "사"]);
        }

        #[test]
        fn leading_spaces_on_continuation_are_dropped() {
            let lines = wrap_widths(&fixed("aa bb cc", 1.0), 5.0);
            assert_eq!(lines, vec!["aa bb", "cc"]);
        }

        #[test]
        fn break_exactly_on_a_space_keeps_the_full_line() {
            let lines = wrap_widths(&fixed("aa bb cc dd", 1.0), 5.0);
            assert_eq!(lines, vec!["aa bb", "cc dd"]);
        }

        #[test]
        fn empty_input_yields_one_empty_line() {
            let lines = wrap_widths(&[], 10.0);
            assert_eq!(lines, vec![String::new()]);
        }

        #[test]
        fn single_overwide_char_is_kept() {
            let lines = wrap_widths(&fixed("a", 100.0), 10.0);
            assert_eq!(lines, vec!["a"]);
        }
    }

    mod to_unicode_cmap {
        use super::*;

        #[test]
        fn maps_gid_to_utf16() {
            let mut used = UsedGlyphs::new();
            used.insert(0x01A4, ('부', 500));
            let cmap = to_unicode_cmap(&used);
            assert!(cmap.contains("1 beginbfchar"));
            assert!(cmap.contains("<01A4> <BD80>")); // U+BD80 = 부
        }

        #[test]
        fn empty_usage_produces_no_bfchar_blocks() {
            let cmap = to_unicode_cmap(&UsedGlyphs::new());
            assert!(!cmap.contains("beginbfchar"));
            assert!(cmap.contains("begincodespacerange"));
        }
    }

    mod mm_conversion {
        use super::*;

        #[test]
        fn twenty_mm_is_margin() {
            assert!((mm(20.0) - 56.69).abs() < 0.01);
        }
    }
}
