//! Text extraction from PDF documents.
//!
//! Pages are interpreted with `hayro-interpret` into a glyph-recording
//! device and text is rebuilt from glyph positions: a horizontal gap reads
//! as a space, a change of baseline as a line break.

use hayro_interpret::font::Glyph;
use hayro_interpret::hayro_syntax::Pdf;
use hayro_interpret::util::PageExt;
use hayro_interpret::{
    interpret_page, BlendMode, ClipPath, Context, Device, GlyphDrawMode, Image,
    InterpreterSettings, Paint, PathDrawMode, SoftMask,
};
use kurbo::{Affine, BezPath, Rect, Shape};
use pl_domain::error::{Error, Result};
use std::sync::Arc;

/// Horizontal gap, relative to glyph height, that reads as a word break.
const WORD_GAP_RATIO: f64 = 0.25;
/// Vertical overlap, relative to the shorter glyph, that keeps two glyphs on one line.
const SAME_LINE_OVERLAP: f64 = 0.5;

/// Extract the text of every page, pages separated by a blank line.
pub fn extract_text(data: Vec<u8>) -> Result<String> {
    let pdf = Pdf::new(Arc::new(data))
        .map_err(|e| Error::InvalidArgument(format!("malformed PDF: {e:?}")))?;
    let settings = InterpreterSettings::default();

    let mut pages = Vec::new();
    for page in pdf.pages().iter() {
        let (w, h) = page.render_dimensions();
        let bbox = Rect::new(0.0, 0.0, w as f64, h as f64);
        let mut ctx = Context::new(
            page.initial_transform(true),
            bbox,
            page.xref(),
            settings.clone(),
        );
        let mut device = GlyphRecorder::default();
        interpret_page(page, &mut ctx, &mut device);

        let text = device.text();
        if !text.trim().is_empty() {
            pages.push(text);
        }
    }
    Ok(pages.join("\n\n"))
}

// ── Device ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct GlyphRecorder {
    glyphs: Vec<(Option<char>, Option<Rect>)>,
}

impl GlyphRecorder {
    fn text(&self) -> String {
        let mut out = String::new();
        let mut last: Option<Rect> = None;
        let mut at_break = true;

        for &(ch, bbox) in &self.glyphs {
            // Blank glyphs (spaces) have an empty outline; skip them for geometry.
            let bbox = bbox.filter(|b| b.height() > 0.0);
            if let (Some(prev), Some(cur)) = (last, bbox) {
                if !same_line(prev, cur) {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    at_break = true;
                } else {
                    let gap = cur.x0 - prev.x1;
                    let avg_h = 0.5 * (prev.height() + cur.height());
                    if gap > WORD_GAP_RATIO * avg_h && !at_break {
                        out.push(' ');
                        at_break = true;
                    }
                }
            }
            if let Some(c) = ch {
                if !(c.is_whitespace() && at_break) {
                    out.push(c);
                }
                at_break = c.is_whitespace();
            }
            if bbox.is_some() {
                last = bbox;
            }
        }
        out
    }
}

fn same_line(a: Rect, b: Rect) -> bool {
    let overlap = a.y1.min(b.y1) - a.y0.max(b.y0);
    let shorter = a.height().min(b.height());
    overlap > 0.0 && shorter > 0.0 && overlap / shorter >= SAME_LINE_OVERLAP
}

impl<'a> Device<'a> for GlyphRecorder {
    fn set_soft_mask(&mut self, _mask: Option<SoftMask<'a>>) {}

    fn set_blend_mode(&mut self, _blend_mode: BlendMode) {}

    fn draw_path(
        &mut self,
        _path: &BezPath,
        _transform: Affine,
        _paint: &Paint<'a>,
        _draw_mode: &PathDrawMode,
    ) {
    }

    fn push_clip_path(&mut self, _clip_path: &ClipPath) {}

    fn push_transparency_group(
        &mut self,
        _opacity: f32,
        _mask: Option<SoftMask<'a>>,
        _blend_mode: BlendMode,
    ) {
    }

    fn draw_glyph(
        &mut self,
        glyph: &Glyph<'a>,
        transform: Affine,
        glyph_transform: Affine,
        _paint: &Paint<'a>,
        _draw_mode: &GlyphDrawMode,
    ) {
        let bbox = match glyph {
            Glyph::Outline(outline) => {
                Some((transform * (glyph_transform * outline.outline())).bounding_box())
            }
            Glyph::Type3(_) => None,
        };
        self.glyphs.push((glyph.as_unicode(), bbox));
    }

    fn draw_image(&mut self, _image: Image<'a, '_>, _transform: Affine) {}

    fn pop_clip_path(&mut self) {}

    fn pop_transparency_group(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(ch: char, x0: f64, x1: f64, y0: f64, y1: f64) -> (Option<char>, Option<Rect>) {
        (Some(ch), Some(Rect::new(x0, y0, x1, y1)))
    }

    #[test]
    fn gaps_become_spaces_and_baselines_become_lines() {
        let device = GlyphRecorder {
            glyphs: vec![
                glyph('H', 0.0, 6.0, 0.0, 10.0),
                glyph('i', 6.5, 8.0, 0.0, 10.0),
                glyph('y', 14.0, 20.0, 0.0, 10.0),
                glyph('o', 0.0, 6.0, 20.0, 30.0),
            ],
        };
        assert_eq!(device.text(), "Hi y\no");
    }

    #[test]
    fn explicit_spaces_are_not_doubled() {
        let device = GlyphRecorder {
            glyphs: vec![
                glyph('a', 0.0, 6.0, 0.0, 10.0),
                (Some(' '), Some(Rect::ZERO)),
                glyph('b', 12.0, 18.0, 0.0, 10.0),
            ],
        };
        assert_eq!(device.text(), "a b");
    }
}
