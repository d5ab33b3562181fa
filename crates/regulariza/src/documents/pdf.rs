//! Letter-size canvas with manual text placement.
//!
//! Everything is positioned in millimetres from the bottom-left corner. Text
//! width is estimated from the character count, which is close enough for
//! Helvetica at body sizes; callers wrap with [`wrap_text`] and the canvas
//! breaks pages whenever the cursor would cross the bottom margin.

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};

use super::text::{truncate, wrap_text};
use super::DocumentError;

const LETTER_WIDTH_MM: f32 = 215.9;
const LETTER_HEIGHT_MM: f32 = 279.4;
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width relative to the font size.
const GLYPH_WIDTH_RATIO: f32 = 0.5;
const LINE_SPACING: f32 = 1.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Regular,
    Bold,
    Italic,
}

/// Column description for [`PdfCanvas::table_row`].
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub width_mm: f32,
}

pub struct PdfCanvas {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    width: f32,
    height: f32,
    margin: f32,
    cursor: f32,
    pages: usize,
}

impl PdfCanvas {
    pub fn new(
        title: &str,
        orientation: Orientation,
        margin_mm: f32,
    ) -> Result<Self, DocumentError> {
        let (width, height) = match orientation {
            Orientation::Portrait => (LETTER_WIDTH_MM, LETTER_HEIGHT_MM),
            Orientation::Landscape => (LETTER_HEIGHT_MM, LETTER_WIDTH_MM),
        };
        let (doc, page, layer) = PdfDocument::new(title, Mm(width), Mm(height), "Capa 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|err| DocumentError::Pdf(err.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|err| DocumentError::Pdf(err.to_string()))?;
        let italic = doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(|err| DocumentError::Pdf(err.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            italic,
            width,
            height,
            margin: margin_mm,
            cursor: height - margin_mm,
            pages: 1,
        })
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn left(&self) -> f32 {
        self.margin
    }

    /// Vertical distance consumed by one line at `size` points.
    pub fn line_height(size: f32) -> f32 {
        size * PT_TO_MM * LINE_SPACING
    }

    /// Characters that fit in `width_mm` at `size` points.
    pub fn chars_per_width(width_mm: f32, size: f32) -> usize {
        let glyph = size * PT_TO_MM * GLYPH_WIDTH_RATIO;
        ((width_mm / glyph).floor() as usize).max(1)
    }

    pub fn estimated_width(text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * size * PT_TO_MM * GLYPH_WIDTH_RATIO
    }

    pub fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(self.width), Mm(self.height), format!("Capa {}", self.pages + 1));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.pages += 1;
        self.cursor = self.height - self.margin;
    }

    /// Start a new page when fewer than `needed_mm` remain above the margin.
    pub fn ensure_space(&mut self, needed_mm: f32) -> bool {
        if self.cursor - needed_mm < self.margin {
            self.new_page();
            true
        } else {
            false
        }
    }

    pub fn advance(&mut self, mm: f32) {
        self.cursor -= mm;
    }

    fn font(&self, style: TextStyle) -> &IndirectFontRef {
        match style {
            TextStyle::Regular => &self.regular,
            TextStyle::Bold => &self.bold,
            TextStyle::Italic => &self.italic,
        }
    }

    /// Place `text` with its baseline at the current cursor.
    pub fn text_at(&mut self, text: &str, size: f32, x_mm: f32, style: TextStyle) {
        let font = self.font(style).clone();
        self.layer
            .use_text(text, size, Mm(x_mm), Mm(self.cursor), &font);
    }

    /// Single line at the left margin, then move down.
    pub fn line(&mut self, text: &str, size: f32, style: TextStyle) {
        let height = Self::line_height(size);
        self.ensure_space(height);
        self.cursor -= height;
        let x = self.margin;
        self.text_at(text, size, x, style);
    }

    pub fn centered(&mut self, text: &str, size: f32, style: TextStyle) {
        let height = Self::line_height(size);
        self.ensure_space(height);
        self.cursor -= height;
        let width = Self::estimated_width(text, size);
        let x = ((self.width - width) / 2.0).max(self.margin);
        self.text_at(text, size, x, style);
    }

    /// Wrapped block spanning the content width.
    pub fn paragraph(&mut self, text: &str, size: f32, style: TextStyle) {
        let max_chars = Self::chars_per_width(self.content_width(), size);
        for line in wrap_text(text, max_chars) {
            if line.is_empty() {
                self.advance(Self::line_height(size) * 0.6);
                continue;
            }
            self.line(&line, size, style);
        }
    }

    pub fn set_color(&mut self, red: f32, green: f32, blue: f32) {
        let color = Color::Rgb(Rgb::new(red, green, blue, None));
        self.layer.set_fill_color(color.clone());
        self.layer.set_outline_color(color);
    }

    pub fn reset_color(&mut self) {
        self.set_color(0.0, 0.0, 0.0);
    }

    pub fn segment(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, thickness: f32) {
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), Mm(y1)), false),
                (Point::new(Mm(x2), Mm(y2)), false),
            ],
            is_closed: false,
        });
    }

    /// Horizontal rule across the content width below the cursor.
    pub fn rule(&mut self, thickness: f32) {
        self.advance(1.5);
        let y = self.cursor;
        let (left, right) = (self.margin, self.width - self.margin);
        self.segment(left, y, right, y, thickness);
        self.advance(1.5);
    }

    /// Row of cells; every value is truncated to its column width.
    pub fn table_row(
        &mut self,
        columns: &[Column],
        values: &[String],
        size: f32,
        style: TextStyle,
    ) {
        let height = Self::line_height(size) + 1.5;
        self.cursor -= height;
        let mut x = self.margin;
        for (column, value) in columns.iter().zip(values) {
            let max_chars = Self::chars_per_width(column.width_mm - 2.0, size);
            let cell = truncate(value, max_chars);
            let font = self.font(style).clone();
            self.layer
                .use_text(cell, size, Mm(x + 1.0), Mm(self.cursor + 1.0), &font);
            x += column.width_mm;
        }
        let y = self.cursor;
        let right = self.margin + columns.iter().map(|column| column.width_mm).sum::<f32>();
        let left = self.margin;
        self.segment(left, y, right, y, 0.3);
    }

    /// Side-by-side signature lines with their captions underneath.
    pub fn signature_lines(&mut self, captions: &[Vec<String>], size: f32) {
        if captions.is_empty() {
            return;
        }
        let caption_lines = captions.iter().map(Vec::len).max().unwrap_or(1) as f32;
        self.ensure_space(20.0 + caption_lines * Self::line_height(size));
        self.advance(18.0);

        let slot = self.content_width() / captions.len() as f32;
        let line_width = (slot - 10.0).min(70.0);
        let top = self.cursor;
        for (idx, lines) in captions.iter().enumerate() {
            let center = self.margin + slot * (idx as f32 + 0.5);
            self.segment(center - line_width / 2.0, top, center + line_width / 2.0, top, 0.6);
            let mut y = top;
            for (line_idx, caption) in lines.iter().enumerate() {
                y -= Self::line_height(size);
                let style = if line_idx == 0 {
                    TextStyle::Bold
                } else {
                    TextStyle::Regular
                };
                let x = (center - Self::estimated_width(caption, size) / 2.0).max(self.margin);
                let font = self.font(style).clone();
                self.layer.use_text(caption.as_str(), size, Mm(x), Mm(y), &font);
            }
        }
        self.cursor = top - caption_lines * Self::line_height(size);
    }

    pub fn finish(self) -> Result<Vec<u8>, DocumentError> {
        self.doc
            .save_to_bytes()
            .map_err(|err| DocumentError::Pdf(err.to_string()))
    }
}
