//! Rasterizes a line of text into a sign-sized frame: background fill, an
//! outline stamped around each glyph, then the fill color on top.

use std::path::PathBuf;

use ab_glyph::{point, Font, FontArc, FontVec, PxScale, ScaleFont};
use fontdb::{Database, Family, Query, Weight};
use image::{Rgb, RgbImage};
use serde::Deserialize;
use tracing::debug;

use crate::error::Error;
use crate::frame::{Frame, FrameSequence};

/// Autosize never grows past this; stops runaway growth when the text has no
/// renderable outline at any size.
const MAX_AUTOSIZE: f32 = 512.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct TextStyle {
    pub text: String,
    /// Point size; the starting point when `autosize` is on.
    pub size: f32,
    /// Grow/shrink the text to the largest size that fits inside the margin,
    /// then center it.
    pub autosize: bool,
    pub margin: u32,
    pub x: i32,
    pub y: i32,
    /// Outline radius in pixels; `0` disables the outline.
    pub thickness: u32,
    /// Font family name; falls back to the system sans-serif.
    pub font: Option<String>,
    /// Explicit font file, taking precedence over `font`.
    pub font_path: Option<PathBuf>,
    pub background: [u8; 3],
    pub outline: [u8; 3],
    pub fill: [u8; 3],
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            text: "12".to_string(),
            size: 27.0,
            autosize: true,
            margin: 2,
            x: 0,
            y: 0,
            thickness: 1,
            font: None,
            font_path: None,
            background: [0, 0, 255],
            outline: [0, 0, 0],
            fill: [255, 255, 255],
        }
    }
}

/// Pixel bounding box of a laid-out line, in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBounds {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl TextBounds {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// True when a box of the given span fits inside the target with `margin`
/// pixels clear on every side.
pub fn fits_within(width: f32, height: f32, cols: u32, rows: u32, margin: u32) -> bool {
    let avail_w = cols as f32 - 2.0 * margin as f32;
    let avail_h = rows as f32 - 2.0 * margin as f32;
    width <= avail_w && height <= avail_h
}

/// Origin shift that centers a measured extent on an axis of length `span`.
pub fn centered_origin(extent_min: f32, extent_max: f32, span: u32) -> i32 {
    let extent = extent_max - extent_min;
    ((span as f32 - extent) / 2.0 - extent_min).round() as i32
}

#[derive(Clone)]
pub struct TextGenerator {
    style: TextStyle,
    font: FontArc,
    cols: u32,
    rows: u32,
}

impl TextGenerator {
    pub fn new(style: TextStyle, cols: u32, rows: u32) -> Result<Self, Error> {
        let font = load_font(&style)?;
        Ok(Self {
            style,
            font,
            cols,
            rows,
        })
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    /// Canvas size frames are rasterized at.
    pub fn target(&self) -> (u32, u32) {
        (self.cols, self.rows)
    }

    pub fn set_style(&mut self, style: TextStyle) -> Result<(), Error> {
        if style.font != self.style.font || style.font_path != self.style.font_path {
            self.font = load_font(&style)?;
        }
        self.style = style;
        Ok(())
    }

    /// A single frame held until the next reconfiguration.
    pub fn render(&self) -> FrameSequence {
        vec![Frame::held(self.rasterize())]
    }

    pub fn rasterize(&self) -> RgbImage {
        let mut image =
            RgbImage::from_pixel(self.cols, self.rows, Rgb(self.style.background));
        let (size, x, y) = self.placement();
        let Some(size) = size else {
            return image;
        };

        let thickness = self.style.thickness as i32;
        if thickness > 0 {
            let outline = Rgb(self.style.outline);
            for dy in 0..=thickness {
                for dx in 0..=thickness {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    for (sx, sy) in [(-dx, -dy), (dx, -dy), (-dx, dy), (dx, dy)] {
                        draw_text(&mut image, &self.font, size, outline, x + sx, y + sy, &self.style.text);
                    }
                }
            }
        }
        draw_text(
            &mut image,
            &self.font,
            size,
            Rgb(self.style.fill),
            x,
            y,
            &self.style.text,
        );
        image
    }

    /// Final size and origin after autosizing. `None` size means the text has
    /// no renderable outline (empty or all whitespace) and nothing is drawn.
    fn placement(&self) -> (Option<f32>, i32, i32) {
        let style = &self.style;
        if measure_line(&self.font, style.size.max(1.0), &style.text).is_none() {
            return (None, style.x, style.y);
        }
        if !style.autosize {
            return (Some(style.size.max(1.0)), style.x, style.y);
        }

        let pad = 2.0 * style.thickness as f32;
        let mut size = style.size.max(1.0);
        while size < MAX_AUTOSIZE {
            match measure_line(&self.font, size + 1.0, &style.text) {
                Some(b) if fits_within(b.width() + pad, b.height() + pad, self.cols, self.rows, style.margin) => {
                    size += 1.0;
                }
                _ => break,
            }
        }
        while size > 1.0 {
            match measure_line(&self.font, size, &style.text) {
                Some(b) if fits_within(b.width() + pad, b.height() + pad, self.cols, self.rows, style.margin) => break,
                _ => size -= 1.0,
            }
        }

        match measure_line(&self.font, size, &style.text) {
            Some(b) => {
                let x = centered_origin(b.left, b.right, self.cols);
                let y = centered_origin(b.top, b.bottom, self.rows);
                debug!(size, x, y, "autosized text placement");
                (Some(size), x, y)
            }
            None => (None, style.x, style.y),
        }
    }
}

/// Resolves a font for the style: an explicit file if given, otherwise a
/// family query against the system database with a bold sans-serif fallback.
pub fn load_font(style: &TextStyle) -> Result<FontArc, Error> {
    if let Some(path) = &style.font_path {
        let bytes = std::fs::read(path)?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|_| Error::FontNotFound(path.display().to_string()))?;
        return Ok(FontArc::new(font));
    }

    let mut db = Database::new();
    db.load_system_fonts();
    let mut families = Vec::new();
    if let Some(name) = &style.font {
        families.push(Family::Name(name.as_str()));
    }
    families.push(Family::SansSerif);
    let query = Query {
        families: &families,
        weight: Weight::BOLD,
        ..Query::default()
    };
    let requested = style.font.clone().unwrap_or_else(|| "sans-serif".to_string());
    let id = db
        .query(&query)
        .ok_or_else(|| Error::FontNotFound(requested.clone()))?;
    db.with_face_data(id, |data, index| {
        FontVec::try_from_vec_and_index(data.to_vec(), index)
            .ok()
            .map(FontArc::new)
    })
    .flatten()
    .ok_or(Error::FontNotFound(requested))
}

/// Union of the glyph pixel bounds for one line drawn at origin `(0, 0)` with
/// the baseline at the font's ascent. Returns `None` when nothing would be
/// inked.
pub fn measure_line(font: &FontArc, size: f32, text: &str) -> Option<TextBounds> {
    let scaled = font.as_scaled(PxScale::from(size));
    let baseline = scaled.ascent();
    let mut pen_x = 0.0f32;
    let mut prev = None;
    let mut bounds: Option<TextBounds> = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            pen_x += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(PxScale::from(size), point(pen_x, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let px = outlined.px_bounds();
            bounds = Some(match bounds {
                None => TextBounds {
                    left: px.min.x,
                    top: px.min.y,
                    right: px.max.x,
                    bottom: px.max.y,
                },
                Some(b) => TextBounds {
                    left: b.left.min(px.min.x),
                    top: b.top.min(px.min.y),
                    right: b.right.max(px.max.x),
                    bottom: b.bottom.max(px.max.y),
                },
            });
        }
        pen_x += scaled.h_advance(id);
        prev = Some(id);
    }
    bounds
}

/// Draws one line with the baseline at `origin_y + ascent`, clipping to the
/// image. Coverage at or above one half inks the pixel.
pub fn draw_text(
    image: &mut RgbImage,
    font: &FontArc,
    size: f32,
    color: Rgb<u8>,
    origin_x: i32,
    origin_y: i32,
    text: &str,
) {
    let scaled = font.as_scaled(PxScale::from(size));
    let baseline = origin_y as f32 + scaled.ascent();
    let (cols, rows) = image.dimensions();
    let mut pen_x = origin_x as f32;
    let mut prev = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            pen_x += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(PxScale::from(size), point(pen_x, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let px = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                if coverage < 0.5 {
                    return;
                }
                let x = px.min.x as i32 + gx as i32;
                let y = px.min.y as i32 + gy as i32;
                if x >= 0 && y >= 0 && (x as u32) < cols && (y as u32) < rows {
                    image.put_pixel(x as u32, y as u32, color);
                }
            });
        }
        pen_x += scaled.h_advance(id);
        prev = Some(id);
    }
}
