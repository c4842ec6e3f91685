//! Fixed-order image transform pipeline.
//!
//! Every source frame passes through the same stages in the same order:
//! zoom crop, square fit, aspect-preserving scale with black fill, brightness
//! (mask-aware), transpose, arbitrary rotation, underscan padding. A stage is
//! skipped entirely when its setting is at the neutral default, but the order
//! never changes. Output is always exactly `cols x rows`.

use anyhow::{Context, Result};
use fast_image_resize as fir;
use image::{Rgb, RgbImage, imageops};
use serde::Deserialize;
use tracing::warn;

use crate::frame::{BLACK, BrightnessMask};

/// Named flip/rotate operation applied before the arbitrary-degree rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transpose {
    #[default]
    None,
    FlipHorizontal,
    FlipVertical,
    #[serde(alias = "rotate-90")]
    Rotate90,
    #[serde(alias = "rotate-180")]
    Rotate180,
    #[serde(alias = "rotate-270")]
    Rotate270,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ZoomOptions {
    pub level: f32,
    /// Center the zoom window; when false, anchor it at `(x, y)`.
    #[serde(default = "ZoomOptions::default_center")]
    pub center: bool,
    #[serde(default)]
    pub x: u32,
    #[serde(default)]
    pub y: u32,
}

impl ZoomOptions {
    const fn default_center() -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformOptions {
    /// Physical panel size, including underscan.
    pub cols: u32,
    pub rows: u32,
    pub zoom: Option<ZoomOptions>,
    pub fit: bool,
    pub brightness: u8,
    pub transpose: Transpose,
    pub rotate_degrees: f32,
    pub underscan: u32,
}

/// A transformed frame plus its full-brightness twin, kept for screenshots
/// which bypass dimming and the reserved-pixel mask.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub image: RgbImage,
    pub bright: RgbImage,
}

impl TransformOptions {
    /// Neutral pipeline for a given panel size.
    pub fn for_target(cols: u32, rows: u32) -> Self {
        Self {
            cols,
            rows,
            zoom: None,
            fit: false,
            brightness: 255,
            transpose: Transpose::None,
            rotate_degrees: 0.0,
            underscan: 0,
        }
    }

    /// Panel area left after underscan is reserved on every edge.
    pub fn active_cols(&self) -> u32 {
        self.cols.saturating_sub(self.underscan * 2)
    }

    pub fn active_rows(&self) -> u32 {
        self.rows.saturating_sub(self.underscan * 2)
    }

    /// Runs the full pipeline over one source image.
    pub fn apply(&self, image: &RgbImage, mask: Option<&BrightnessMask>) -> Result<Transformed> {
        let mut working = image.clone();
        if let Some(zoom) = &self.zoom {
            if zoom.level > 1.0 {
                working = zoom_crop(&working, zoom);
            }
        }
        if self.fit {
            working = fit_square(&working);
        }
        let scaled = scale_to(&working, self.active_cols(), self.active_rows(), self.fit)?;

        let bright = self.tail(&scaled);
        let image = if self.brightness == 255 {
            bright.clone()
        } else {
            self.tail(&brighten(&scaled, self.brightness, mask))
        };
        Ok(Transformed { image, bright })
    }

    /// Post-brightness stages, shared between the dimmed frame and its
    /// full-brightness twin.
    fn tail(&self, image: &RgbImage) -> RgbImage {
        let mut working = match self.transpose {
            Transpose::None => image.clone(),
            Transpose::FlipHorizontal => imageops::flip_horizontal(image),
            Transpose::FlipVertical => imageops::flip_vertical(image),
            Transpose::Rotate90 => imageops::rotate90(image),
            Transpose::Rotate180 => imageops::rotate180(image),
            Transpose::Rotate270 => imageops::rotate270(image),
        };
        if self.rotate_degrees != 0.0 {
            working = rotate_about_center(&working, self.rotate_degrees);
        }
        if self.underscan > 0 {
            working = pad_underscan(&working, self.cols, self.rows, self.underscan);
        }
        working
    }
}

/// Crops a window of `size / level`, centered or anchored at `(x, y)`.
fn zoom_crop(image: &RgbImage, zoom: &ZoomOptions) -> RgbImage {
    let (w, h) = image.dimensions();
    let crop_w = ((w as f32 / zoom.level).round() as u32).clamp(1, w);
    let crop_h = ((h as f32 / zoom.level).round() as u32).clamp(1, h);
    let (left, top) = if zoom.center {
        ((w - crop_w) / 2, (h - crop_h) / 2)
    } else {
        (zoom.x.min(w - crop_w), zoom.y.min(h - crop_h))
    };
    imageops::crop_imm(image, left, top, crop_w, crop_h).to_image()
}

/// Center-crops to a square, preserving the smaller dimension in full.
fn fit_square(image: &RgbImage) -> RgbImage {
    let (w, h) = image.dimensions();
    if w == h {
        return image.clone();
    }
    let side = w.min(h);
    let left = (w - side) / 2;
    let top = (h - side) / 2;
    imageops::crop_imm(image, left, top, side, side).to_image()
}

/// Scales so the longer dimension exactly fits the target (or stretches a
/// fitted square straight to the target), centering any shortfall over black.
fn scale_to(image: &RgbImage, cols: u32, rows: u32, stretch: bool) -> Result<RgbImage> {
    let (w, h) = image.dimensions();
    let (new_w, new_h) = if stretch || w == h {
        (cols, rows)
    } else if w > h {
        (cols, ((rows as f32 * h as f32 / w as f32) as u32).max(1))
    } else {
        (((cols as f32 * w as f32 / h as f32) as u32).max(1), rows)
    };
    let resized = resize_rgb(image, new_w, new_h)?;
    if new_w < cols || new_h < rows {
        Ok(fill_out(&resized, cols, rows))
    } else {
        Ok(resized)
    }
}

/// Centers an undersized image into a black canvas of the target size.
fn fill_out(image: &RgbImage, cols: u32, rows: u32) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(cols, rows, BLACK);
    let x = (cols.saturating_sub(image.width())) / 2;
    let y = (rows.saturating_sub(image.height())) / 2;
    imageops::replace(&mut canvas, image, i64::from(x), i64::from(y));
    canvas
}

fn resize_rgb(source: &RgbImage, target_w: u32, target_h: u32) -> Result<RgbImage> {
    if source.dimensions() == (target_w, target_h) {
        return Ok(source.clone());
    }
    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x3,
    )
    .context("failed to create source view for frame resize")?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x3);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .context("frame resize failed")?;
    RgbImage::from_raw(target_w, target_h, dst_image.into_vec())
        .context("failed to construct resized RGB image")
}

/// Multiplies each channel by `brightness / 255`, letting mask entries pin
/// individual pixels at their own level. A mask that does not match the
/// raster falls back to global brightness; it is never applied partially.
pub fn brighten(image: &RgbImage, brightness: u8, mask: Option<&BrightnessMask>) -> RgbImage {
    let pixels = (image.width() * image.height()) as usize;
    let mask = match mask {
        Some(m) if m.len() == pixels => Some(m),
        Some(m) => {
            warn!(
                mask_len = m.len(),
                pixels, "brightness mask does not match frame; using global brightness"
            );
            None
        }
        None => None,
    };
    let mut out = image.clone();
    for (idx, px) in out.pixels_mut().enumerate() {
        let level = mask
            .map(|m| m.level(idx, brightness))
            .unwrap_or(brightness) as u16;
        *px = Rgb([
            (u16::from(px.0[0]) * level / 255) as u8,
            (u16::from(px.0[1]) * level / 255) as u8,
            (u16::from(px.0[2]) * level / 255) as u8,
        ]);
    }
    out
}

/// Nearest-neighbor rotation about the canvas center, vacated area black.
fn rotate_about_center(image: &RgbImage, degrees: f32) -> RgbImage {
    let (w, h) = image.dimensions();
    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let cx = (w as f32 - 1.0) / 2.0;
    let cy = (h as f32 - 1.0) / 2.0;
    let mut out = RgbImage::from_pixel(w, h, BLACK);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let sx = (cos * dx + sin * dy + cx).round();
        let sy = (-sin * dx + cos * dy + cy).round();
        if sx >= 0.0 && sx < w as f32 && sy >= 0.0 && sy < h as f32 {
            *px = *image.get_pixel(sx as u32, sy as u32);
        }
    }
    out
}

/// Pastes the active-area image into a full-size black canvas, inset by the
/// underscan on every edge.
fn pad_underscan(image: &RgbImage, cols: u32, rows: u32, underscan: u32) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(cols, rows, BLACK);
    imageops::replace(&mut canvas, image, i64::from(underscan), i64::from(underscan));
    canvas
}
