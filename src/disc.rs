//! Maps a disc display built from concentric rings of addressable elements
//! into rectilinear image space, and resamples images into one color per
//! physical element.
//!
//! Elements are enumerated ring by ring, then by position within the ring.
//! That order is the wire contract: the reshaper hands the resulting flat
//! color list straight to the driver.

use std::f32::consts::TAU;

use image::{Rgb, RgbImage};
use serde::Deserialize;

use crate::error::Error;
use crate::frame::BLACK;

/// Element count of the stock disc hardware.
pub const DEFAULT_ELEMENT_TOTAL: usize = 255;

/// Radius (in arbitrary physical units) and element count per ring on the
/// stock disc: 1 + 6 + 12 + 20 + 24 + 28 + 32 + 40 + 44 + 48 = 255.
const STOCK_RINGS: [(f32, usize); 10] = [
    (0.0, 1),
    (0.5, 6),
    (1.0, 12),
    (1.5, 20),
    (2.0, 24),
    (2.5, 28),
    (3.0, 32),
    (3.5, 40),
    (4.0, 44),
    (4.5, 48),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring {
    pub radius: f32,
    pub count: usize,
}

/// Ordered ring description of a disc, fixed for the lifetime of a given
/// physical display.
#[derive(Debug, Clone)]
pub struct RingLayout {
    rings: Vec<Ring>,
    max_radius: f32,
    total: usize,
}

impl RingLayout {
    /// Builds a layout, failing fast when the per-ring element counts do not
    /// sum to the configured total.
    pub fn new(rings: Vec<(f32, usize)>, expected_total: usize) -> Result<Self, Error> {
        let got: usize = rings.iter().map(|(_, n)| n).sum();
        if got != expected_total {
            return Err(Error::RingSum {
                got,
                expected: expected_total,
            });
        }
        let rings: Vec<Ring> = rings
            .into_iter()
            .map(|(radius, count)| Ring { radius, count })
            .collect();
        let max_radius = rings.iter().map(|r| r.radius).fold(0.0_f32, f32::max);
        Ok(Self {
            rings,
            max_radius,
            total: got,
        })
    }

    /// The stock 255-element disc.
    pub fn stock() -> Self {
        let rings: Vec<Ring> = STOCK_RINGS
            .iter()
            .map(|&(radius, count)| Ring { radius, count })
            .collect();
        Self {
            rings,
            max_radius: 4.5,
            total: DEFAULT_ELEMENT_TOTAL,
        }
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn element_count(&self) -> usize {
        self.total
    }

    pub fn max_radius(&self) -> f32 {
        self.max_radius
    }

    /// Cartesian sample coordinate of every element, ring-major, rounded and
    /// clamped into the image.
    fn positions(&self, cols: u32, rows: u32) -> Vec<(u32, u32)> {
        let span = 2.0 * self.max_radius;
        let mut out = Vec::with_capacity(self.total);
        for ring in &self.rings {
            for position in 0..ring.count {
                let theta = TAU * position as f32 / ring.count as f32;
                let (x, y) = if span > 0.0 {
                    let x = (theta.cos() * ring.radius + self.max_radius) / span;
                    let y = (theta.sin() * ring.radius + self.max_radius) / span;
                    (x * cols as f32, y * rows as f32)
                } else {
                    // Degenerate single-point layout; sample the center.
                    (cols as f32 / 2.0, rows as f32 / 2.0)
                };
                let x = (x.round().max(0.0) as u32).min(cols.saturating_sub(1));
                let y = (y.round().max(0.0) as u32).min(rows.saturating_sub(1));
                out.push((x, y));
            }
        }
        out
    }

    /// Resamples `image` into one averaged color per element, in ring/position
    /// enumeration order.
    pub fn sample_image(&self, image: &RgbImage, sampling: &Sampling) -> Vec<Rgb<u8>> {
        let offsets = sampling.offsets();
        self.positions(image.width(), image.height())
            .into_iter()
            .map(|pos| sample_at(image, pos, &offsets))
            .collect()
    }
}

/// Shape of the averaging neighborhood around each sample coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleShape {
    #[default]
    Circle,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Sampling {
    #[serde(default)]
    pub shape: SampleShape,
    #[serde(default = "Sampling::default_radius")]
    pub radius: u32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            shape: SampleShape::Circle,
            radius: Self::default_radius(),
        }
    }
}

impl Sampling {
    const fn default_radius() -> u32 {
        1
    }

    fn offsets(&self) -> Vec<(i32, i32)> {
        let r = self.radius as i32;
        let mut offsets = Vec::new();
        for dx in -r..=r {
            for dy in -r..=r {
                let keep = match self.shape {
                    SampleShape::Circle => ((dx * dx + dy * dy) as f32).sqrt() <= r as f32,
                    SampleShape::Square => true,
                };
                if keep {
                    offsets.push((dx, dy));
                }
            }
        }
        offsets
    }
}

/// Averages all in-bounds neighborhood pixels; zero valid neighbors yields
/// black.
fn sample_at(image: &RgbImage, (x, y): (u32, u32), offsets: &[(i32, i32)]) -> Rgb<u8> {
    let (cols, rows) = (image.width() as i64, image.height() as i64);
    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for &(dx, dy) in offsets {
        let sx = x as i64 + dx as i64;
        let sy = y as i64 + dy as i64;
        if sx >= 0 && sx < cols && sy >= 0 && sy < rows {
            let px = image.get_pixel(sx as u32, sy as u32);
            for (sum, &c) in sums.iter_mut().zip(px.0.iter()) {
                *sum += u64::from(c);
            }
            count += 1;
        }
    }
    if count == 0 {
        return BLACK;
    }
    Rgb([
        (sums[0] / count) as u8,
        (sums[1] / count) as u8,
        (sums[2] / count) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_layout_sums_to_255() {
        let layout = RingLayout::stock();
        assert_eq!(layout.element_count(), 255);
        assert_eq!(layout.max_radius(), 4.5);
    }

    #[test]
    fn mismatched_ring_sum_fails_fast() {
        let err = RingLayout::new(vec![(0.0, 1), (1.0, 10)], 255).unwrap_err();
        assert!(matches!(
            err,
            Error::RingSum {
                got: 11,
                expected: 255
            }
        ));
    }

    #[test]
    fn sampling_yields_one_color_per_element() {
        let layout = RingLayout::stock();
        let image = RgbImage::from_pixel(64, 64, Rgb([10, 20, 30]));
        let colors = layout.sample_image(&image, &Sampling::default());
        assert_eq!(colors.len(), 255);
        // A uniform image averages to itself regardless of neighborhood.
        assert!(colors.iter().all(|c| *c == Rgb([10, 20, 30])));
    }

    #[test]
    fn sampling_order_is_stable() {
        let layout = RingLayout::stock();
        let mut image = RgbImage::new(64, 64);
        for (x, y, px) in image.enumerate_pixels_mut() {
            *px = Rgb([(x * 3) as u8, (y * 3) as u8, ((x + y) % 256) as u8]);
        }
        let first = layout.sample_image(&image, &Sampling::default());
        let second = layout.sample_image(&image, &Sampling::default());
        assert_eq!(first, second);
    }

    #[test]
    fn circle_offsets_exclude_corners() {
        let circle = Sampling {
            shape: SampleShape::Circle,
            radius: 2,
        };
        let square = Sampling {
            shape: SampleShape::Square,
            radius: 2,
        };
        assert_eq!(square.offsets().len(), 25);
        let circle_offsets = circle.offsets();
        assert!(circle_offsets.len() < 25);
        assert!(!circle_offsets.contains(&(2, 2)));
        assert!(circle_offsets.contains(&(0, 2)));
    }
}
