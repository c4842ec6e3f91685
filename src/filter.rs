//! Seasonal recolor filters applied to a rendered sequence before the
//! transform pipeline.

use image::Rgb;
use serde::Deserialize;

use crate::frame::FrameSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Filter {
    #[default]
    None,
    Halloween,
    Christmas,
}

/// Recolors every frame of the sequence in place.
pub fn apply(filter: Filter, frames: &mut FrameSequence) {
    match filter {
        Filter::None => {}
        Filter::Halloween => {
            for frame in frames {
                for px in frame.image.pixels_mut() {
                    *px = halloween(*px);
                }
            }
        }
        Filter::Christmas => {
            for frame in frames {
                for px in frame.image.pixels_mut() {
                    *px = christmas(*px);
                }
            }
        }
    }
}

/// Maps each pixel's overall brightness onto a single orange hue.
fn halloween(px: Rgb<u8>) -> Rgb<u8> {
    const SPOOKY: [u8; 3] = [255, 127, 0];
    let brightness =
        (px.0[0] as u32 + px.0[1] as u32 + px.0[2] as u32) as f32 / (255.0 * 3.0);
    Rgb([
        (SPOOKY[0] as f32 * brightness) as u8,
        (SPOOKY[1] as f32 * brightness) as u8,
        (SPOOKY[2] as f32 * brightness) as u8,
    ])
}

/// Pushes pixels toward red or green, whichever already dominates, and
/// quarters the loser and the blue channel.
fn christmas(px: Rgb<u8>) -> Rgb<u8> {
    let mut r = px.0[0].saturating_mul(2);
    let mut g = px.0[1].saturating_mul(2);
    let b = px.0[2] / 4;
    if r > g {
        g /= 4;
    } else {
        r /= 4;
    }
    Rgb([r, g, b])
}
