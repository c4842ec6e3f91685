//! Converts a logical frame into the memory layout the wiring topology
//! expects: re-striping for chained panels, polar resampling for a disc, or
//! a straight pass-through.

use image::{Rgb, RgbImage};

use crate::disc::{RingLayout, Sampling};

/// Finished output handed to the driver.
#[derive(Debug, Clone)]
pub enum OutputFrame {
    /// Panel-shaped image, already re-striped when the target is a chain.
    Panel(RgbImage),
    /// Flat per-element color list in ring/position order.
    Disc(Vec<Rgb<u8>>),
}

/// Physical wiring topology of the display.
#[derive(Debug, Clone)]
pub enum Topology {
    Plain,
    Chain { panels: u32 },
    Disc { layout: RingLayout, sampling: Sampling },
}

impl Topology {
    pub fn reshape(&self, image: &RgbImage) -> OutputFrame {
        match self {
            Topology::Plain => OutputFrame::Panel(image.clone()),
            Topology::Chain { panels } => OutputFrame::Panel(chain_decompose(image, *panels)),
            Topology::Disc { layout, sampling } => {
                OutputFrame::Disc(layout.sample_image(image, sampling))
            }
        }
    }
}

/// Re-stripes a tall logical image into the single wide row a panel chain
/// presents to the driver.
///
/// For `panels = N`, output row `r`, panel `p` holds source row
/// `r + p * panel_rows` at output columns `[p * cols, (p+1) * cols)`. Pure
/// reindexing, no resampling; source rows beyond the nearest multiple of
/// `panel_rows` are trimmed.
pub fn chain_decompose(image: &RgbImage, panels: u32) -> RgbImage {
    let panels = panels.max(1);
    let (cols, rows) = image.dimensions();
    let panel_rows = rows / panels;
    let mut out = RgbImage::new(cols * panels, panel_rows);
    for p in 0..panels {
        for r in 0..panel_rows {
            for c in 0..cols {
                out.put_pixel(p * cols + c, r, *image.get_pixel(c, r + p * panel_rows));
            }
        }
    }
    out
}
