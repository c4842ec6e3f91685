use image::{Rgb, RgbImage};

use crate::error::Error;

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// One rendered image paired with its display duration in milliseconds.
///
/// A duration of `0` means "hold indefinitely": the playback scheduler shows
/// the frame once and never auto-advances past it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub duration_ms: u64,
}

impl Frame {
    pub fn new(image: RgbImage, duration_ms: u64) -> Self {
        Self { image, duration_ms }
    }

    /// A terminal frame that is held until the next reconfiguration.
    pub fn held(image: RgbImage) -> Self {
        Self::new(image, 0)
    }

    pub fn blank(cols: u32, rows: u32) -> Self {
        Self::held(RgbImage::from_pixel(cols, rows, BLACK))
    }

    pub fn holds_forever(&self) -> bool {
        self.duration_ms == 0
    }
}

/// Ordered, finite list of frames produced by one content mode.
pub type FrameSequence = Vec<Frame>;

/// What actually travels through the playback queue: a frame already run
/// through the transform pipeline, plus a full-brightness twin kept around
/// for `screenshot()`.
#[derive(Debug, Clone)]
pub struct QueuedFrame {
    pub content: FrameContent,
    pub bright: Option<RgbImage>,
    pub duration_ms: u64,
}

/// Transformed logical image, or a raw per-element color list emitted by a
/// streaming pattern generator for disc targets.
#[derive(Debug, Clone)]
pub enum FrameContent {
    Image(RgbImage),
    Elements(Vec<Rgb<u8>>),
}

/// Optional per-pixel brightness override, aligned with the frame's raster
/// order. `-1` means "use the global brightness"; any other value pins the
/// pixel at that level, bypassing global dimming.
#[derive(Debug, Clone)]
pub struct BrightnessMask {
    values: Vec<i16>,
}

impl BrightnessMask {
    /// Fails fast when the mask length does not match the pixel count; a mask
    /// is never applied partially.
    pub fn new(values: Vec<i16>, pixel_count: usize) -> Result<Self, Error> {
        if values.len() != pixel_count {
            return Err(Error::MaskLength {
                got: values.len(),
                expected: pixel_count,
            });
        }
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Effective brightness for pixel `idx` given the global level.
    pub fn level(&self, idx: usize, global: u8) -> u8 {
        match self.values.get(idx) {
            Some(&v) if v >= 0 => v.min(255) as u8,
            _ => global,
        }
    }
}
