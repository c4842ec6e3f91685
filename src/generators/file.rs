//! Decodes caller-supplied image bytes into frame sequences. The core does
//! no I/O of its own; fetching bytes from disk or the network is the content
//! source's job.

use std::io::Cursor;

use anyhow::{Context, Result};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat, ImageReader};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::frame::{Frame, FrameSequence};

/// What to do with a native frame duration of zero.
///
/// The two policies disagree on purpose: `Override` treats zero as a missing
/// value and substitutes 100 ms; `Halt` takes the zero literally: the frame
/// shows forever, so decoding stops there and later frames are unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZeroDurationPolicy {
    #[default]
    Override,
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct AnimationOptions {
    /// Playback speed multiplier; every duration is scaled by `1 / speed`.
    pub speed: f32,
    /// Extra hold added to the final frame of each loop.
    pub loop_delay_ms: u64,
    pub zero_duration: ZeroDurationPolicy,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            loop_delay_ms: 0,
            zero_duration: ZeroDurationPolicy::Override,
        }
    }
}

/// Still-image producer. Assets that turn out to carry multiple embedded
/// frames are delegated to the animated decoder.
#[derive(Debug, Clone)]
pub struct FileGenerator {
    bytes: Vec<u8>,
    options: AnimationOptions,
}

impl FileGenerator {
    pub fn new(bytes: Vec<u8>, options: AnimationOptions) -> Self {
        Self { bytes, options }
    }

    /// Unreadable or malformed bytes yield an empty sequence; the playback
    /// side keeps showing the last good frame.
    pub fn render(&self) -> FrameSequence {
        match decode_frames(&self.bytes, &self.options) {
            Ok(frames) => frames,
            Err(err) => {
                warn!("unable to decode image bytes: {err:#}");
                Vec::new()
            }
        }
    }
}

/// Animated-asset producer; always takes the per-frame duration path.
#[derive(Debug, Clone)]
pub struct AnimatedFileGenerator {
    bytes: Vec<u8>,
    options: AnimationOptions,
}

impl AnimatedFileGenerator {
    pub fn new(bytes: Vec<u8>, options: AnimationOptions) -> Self {
        Self { bytes, options }
    }

    pub fn render(&self) -> FrameSequence {
        match decode_animation(&self.bytes, &self.options) {
            Ok(frames) => frames,
            Err(err) => {
                warn!("unable to decode animated asset: {err:#}");
                Vec::new()
            }
        }
    }
}

pub fn decode_frames(bytes: &[u8], options: &AnimationOptions) -> Result<FrameSequence> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("sniffing image format")?;
    if reader.format() == Some(ImageFormat::Gif) {
        return decode_animation(bytes, options);
    }
    let image = reader.decode().context("decoding still image")?.to_rgb8();
    Ok(vec![Frame::held(image)])
}

/// Decodes every embedded frame with its native duration, applying the
/// zero-duration policy, the loop delay (last frame only), and the speed
/// scaling, in that order, matching how the durations compose:
/// `[0, 50, 0]` at speed 1 with the override policy becomes
/// `[100, 50, 100 + loop_delay]`.
pub fn decode_animation(bytes: &[u8], options: &AnimationOptions) -> Result<FrameSequence> {
    let decoder = GifDecoder::new(Cursor::new(bytes)).context("opening animated asset")?;
    let native = decoder
        .into_frames()
        .collect_frames()
        .context("decoding animation frames")?;
    if native.is_empty() {
        return Ok(Vec::new());
    }
    if native.len() == 1 {
        let image = DynamicImage::ImageRgba8(
            native
                .into_iter()
                .next()
                .map(|f| f.into_buffer())
                .context("single-frame asset had no buffer")?,
        )
        .to_rgb8();
        return Ok(vec![Frame::held(image)]);
    }

    let speed = if options.speed > 0.0 { options.speed } else { 1.0 };
    let last = native.len() - 1;
    let mut out = Vec::with_capacity(native.len());
    for (n, native_frame) in native.into_iter().enumerate() {
        let (numer, denom) = native_frame.delay().numer_denom_ms();
        let mut duration = u64::from(numer / denom.max(1));
        if duration == 0 && options.zero_duration == ZeroDurationPolicy::Override {
            duration = 100;
        }
        if n == last {
            duration += (options.loop_delay_ms as f32 * speed) as u64;
        }
        let duration = (duration as f32 / speed) as u64;
        let image = DynamicImage::ImageRgba8(native_frame.into_buffer()).to_rgb8();
        out.push(Frame::new(image, duration));
        if duration == 0 {
            debug!(frame = n, "zero-duration frame halts decoding");
            break;
        }
    }
    Ok(out)
}
