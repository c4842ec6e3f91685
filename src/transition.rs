//! Intermediate frames bridging the previously displayed frame and the first
//! frame of newly installed content. Transition frames are enqueued once,
//! ahead of the new sequence; they are not part of the loop.

use image::{RgbImage, imageops};
use serde::Deserialize;

use crate::frame::{Frame, FrameSequence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transition {
    #[default]
    None,
    Fade,
    /// New frame sweeps in from the right edge.
    #[serde(alias = "wipe")]
    WipeLeft,
    WipeRight,
    WipeUp,
    WipeDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct TransitionOptions {
    pub kind: Transition,
    /// Total length of the transition.
    pub duration_ms: u64,
    /// Step count; the transition emits `max-frames - 1` intermediate frames
    /// (both endpoints are already shown by normal playback).
    pub max_frames: usize,
}

impl Default for TransitionOptions {
    fn default() -> Self {
        Self {
            kind: Transition::None,
            duration_ms: 250,
            max_frames: 18,
        }
    }
}

/// Builds the intermediate frames from `prev` to `next`. Empty when the
/// transition is disabled or the images disagree on size.
pub fn frames(prev: &RgbImage, next: &RgbImage, opts: &TransitionOptions) -> FrameSequence {
    if opts.kind == Transition::None
        || opts.max_frames < 2
        || prev.dimensions() != next.dimensions()
    {
        return Vec::new();
    }
    let duration_ms = opts.duration_ms / opts.max_frames as u64;
    (1..opts.max_frames)
        .map(|n| {
            let image = match opts.kind {
                Transition::Fade => blend(prev, next, n as f32 / opts.max_frames as f32),
                kind => wipe(prev, next, kind, n, opts.max_frames),
            };
            Frame::new(image, duration_ms)
        })
        .collect()
}

/// Per-pixel linear blend, `pct` toward `next`.
fn blend(prev: &RgbImage, next: &RgbImage, pct: f32) -> RgbImage {
    let mut out = prev.clone();
    for (dst, src) in out.pixels_mut().zip(next.pixels()) {
        for ch in 0..3 {
            dst.0[ch] =
                (dst.0[ch] as f32 * (1.0 - pct) + src.0[ch] as f32 * pct) as u8;
        }
    }
    out
}

/// Copies a growing band of `next` over `prev`, anchored at the wipe's
/// leading edge.
fn wipe(prev: &RgbImage, next: &RgbImage, kind: Transition, step: usize, max: usize) -> RgbImage {
    let (w, h) = prev.dimensions();
    let nc = ((step as u64 * w as u64) / max as u64) as u32;
    let nr = ((step as u64 * h as u64) / max as u64) as u32;
    let mut out = prev.clone();
    let (x, y, band_w, band_h) = match kind {
        Transition::WipeLeft => (w - nc, 0, nc, h),
        Transition::WipeRight => (0, 0, nc, h),
        Transition::WipeDown => (0, 0, w, nr),
        Transition::WipeUp => (0, h - nr, w, nr),
        Transition::Fade | Transition::None => return out,
    };
    if band_w == 0 || band_h == 0 {
        return out;
    }
    let band = imageops::crop_imm(next, x, y, band_w, band_h).to_image();
    imageops::replace(&mut out, &band, i64::from(x), i64::from(y));
    out
}
