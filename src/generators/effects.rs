//! Procedural frame generators that animate a single base image: waving,
//! glitch, and rainbow. All of them emit the sequence in source resolution;
//! the transform pipeline runs afterwards.

use std::f32::consts::TAU;

use image::{Rgb, RgbImage, imageops};
use rand::Rng;
use serde::Deserialize;

use crate::frame::{BLACK, Frame, FrameSequence};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct EffectOptions {
    /// Frames generated per animation period.
    pub fps: usize,
    /// Length of one full animation period in milliseconds.
    pub period_ms: u64,
    /// Wave amplitude in pixels of vertical displacement.
    pub amplitude: f32,
    /// Percent chance that any given glitch frame is an actual glitch.
    pub glitchiness: u8,
    /// Background color replaced by the rainbow wheel.
    pub background: [u8; 3],
}

impl Default for EffectOptions {
    fn default() -> Self {
        Self {
            fps: 16,
            period_ms: 1000,
            amplitude: 1.0,
            glitchiness: 5,
            background: [0, 0, 255],
        }
    }
}

/// One full wave period: `fps` copies of the base image, each column shifted
/// vertically along a sine whose phase advances `2π / fps` per frame, then a
/// smoothing pass over runs of identical frames.
pub fn waving_frames(base: &RgbImage, opts: &EffectOptions) -> FrameSequence {
    let fps = opts.fps.max(1);
    let cols = base.width();
    if cols == 0 || base.height() == 0 {
        return Vec::new();
    }
    let ms_per_frame = opts.period_ms / fps as u64;
    let phase_step = TAU / fps as f32;
    let radians_per_pixel = TAU / cols as f32;

    let mut frames: Vec<RgbImage> = (0..fps).map(|_| base.clone()).collect();
    let mut phase = 0.0_f32;
    for frame in &mut frames {
        for c in 0..cols {
            let radians = radians_per_pixel * c as f32 + phase;
            let delta = ((radians.sin() * opts.amplitude) / radians_per_pixel).round() as i32;
            shift_column(frame, c, delta);
        }
        phase -= phase_step;
    }
    smooth_runs(&mut frames);

    frames
        .into_iter()
        .map(|image| Frame::new(image, ms_per_frame))
        .collect()
}

/// Shifts one column vertically by `delta` pixels (positive is up), filling
/// the vacated rows with black.
fn shift_column(image: &mut RgbImage, column: u32, delta: i32) {
    let rows = image.height() as i32;
    if delta == 0 {
        return;
    }
    if delta.abs() >= rows {
        for n in 0..rows as u32 {
            image.put_pixel(column, n, BLACK);
        }
        return;
    }
    if delta > 0 {
        for n in 0..(rows - delta) as u32 {
            let src = *image.get_pixel(column, n + delta as u32);
            image.put_pixel(column, n, src);
        }
        for n in (rows - delta) as u32..rows as u32 {
            image.put_pixel(column, n, BLACK);
        }
    } else {
        let delta = (-delta) as u32;
        for n in (delta..rows as u32).rev() {
            let src = *image.get_pixel(column, n - delta);
            image.put_pixel(column, n, src);
        }
        for n in 0..delta {
            image.put_pixel(column, n, BLACK);
        }
    }
}

/// Finds runs of frames bit-identical to the run's first frame and linearly
/// blends the interior frames between the run's bounds. The bounding frames
/// are never altered.
fn smooth_runs(frames: &mut [RgbImage]) {
    let mut group: Vec<usize> = Vec::new();
    for n in 0..frames.len() {
        group.push(n);
        if frames[group[0]].as_raw() != frames[n].as_raw() {
            blend_run(frames, &group);
            group = vec![n];
        }
    }
}

fn blend_run(frames: &mut [RgbImage], group: &[usize]) {
    if group.len() <= 2 {
        return;
    }
    let count = group.len() - 1;
    let first = frames[group[0]].clone();
    let last = frames[group[count]].clone();
    for (idx, &frame_no) in group.iter().enumerate().take(count).skip(1) {
        let left = (count - idx) as f32 / count as f32;
        let right = idx as f32 / count as f32;
        let blended = &mut frames[frame_no];
        for (dst, (a, b)) in blended
            .pixels_mut()
            .zip(first.pixels().zip(last.pixels()))
        {
            for ch in 0..3 {
                dst.0[ch] =
                    (a.0[ch] as f32 * left + b.0[ch] as f32 * right) as u8;
            }
        }
    }
}

/// Random flicker/shift corruption of the base image. Each frame of a random
/// count in `[fps, 4*fps]` independently has a `glitchiness`% chance of being
/// a brief blank or a randomly offset copy; otherwise the base image holds
/// for 500 ms.
pub fn glitch_frames(base: &RgbImage, opts: &EffectOptions) -> FrameSequence {
    let mut rng = rand::rng();
    let fps = opts.fps.max(1);
    let count = rng.random_range(fps..=4 * fps);
    let (w, h) = base.dimensions();
    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        if rng.random_range(1..=100) <= opts.glitchiness as u32 {
            let duration: u64 = rng.random_range(10..=50);
            if rng.random_bool(0.5) {
                frames.push(Frame::new(RgbImage::from_pixel(w, h, BLACK), duration));
            } else {
                let mut canvas = RgbImage::from_pixel(w, h, BLACK);
                let dx = if w > 1 { rng.random_range(1..w) } else { 0 };
                let dy = if h > 1 { rng.random_range(1..h) } else { 0 };
                imageops::replace(&mut canvas, base, i64::from(dx), i64::from(dy));
                frames.push(Frame::new(canvas, duration));
            }
        } else {
            frames.push(Frame::new(base.clone(), 500));
        }
    }
    frames
}

/// Replaces every background-colored pixel with a hue from the color wheel,
/// the phase advancing per-pixel across the raster and per-frame across time.
/// Non-background pixels pass through untouched.
pub fn rainbow_frames(base: &RgbImage, opts: &EffectOptions) -> FrameSequence {
    let fps = opts.fps.max(1);
    let (w, h) = base.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let background = Rgb(opts.background);
    let color_delta = WHEEL_MAX / (w * h) as f32;
    let mut frames = Vec::with_capacity(fps);
    for idx in 0..fps {
        let mut value = WHEEL_MAX * idx as f32 / fps as f32;
        let mut frame = base.clone();
        for px in frame.pixels_mut() {
            if *px == background {
                *px = color_wheel(value);
            }
            value += color_delta;
            if value > WHEEL_MAX {
                value -= WHEEL_MAX;
            }
        }
        frames.push(Frame::new(frame, 50));
    }
    frames
}

pub const WHEEL_MAX: f32 = 1024.0;
const WHEEL_SEGMENTS: f32 = 6.0;

/// Six-segment color wheel over `[0, 1024)`: red → yellow → green → cyan →
/// blue → magenta → red.
pub fn color_wheel(value: f32) -> Rgb<u8> {
    const BRIGHT: f32 = 255.0;
    let bucket = WHEEL_MAX / WHEEL_SEGMENTS;
    let value = value.clamp(0.0, WHEEL_MAX);
    let segment = (value / bucket).min(WHEEL_SEGMENTS - 1.0).floor();
    let offset = value - segment * bucket;
    let rising = offset * BRIGHT / bucket;
    let falling = (bucket - offset) * BRIGHT / bucket;
    let (r, g, b) = match segment as u32 {
        0 => (BRIGHT, rising, 0.0),
        1 => (falling, BRIGHT, 0.0),
        2 => (0.0, BRIGHT, rising),
        3 => (0.0, falling, BRIGHT),
        4 => (rising, 0.0, BRIGHT),
        _ => (BRIGHT, 0.0, falling),
    };
    Rgb([r as u8, g as u8, b as u8])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_image() -> RgbImage {
        let mut img = RgbImage::from_pixel(16, 16, Rgb([0, 0, 255]));
        for x in 4..12 {
            img.put_pixel(x, 8, Rgb([255, 255, 255]));
        }
        img
    }

    #[test]
    fn waving_emits_fps_frames_summing_to_period() {
        let opts = EffectOptions {
            fps: 16,
            period_ms: 1000,
            amplitude: 2.0,
            ..EffectOptions::default()
        };
        let frames = waving_frames(&base_image(), &opts);
        assert_eq!(frames.len(), 16);
        let total: u64 = frames.iter().map(|f| f.duration_ms).sum();
        // Integer division bounds the rounding error to under one frame.
        assert!(total <= 1000 && total > 1000 - 16);
        assert!(frames.iter().all(|f| !f.holds_forever()));
    }

    #[test]
    fn smoothing_leaves_run_bounds_untouched() {
        let a = RgbImage::from_pixel(4, 4, Rgb([10, 10, 10]));
        let b = RgbImage::from_pixel(4, 4, Rgb([250, 250, 250]));
        let mut frames = vec![a.clone(), a.clone(), a.clone(), b.clone()];
        smooth_runs(&mut frames);
        assert_eq!(frames[0], a);
        assert_eq!(frames[3], b);
        // Interior frames blend toward the closing frame.
        assert_ne!(frames[1], a);
        assert_ne!(frames[2], a);
        let p1 = frames[1].get_pixel(0, 0).0[0];
        let p2 = frames[2].get_pixel(0, 0).0[0];
        assert!(p1 < p2, "blend weights must advance across the run");
    }

    #[test]
    fn short_runs_are_not_blended() {
        let a = RgbImage::from_pixel(4, 4, Rgb([10, 10, 10]));
        let b = RgbImage::from_pixel(4, 4, Rgb([250, 250, 250]));
        let mut frames = vec![a.clone(), b.clone()];
        smooth_runs(&mut frames);
        assert_eq!(frames[0], a);
        assert_eq!(frames[1], b);
    }

    #[test]
    fn shift_column_wraps_vacated_rows_to_black() {
        let mut img = RgbImage::from_pixel(1, 4, Rgb([7, 7, 7]));
        shift_column(&mut img, 0, 2);
        assert_eq!(*img.get_pixel(0, 0), Rgb([7, 7, 7]));
        assert_eq!(*img.get_pixel(0, 2), BLACK);
        assert_eq!(*img.get_pixel(0, 3), BLACK);

        let mut img = RgbImage::from_pixel(1, 4, Rgb([7, 7, 7]));
        shift_column(&mut img, 0, -3);
        assert_eq!(*img.get_pixel(0, 0), BLACK);
        assert_eq!(*img.get_pixel(0, 2), BLACK);
        assert_eq!(*img.get_pixel(0, 3), Rgb([7, 7, 7]));
    }

    #[test]
    fn glitch_count_and_durations_stay_in_range() {
        let opts = EffectOptions {
            fps: 8,
            glitchiness: 100,
            ..EffectOptions::default()
        };
        let frames = glitch_frames(&base_image(), &opts);
        assert!(frames.len() >= 8 && frames.len() <= 32);
        assert!(
            frames
                .iter()
                .all(|f| (10..=50).contains(&f.duration_ms))
        );
    }

    #[test]
    fn rainbow_replaces_only_background_pixels() {
        let opts = EffectOptions {
            fps: 4,
            background: [0, 0, 255],
            ..EffectOptions::default()
        };
        let frames = rainbow_frames(&base_image(), &opts);
        assert_eq!(frames.len(), 4);
        for frame in &frames {
            assert_eq!(frame.duration_ms, 50);
            // The white stripe passes through untouched.
            assert_eq!(*frame.image.get_pixel(4, 8), Rgb([255, 255, 255]));
            // Background pixels are never left at the background color.
            assert_ne!(*frame.image.get_pixel(0, 0), Rgb([0, 0, 255]));
        }
    }

    #[test]
    fn color_wheel_hits_the_primaries() {
        assert_eq!(color_wheel(0.0), Rgb([255, 0, 0]));
        let bucket = WHEEL_MAX / 6.0;
        assert_eq!(color_wheel(bucket), Rgb([255, 255, 0]));
        let green = color_wheel(bucket * 2.0);
        assert_eq!(green.0[1], 255);
        assert!(green.0[0] <= 2 && green.0[2] == 0);
        let blue = color_wheel(bucket * 4.0);
        assert_eq!(blue.0[2], 255);
        assert!(blue.0[1] <= 2 && blue.0[0] == 0);
    }
}
