//! Content generators: each produces the frame sequence (or stream) for one
//! display mode. The playback side treats them uniformly through
//! [`Generator`].

pub mod effects;
pub mod file;
pub mod pattern;
pub mod text;

use image::{Rgb, RgbImage};

use crate::frame::FrameSequence;

pub use effects::{color_wheel, EffectOptions};
pub use file::{AnimatedFileGenerator, AnimationOptions, FileGenerator, ZeroDurationPolicy};
pub use pattern::PatternGenerator;
pub use text::{TextGenerator, TextStyle};

/// One configured content source.
///
/// Most variants render a finite sequence up front; `Pattern` is a stream
/// that hands out raw per-element frames one at a time.
pub enum Generator {
    Text(TextGenerator),
    File(FileGenerator),
    AnimatedFile(AnimatedFileGenerator),
    Waving { base: RgbImage, options: EffectOptions },
    Glitch { base: RgbImage, options: EffectOptions },
    Rainbow { base: RgbImage, options: EffectOptions },
    Pattern(PatternGenerator),
}

impl Generator {
    pub fn is_streaming(&self) -> bool {
        matches!(self, Generator::Pattern(_))
    }

    /// Renders the full sequence for a finite generator. Streaming generators
    /// return an empty sequence; their frames come from [`Generator::next_raw`].
    pub fn render(&self) -> FrameSequence {
        match self {
            Generator::Text(g) => g.render(),
            Generator::File(g) => g.render(),
            Generator::AnimatedFile(g) => g.render(),
            Generator::Waving { base, options } => effects::waving_frames(base, options),
            Generator::Glitch { base, options } => effects::glitch_frames(base, options),
            Generator::Rainbow { base, options } => effects::rainbow_frames(base, options),
            Generator::Pattern(_) => Vec::new(),
        }
    }

    /// Next raw element frame from a streaming generator.
    pub fn next_raw(&mut self) -> Option<(Vec<Rgb<u8>>, u64)> {
        match self {
            Generator::Pattern(g) => Some(g.next_frame()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::RingLayout;
    use image::Rgb;

    fn base() -> RgbImage {
        RgbImage::from_pixel(8, 8, Rgb([0, 0, 255]))
    }

    #[test]
    fn only_pattern_streams() {
        let opts = EffectOptions::default();
        assert!(Generator::Pattern(PatternGenerator::new(RingLayout::stock())).is_streaming());
        assert!(
            !Generator::Waving {
                base: base(),
                options: opts
            }
            .is_streaming()
        );
        assert!(!Generator::File(FileGenerator::new(Vec::new(), AnimationOptions::default()))
            .is_streaming());
    }

    #[test]
    fn render_dispatches_to_the_selected_variant() {
        let opts = EffectOptions {
            fps: 4,
            ..EffectOptions::default()
        };
        let waving = Generator::Waving {
            base: base(),
            options: opts,
        };
        assert_eq!(waving.render().len(), 4);

        let rainbow = Generator::Rainbow {
            base: base(),
            options: opts,
        };
        assert_eq!(rainbow.render().len(), 4);

        let glitch = Generator::Glitch {
            base: base(),
            options: opts,
        };
        let count = glitch.render().len();
        assert!((4..=16).contains(&count));
    }

    #[test]
    fn streaming_generators_render_empty_and_feed_next_raw() {
        let mut pattern = Generator::Pattern(PatternGenerator::new(RingLayout::stock()));
        assert!(pattern.render().is_empty());
        let (elements, duration) = pattern.next_raw().expect("pattern streams frames");
        assert_eq!(elements.len(), 255);
        assert_eq!(duration, 50);

        let mut file = Generator::File(FileGenerator::new(Vec::new(), AnimationOptions::default()));
        assert!(file.next_raw().is_none());
    }

    #[test]
    fn file_variants_render_decoded_sequences() {
        use image::codecs::gif::GifEncoder;
        use image::{Delay, Rgba, RgbaImage};
        use std::time::Duration;

        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            for n in 0..2u8 {
                let image = RgbaImage::from_pixel(4, 4, Rgba([n * 100, 0, 0, 255]));
                let delay = Delay::from_saturating_duration(Duration::from_millis(40));
                encoder
                    .encode_frame(image::Frame::from_parts(image, 0, 0, delay))
                    .expect("encode test frame");
            }
        }
        let animated = Generator::AnimatedFile(AnimatedFileGenerator::new(
            bytes,
            AnimationOptions::default(),
        ));
        let frames = animated.render();
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.duration_ms == 40));
    }
}
