//! Encodes rendered frames for export: PNG for stills, looping GIF for
//! sequences. Exports always use the full-brightness twins.

use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::png::PngEncoder;
use image::{Delay, DynamicImage, ExtendedColorType, ImageEncoder, RgbImage};

use crate::error::Error;

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(bytes)
}

/// Infinite-loop GIF; durations are (frame, milliseconds) pairs. GIF delay
/// resolution is centiseconds, so durations round to the nearest 10 ms.
pub fn encode_gif(frames: &[(RgbImage, u64)]) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut bytes);
        encoder.set_repeat(Repeat::Infinite)?;
        for (image, duration_ms) in frames {
            let rgba = DynamicImage::ImageRgb8(image.clone()).to_rgba8();
            let delay = Delay::from_numer_denom_ms(*duration_ms as u32, 1);
            encoder.encode_frame(image::Frame::from_parts(rgba, 0, 0, delay))?;
        }
    }
    Ok(bytes)
}
