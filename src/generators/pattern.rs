//! Streaming test pattern for disc targets: each ring holds one color wheel
//! position, and every frame nudges all rings around the wheel.

use image::Rgb;

use crate::disc::RingLayout;
use crate::generators::effects::{color_wheel, WHEEL_MAX};

const RING_SPACING: f32 = 100.0;
const STEP: f32 = 7.0;
const FRAME_MS: u64 = 50;

/// Endless per-element color source; bypasses the transform pipeline since it
/// emits element lists directly rather than images.
#[derive(Debug, Clone)]
pub struct PatternGenerator {
    layout: RingLayout,
    values: Vec<f32>,
}

impl PatternGenerator {
    pub fn new(layout: RingLayout) -> Self {
        let values = (0..layout.rings().len())
            .map(|n| RING_SPACING + n as f32 * RING_SPACING)
            .collect();
        Self { layout, values }
    }

    /// Next frame of per-element colors in ring/position order, plus its
    /// display duration.
    pub fn next_frame(&mut self) -> (Vec<Rgb<u8>>, u64) {
        let mut elements = Vec::with_capacity(self.layout.element_count());
        for (ring, value) in self.layout.rings().iter().zip(self.values.iter_mut()) {
            let color = color_wheel(*value);
            for _ in 0..ring.count {
                elements.push(color);
            }
            *value += STEP;
            if *value >= WHEEL_MAX {
                *value -= WHEEL_MAX;
            }
        }
        (elements, FRAME_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::RingLayout;

    #[test]
    fn frame_covers_every_element_in_ring_order() {
        let mut pattern = PatternGenerator::new(RingLayout::stock());
        let (elements, duration) = pattern.next_frame();
        assert_eq!(elements.len(), 255);
        assert_eq!(duration, 50);
        // All elements of one ring share a color.
        let mut offset = 0;
        for ring in RingLayout::stock().rings() {
            let first = elements[offset];
            for n in 0..ring.count {
                assert_eq!(elements[offset + n], first);
            }
            offset += ring.count;
        }
    }

    #[test]
    fn successive_frames_advance_the_wheel() {
        let mut pattern = PatternGenerator::new(RingLayout::stock());
        let (a, _) = pattern.next_frame();
        let (b, _) = pattern.next_frame();
        assert_ne!(a, b);
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn adjacent_rings_start_at_different_hues() {
        let mut pattern = PatternGenerator::new(RingLayout::stock());
        let (elements, _) = pattern.next_frame();
        let rings = RingLayout::stock();
        let first_ring = elements[0];
        let second_ring = elements[rings.rings()[0].count];
        assert_ne!(first_ring, second_ring);
    }
}
