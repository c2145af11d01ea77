//! Local fallback frames used when image generation fails.

use image::{Rgb, RgbImage};

/// Two-stop gradients, picked by `scene_index % 4`.
pub const PALETTE: [([u8; 3], [u8; 3]); 4] = [
    ([0xFF, 0x6B, 0x6B], [0x4E, 0xCD, 0xC4]),
    ([0xA8, 0xE6, 0xCF], [0xFF, 0xD3, 0xB6]),
    ([0xFF, 0xA0, 0x7A], [0x98, 0xD8, 0xC8]),
    ([0xF7, 0xDC, 0x6F], [0xBB, 0x8F, 0xCE]),
];

const HIGHLIGHT_OPACITY: f32 = 0.3;
/// Highlight radius relative to the canonical 1080-pixel width.
const HIGHLIGHT_RADIUS_RATIO: f32 = 400.0 / 1080.0;

pub fn palette_for(scene_index: usize) -> ([u8; 3], [u8; 3]) {
    PALETTE[scene_index % PALETTE.len()]
}

/// Render a diagonal gradient with a soft white highlight in the centre.
///
/// `shift` in `[0, 1)` moves the first gradient stop so consecutive
/// frames of one scene differ.
pub fn render(scene_index: usize, shift: f32, width: u32, height: u32) -> RgbImage {
    let (from, to) = palette_for(scene_index);
    let first_stop = shift.clamp(0.0, 0.99) * 0.5;

    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let radius = (width as f32 * HIGHLIGHT_RADIUS_RATIO).max(1.0);
    let span_x = (width.max(2) - 1) as f32;
    let span_y = (height.max(2) - 1) as f32;

    RgbImage::from_fn(width, height, |x, y| {
        let diagonal = (x as f32 / span_x + y as f32 / span_y) / 2.0;
        let t = ((diagonal - first_stop) / (1.0 - first_stop)).clamp(0.0, 1.0);

        let distance = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
        let glow = HIGHLIGHT_OPACITY * (1.0 - distance / radius).max(0.0);

        Rgb(std::array::from_fn(|c| {
            let base = from[c] as f32 + (to[c] as f32 - from[c] as f32) * t;
            (base + (255.0 - base) * glow).round() as u8
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_cycles_every_four_scenes() {
        assert_eq!(palette_for(0), palette_for(4));
        assert_ne!(palette_for(0), palette_for(1));
    }

    #[test]
    fn corners_use_gradient_stops() {
        let img = render(0, 0.0, 108, 192);
        assert_eq!(img.get_pixel(0, 0).0, PALETTE[0].0);
        assert_eq!(img.get_pixel(107, 191).0, PALETTE[0].1);
    }

    #[test]
    fn centre_is_lightened() {
        let img = render(2, 0.0, 108, 192);
        let centre = img.get_pixel(54, 96).0;
        let (from, to) = PALETTE[2];
        for c in 0..3 {
            let midpoint = (from[c] as u16 + to[c] as u16) / 2;
            assert!(centre[c] as u16 >= midpoint);
        }
    }

    #[test]
    fn same_inputs_render_identically() {
        assert_eq!(render(3, 0.25, 40, 70), render(3, 0.25, 40, 70));
    }

    #[test]
    fn shift_changes_frames_of_one_scene() {
        assert_ne!(render(1, 0.0, 40, 70), render(1, 0.5, 40, 70));
    }
}
