use image::{GrayImage, Luma};

use crate::{error::Result, traits::SeedStamper, types::FOREGROUND};

pub const DEFAULT_BORDER_THICKNESS: u32 = 5;

/// Stamps a foreground frame along the image border so the watershed always
/// has an explicit outside basin.
#[derive(Debug, Clone)]
pub struct BorderSeeds {
    pub thickness: u32,
}

impl Default for BorderSeeds {
    fn default() -> Self {
        Self { thickness: DEFAULT_BORDER_THICKNESS }
    }
}

impl BorderSeeds {
    pub fn is_border(&self, width: u32, height: u32, x: u32, y: u32) -> bool {
        let t = self.thickness;
        y < t || x < t || y >= height.saturating_sub(t) || x >= width.saturating_sub(t)
    }
}

impl SeedStamper for BorderSeeds {
    fn stamp(&self, mask: &mut GrayImage) -> Result<()> {
        let (width, height) = mask.dimensions();
        for (x, y, pixel) in mask.enumerate_pixels_mut() {
            if self.is_border(width, height, x, y) {
                *pixel = Luma([FOREGROUND]);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_frame_is_foreground() {
        let mut mask = GrayImage::new(30, 20);
        BorderSeeds::default().stamp(&mut mask).expect("Should stamp");

        for (x, y, pixel) in mask.enumerate_pixels() {
            let expected = y < 5 || y >= 15 || x < 5 || x >= 25;
            assert_eq!(pixel.0[0] == FOREGROUND, expected, "pixel ({x}, {y})");
        }
    }

    #[test]
    fn test_stamping_is_idempotent() {
        let mut mask = GrayImage::from_fn(16, 16, |x, y| Luma([if (x + y) % 3 == 0 { 255 } else { 0 }]));
        let seeds = BorderSeeds { thickness: 3 };
        seeds.stamp(&mut mask).expect("Should stamp");
        let once = mask.clone();
        seeds.stamp(&mut mask).expect("Should stamp");
        assert_eq!(mask, once);
    }

    #[test]
    fn test_thick_frame_covers_small_image() {
        let mut mask = GrayImage::new(6, 6);
        BorderSeeds { thickness: 5 }.stamp(&mut mask).expect("Should stamp");
        assert!(mask.pixels().all(|p| p.0[0] == FOREGROUND));
    }
}
