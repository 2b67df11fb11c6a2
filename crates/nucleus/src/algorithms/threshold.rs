use image::{GrayImage, Luma};
use tracing::debug;

use crate::{
    algorithms::primitives::{flood_fill, invert, saturating_add},
    error::Result,
    traits::ImagePreprocessor,
    types::FOREGROUND,
};

pub const DEFAULT_THRESHOLD: u8 = 90;
pub const DEFAULT_FLOOD_TOLERANCE: u8 = 10;

/// Inverted binary threshold: pixels darker than `threshold` become foreground
pub fn threshold_inverted(image: &GrayImage, threshold: u8) -> GrayImage {
    let mut binary = image.clone();
    for p in binary.pixels_mut() {
        *p = if p.0[0] < threshold { Luma([FOREGROUND]) } else { Luma([0]) };
    }
    binary
}

/// Dark-object threshold followed by interior hole removal.
///
/// Holes are whatever the background flood fill started at `seed` cannot
/// reach. When the seed itself lands on foreground the repaired mask becomes
/// entirely foreground; that case is not corrected.
#[derive(Debug, Clone)]
pub struct ThresholdAndHoleRepair {
    pub threshold: u8,
    /// Flood fill start as (x, y), expected to lie in background
    pub seed: (u32, u32),
    pub tolerance: u8,
}

impl Default for ThresholdAndHoleRepair {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            seed: (0, 0),
            tolerance: DEFAULT_FLOOD_TOLERANCE,
        }
    }
}

impl ThresholdAndHoleRepair {
    /// Fill the enclosed holes of an existing binary mask
    pub fn repair_holes(&self, mask: &GrayImage) -> Result<GrayImage> {
        let mut flooded = mask.clone();
        let reached = flood_fill(&mut flooded, self.seed, FOREGROUND, self.tolerance, self.tolerance)?;
        debug!(reached, seed = ?self.seed, "background flood fill");
        saturating_add(mask, &invert(&flooded))
    }
}

impl ImagePreprocessor for ThresholdAndHoleRepair {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        let binary = threshold_inverted(image, self.threshold);
        self.repair_holes(&binary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_image() -> GrayImage {
        // dark ring with a bright center, on a bright background
        GrayImage::from_fn(60, 60, |x, y| {
            let dx = x as f32 - 30.0;
            let dy = y as f32 - 30.0;
            let dist = (dx * dx + dy * dy).sqrt();
            if (8.0..=18.0).contains(&dist) { Luma([30]) } else { Luma([200]) }
        })
    }

    #[test]
    fn test_threshold_is_inverted() {
        let image = GrayImage::from_raw(3, 1, vec![89, 90, 10]).expect("Should build image");
        let binary = threshold_inverted(&image, 90);
        assert_eq!(binary.as_raw(), &vec![255, 0, 255]);
    }

    #[test]
    fn test_holes_are_filled() {
        let repaired = ThresholdAndHoleRepair::default()
            .preprocess(&ring_image())
            .expect("Should build mask");
        assert_eq!(repaired.get_pixel(30, 30).0[0], FOREGROUND);
        assert_eq!(repaired.get_pixel(30, 14).0[0], FOREGROUND);
        assert_eq!(repaired.get_pixel(2, 2).0[0], 0);
        assert_eq!(repaired.get_pixel(30, 52).0[0], 0);
    }

    #[test]
    fn test_repair_is_idempotent() {
        let stage = ThresholdAndHoleRepair::default();
        let repaired = stage.preprocess(&ring_image()).expect("Should build mask");
        let again = stage.repair_holes(&repaired).expect("Should repair");
        assert_eq!(again, repaired);
    }

    #[test]
    fn test_foreground_seed_floods_everything() {
        let mut image = ring_image();
        image.put_pixel(0, 0, Luma([0]));
        let repaired = ThresholdAndHoleRepair::default()
            .preprocess(&image)
            .expect("Should build mask");
        assert!(repaired.pixels().all(|p| p.0[0] == FOREGROUND));
    }

    #[test]
    fn test_seed_outside_image_is_rejected() {
        let stage = ThresholdAndHoleRepair {
            seed: (500, 0),
            ..Default::default()
        };
        assert!(stage.preprocess(&ring_image()).is_err());
    }
}
