use image::GrayImage;
use tracing::debug;

use crate::{
    algorithms::{
        primitives::{dilate, erode},
        structuring::StructuringElement,
        threshold::threshold_inverted,
    },
    error::Result,
    traits::ImagePreprocessor,
};

pub const DEFAULT_CYTOPLASM_THRESHOLD: u8 = 200;
pub const DEFAULT_CYTOPLASM_KERNEL: u32 = 91;

/// Whole-cell mask: everything darker than the plasma background, opened with
/// a large ellipse so only cell-sized blobs survive.
#[derive(Debug, Clone)]
pub struct CytoplasmMask {
    pub threshold: u8,
    pub element: StructuringElement,
}

impl Default for CytoplasmMask {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CYTOPLASM_THRESHOLD,
            element: StructuringElement::ellipse_unchecked(
                DEFAULT_CYTOPLASM_KERNEL,
                DEFAULT_CYTOPLASM_KERNEL,
            ),
        }
    }
}

impl CytoplasmMask {
    pub fn new(threshold: u8, kernel_size: u32) -> Result<Self> {
        Ok(Self {
            threshold,
            element: StructuringElement::ellipse(kernel_size, kernel_size)?,
        })
    }
}

impl ImagePreprocessor for CytoplasmMask {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        debug!(threshold = self.threshold, kernel = ?self.element.dimensions(), "cytoplasm opening");
        let binary = threshold_inverted(image, self.threshold);
        let eroded = erode(&binary, &self.element, 1);
        Ok(dilate(&eroded, &self.element, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn cell_with_debris() -> GrayImage {
        let mut image = GrayImage::from_pixel(80, 80, Luma([230]));
        for y in 20..60 {
            for x in 20..60 {
                let (dx, dy) = (x as f32 - 40.0, y as f32 - 40.0);
                if dx * dx + dy * dy <= 18.0 * 18.0 {
                    image.put_pixel(x, y, Luma([120]));
                }
            }
        }
        // debris smaller than the opening element
        for y in 5..8 {
            for x in 5..8 {
                image.put_pixel(x, y, Luma([100]));
            }
        }
        image
    }

    #[test]
    fn test_opening_keeps_cell_and_drops_debris() {
        let mask = CytoplasmMask::new(DEFAULT_CYTOPLASM_THRESHOLD, 11)
            .expect("Should build stage")
            .preprocess(&cell_with_debris())
            .expect("Should build mask");
        assert_eq!(mask.get_pixel(40, 40).0[0], 255);
        assert_eq!(mask.get_pixel(6, 6).0[0], 0);
        assert_eq!(mask.get_pixel(75, 75).0[0], 0);
    }

    #[test]
    fn test_even_kernel_is_rejected() {
        assert!(CytoplasmMask::new(200, 90).is_err());
    }
}
