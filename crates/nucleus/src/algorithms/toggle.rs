use image::GrayImage;
use rayon::prelude::*;
use tracing::debug;

use crate::{
    algorithms::{
        primitives::{dilate, erode},
        structuring::StructuringElement,
    },
    error::{NucleusError, Result},
    traits::Simplifier,
};

pub const DEFAULT_TOGGLE_ITERATIONS: u32 = 7;

/// Scale-space toggle operator.
///
/// Every pixel picks whichever of its `k`-times dilated or `k`-times eroded
/// value lies closer to the original; ties keep the original value. Small
/// structures snap to their surroundings while large ones keep sharp edges.
#[derive(Debug, Clone)]
pub struct ScaleSpaceToggle {
    pub element: StructuringElement,
    pub iterations: u32,
}

impl Default for ScaleSpaceToggle {
    fn default() -> Self {
        Self {
            element: StructuringElement::toggle_default(),
            iterations: DEFAULT_TOGGLE_ITERATIONS,
        }
    }
}

impl ScaleSpaceToggle {
    pub fn new(element: StructuringElement, iterations: u32) -> Self {
        Self { element, iterations }
    }

    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            iterations,
            ..Self::default()
        }
    }
}

impl Simplifier for ScaleSpaceToggle {
    fn simplify(&self, image: &GrayImage) -> Result<GrayImage> {
        debug!(
            width = image.width(),
            height = image.height(),
            iterations = self.iterations,
            "scale-space toggle"
        );
        let dilated = dilate(image, &self.element, self.iterations);
        let eroded = erode(image, &self.element, self.iterations);
        toggle(image, &dilated, &eroded)
    }
}

/// Pointwise toggle between the dilated (`psi1`) and eroded (`psi2`) images
pub fn toggle(image: &GrayImage, psi1: &GrayImage, psi2: &GrayImage) -> Result<GrayImage> {
    if psi1.dimensions() != image.dimensions() || psi2.dimensions() != image.dimensions() {
        return Err(NucleusError::InvariantViolation(format!(
            "toggle operands differ in size: image {:?}, dilated {:?}, eroded {:?}",
            image.dimensions(),
            psi1.dimensions(),
            psi2.dimensions()
        )));
    }

    let mut result = image.clone();
    let pixels: &mut [u8] = &mut result;
    pixels
        .par_iter_mut()
        .zip(psi1.as_raw().par_iter().zip(psi2.as_raw().par_iter()))
        .for_each(|(out, (&up, &down))| {
            let original = *out as i16;
            let rise = up as i16 - original;
            let fall = original - down as i16;
            *out = if rise < fall {
                up
            } else if rise == fall {
                *out
            } else {
                down
            };
        });

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn textured_image() -> GrayImage {
        GrayImage::from_fn(32, 24, |x, y| Luma([((x * 37 + y * 91 + x * y * 13) % 256) as u8]))
    }

    #[test]
    fn test_zero_iterations_is_identity() {
        let image = textured_image();
        let simplified = ScaleSpaceToggle::with_iterations(0)
            .simplify(&image)
            .expect("Should simplify");
        assert_eq!(simplified, image);
    }

    #[test]
    fn test_result_is_one_of_the_three_candidates() {
        let image = textured_image();
        let toggle_op = ScaleSpaceToggle::with_iterations(3);
        let psi1 = dilate(&image, &toggle_op.element, 3);
        let psi2 = erode(&image, &toggle_op.element, 3);
        let simplified = toggle_op.simplify(&image).expect("Should simplify");

        for (x, y, pixel) in simplified.enumerate_pixels() {
            let value = pixel.0[0];
            let candidates = [
                psi1.get_pixel(x, y).0[0],
                image.get_pixel(x, y).0[0],
                psi2.get_pixel(x, y).0[0],
            ];
            assert!(candidates.contains(&value), "pixel ({x}, {y}) = {value} not in {candidates:?}");
        }
    }

    #[test]
    fn test_toggle_rule() {
        let image = GrayImage::from_raw(3, 1, vec![100, 100, 100]).expect("Should build image");
        let psi1 = GrayImage::from_raw(3, 1, vec![110, 130, 120]).expect("Should build image");
        let psi2 = GrayImage::from_raw(3, 1, vec![70, 90, 80]).expect("Should build image");
        let result = toggle(&image, &psi1, &psi2).expect("Should toggle");
        // rise 10 < fall 30 -> dilated; rise 30 > fall 10 -> eroded; 20 == 20 -> original
        assert_eq!(result.as_raw(), &vec![110, 90, 100]);
    }

    #[test]
    fn test_step_edge_is_preserved() {
        let image = GrayImage::from_fn(40, 40, |x, _| Luma([if x < 20 { 20 } else { 220 }]));
        let simplified = ScaleSpaceToggle::default().simplify(&image).expect("Should simplify");
        assert_eq!(simplified, image);
    }

    #[test]
    fn test_soft_edge_is_sharpened() {
        let image = GrayImage::from_raw(9, 1, vec![20, 20, 20, 30, 200, 210, 220, 220, 220])
            .expect("Should build image");
        let simplified = ScaleSpaceToggle::with_iterations(1)
            .simplify(&image)
            .expect("Should simplify");
        assert_eq!(simplified.as_raw(), &vec![20, 20, 20, 20, 210, 210, 220, 220, 220]);
    }

    #[test]
    fn test_size_mismatch_is_an_invariant_violation() {
        let image = GrayImage::new(4, 4);
        let other = GrayImage::new(5, 4);
        assert!(matches!(
            toggle(&image, &other, &image),
            Err(NucleusError::InvariantViolation(_))
        ));
    }
}
