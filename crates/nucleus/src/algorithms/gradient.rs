use image::{GrayImage, Luma};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, VariantNames};
use tracing::debug;

use crate::{
    algorithms::{
        primitives::{dilate, erode, invert},
        structuring::StructuringElement,
    },
    buffer::allocate_gray,
    error::{NucleusError, Result},
    traits::GradientOperator,
};

pub const DEFAULT_GRADIENT_ITERATIONS: u32 = 5;

/// How the edge map is derived from the simplified image
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GradientStrategy {
    /// Dilation minus erosion with a 3x3 box
    #[default]
    Morphological,
    /// Horizontal and vertical Sobel responses
    Derivative,
}

/// Polarity-inverted edge map used as watershed terrain
#[derive(Debug, Clone)]
pub struct GradientStage {
    pub strategy: GradientStrategy,
    /// Dilation/erosion repetitions of the morphological strategy
    pub iterations: u32,
}

impl Default for GradientStage {
    fn default() -> Self {
        Self {
            strategy: GradientStrategy::default(),
            iterations: DEFAULT_GRADIENT_ITERATIONS,
        }
    }
}

impl GradientStage {
    pub fn new(strategy: GradientStrategy, iterations: u32) -> Self {
        Self { strategy, iterations }
    }
}

impl GradientOperator for GradientStage {
    fn gradient(&self, image: &GrayImage) -> Result<GrayImage> {
        debug!(strategy = %self.strategy, iterations = self.iterations, "gradient");
        let edges = match self.strategy {
            GradientStrategy::Morphological => morphological_gradient(image, self.iterations)?,
            GradientStrategy::Derivative => derivative_gradient(image),
        };
        Ok(invert(&edges))
    }
}

/// Dilation minus erosion, both repeated `iterations` times
pub fn morphological_gradient(image: &GrayImage, iterations: u32) -> Result<GrayImage> {
    let element = StructuringElement::rectangle(3, 3)?;
    let dilated = dilate(image, &element, iterations);
    let eroded = erode(image, &element, iterations);

    let mut gradient = allocate_gray(image.width(), image.height())?;
    for ((out, high), low) in gradient.pixels_mut().zip(dilated.pixels()).zip(eroded.pixels()) {
        out.0[0] = high.0[0].checked_sub(low.0[0]).ok_or_else(|| {
            NucleusError::InvariantViolation("erosion exceeded dilation".to_string())
        })?;
    }
    Ok(gradient)
}

/// Average of the saturated absolute Sobel responses
pub fn derivative_gradient(image: &GrayImage) -> GrayImage {
    let gx = horizontal_sobel(image);
    let gy = vertical_sobel(image);
    let saturate = |v: i16| v.unsigned_abs().min(u8::MAX as u16) as f32;

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let dx = saturate(gx.get_pixel(x, y).0[0]);
        let dy = saturate(gy.get_pixel(x, y).0[0]);
        Luma([(0.5 * dx + 0.5 * dy).round_ties_even() as u8])
    })
}
