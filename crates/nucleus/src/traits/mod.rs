use image::{DynamicImage, GrayImage};
use crate::{error::Result, types::{Segmentation, Stage}};

/// Trait for turning a grayscale image into a binary candidate mask
pub trait ImagePreprocessor: Send + Sync {
    /// Produce a binary mask (foreground = 255)
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage>;
}

/// Trait for writing watershed seeds into a mask
pub trait SeedStamper: Send + Sync {
    /// Mark seed pixels in place
    fn stamp(&self, mask: &mut GrayImage) -> Result<()>;
}

/// Trait for nonlinear image simplification
pub trait Simplifier: Send + Sync {
    /// Return a simplified copy of the image
    fn simplify(&self, image: &GrayImage) -> Result<GrayImage>;
}

/// Trait for edge maps used as watershed terrain
pub trait GradientOperator: Send + Sync {
    /// Compute a single-channel edge map of the same size as the input
    fn gradient(&self, image: &GrayImage) -> Result<GrayImage>;
}

/// Trait for marker-controlled segmentation
pub trait MarkerSegmenter: Send + Sync {
    /// Segment `original` using `terrain` as the flooding relief and the
    /// foreground of `markers` as seeds
    fn segment(&self, original: &GrayImage, terrain: &GrayImage, markers: &GrayImage) -> Result<Segmentation>;
}

/// Trait for receiving intermediate and final images of a pipeline run
pub trait OutputSink {
    /// Called once per produced stage, in pipeline order
    fn emit(&mut self, stage: Stage, image: &DynamicImage) -> Result<()>;
}
