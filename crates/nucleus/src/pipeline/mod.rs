pub mod builder;

use image::{DynamicImage, GrayImage};
use tracing::{info, warn};

use crate::{
    algorithms::MarkerWatershedSegmenter,
    buffer::ensure_non_empty,
    config::SegmentationConfig,
    error::{NucleusError, Result},
    sink::NullSink,
    traits::{GradientOperator, ImagePreprocessor, MarkerSegmenter, OutputSink, SeedStamper, Simplifier},
    types::{Segmentation, Stage},
};

/// The nucleus segmentation pipeline and its simpler variants
pub struct Pipeline {
    mask_builder: Box<dyn ImagePreprocessor>,
    seed_stamper: Box<dyn SeedStamper>,
    simplifier: Box<dyn Simplifier>,
    gradient: Box<dyn GradientOperator>,
    segmenter: Box<dyn MarkerSegmenter>,
    cytoplasm: Box<dyn ImagePreprocessor>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Build a pipeline whose stages follow the given configuration
    pub fn from_config(config: &SegmentationConfig) -> Result<Self> {
        Ok(builder::PipelineBuilder::from_config(config)?.build())
    }

    /// Create a new pipeline with the given components
    pub fn new(
        mask_builder: Box<dyn ImagePreprocessor>,
        seed_stamper: Box<dyn SeedStamper>,
        simplifier: Box<dyn Simplifier>,
        gradient: Box<dyn GradientOperator>,
        segmenter: Box<dyn MarkerSegmenter>,
        cytoplasm: Box<dyn ImagePreprocessor>,
    ) -> Self {
        Self {
            mask_builder,
            seed_stamper,
            simplifier,
            gradient,
            segmenter,
            cytoplasm,
        }
    }

    /// Scale-space toggle simplification alone
    pub fn simplify(&self, image: &GrayImage) -> Result<GrayImage> {
        self.simplify_with_sink(image, &mut NullSink)
    }

    pub fn simplify_with_sink(&self, image: &GrayImage, sink: &mut dyn OutputSink) -> Result<GrayImage> {
        ensure_non_empty(image.width(), image.height())?;
        let simplified = self.simplifier.simplify(image)?;
        check_stage(Stage::Simplified, image, &simplified)?;
        sink.emit(Stage::Simplified, &DynamicImage::ImageLuma8(simplified.clone()))?;
        Ok(simplified)
    }

    /// Full nucleus segmentation: mask, border seeds, toggle, gradient, watershed
    pub fn segment_nuclei(&self, image: &GrayImage) -> Result<Segmentation> {
        self.segment_nuclei_with_sink(image, &mut NullSink)
    }

    pub fn segment_nuclei_with_sink(&self, image: &GrayImage, sink: &mut dyn OutputSink) -> Result<Segmentation> {
        ensure_non_empty(image.width(), image.height())?;

        // Step 1: Candidate mask with holes repaired
        let mask = self.mask_builder.preprocess(image)?;
        check_stage(Stage::Threshold, image, &mask)?;
        sink.emit(Stage::Threshold, &DynamicImage::ImageLuma8(mask.clone()))?;

        if mask.pixels().all(|p| p.0[0] == 0) {
            warn!("no pixel passed the nucleus threshold");
            let result = MarkerWatershedSegmenter::empty(image)?;
            sink.emit(Stage::Segmentation, &DynamicImage::ImageRgb8(result.image.clone()))?;
            return Ok(result);
        }

        // Step 2: Border seeds for the outside basin
        let mut seeded = mask;
        self.seed_stamper.stamp(&mut seeded)?;
        sink.emit(Stage::Seeded, &DynamicImage::ImageLuma8(seeded.clone()))?;

        // Step 3: Simplify the original and derive the terrain
        let simplified = self.simplify_with_sink(image, sink)?;
        let terrain = self.gradient.gradient(&simplified)?;
        check_stage(Stage::Gradient, image, &terrain)?;
        sink.emit(Stage::Gradient, &DynamicImage::ImageLuma8(terrain.clone()))?;

        // Step 4: Marker-controlled watershed
        let result = self.segmenter.segment(image, &terrain, &seeded)?;
        sink.emit(Stage::Segmentation, &DynamicImage::ImageRgb8(result.image.clone()))?;

        info!(
            components = result.component_count,
            outcome = %result.outcome,
            "nucleus segmentation finished"
        );
        Ok(result)
    }

    /// Whole-cell mask by thresholding and large elliptical opening
    pub fn segment_cytoplasm(&self, image: &GrayImage) -> Result<GrayImage> {
        self.segment_cytoplasm_with_sink(image, &mut NullSink)
    }

    pub fn segment_cytoplasm_with_sink(&self, image: &GrayImage, sink: &mut dyn OutputSink) -> Result<GrayImage> {
        ensure_non_empty(image.width(), image.height())?;
        let mask = self.cytoplasm.preprocess(image)?;
        check_stage(Stage::Cytoplasm, image, &mask)?;
        sink.emit(Stage::Cytoplasm, &DynamicImage::ImageLuma8(mask.clone()))?;
        Ok(mask)
    }
}

/// Stage outputs must keep the source dimensions; anything else is a bug in
/// the stage, not a caller error
fn check_stage(stage: Stage, source: &GrayImage, produced: &GrayImage) -> Result<()> {
    if source.dimensions() != produced.dimensions() {
        return Err(NucleusError::InvariantViolation(format!(
            "{stage} stage changed dimensions from {:?} to {:?}",
            source.dimensions(),
            produced.dimensions()
        )));
    }
    Ok(())
}
