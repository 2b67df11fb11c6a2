use crate::{
    algorithms::{
        BorderSeeds, CytoplasmMask, GradientStage, GradientStrategy, MarkerWatershedSegmenter,
        ScaleSpaceToggle, ThresholdAndHoleRepair,
    },
    config::SegmentationConfig,
    error::Result,
    pipeline::Pipeline,
    traits::{GradientOperator, ImagePreprocessor, MarkerSegmenter, SeedStamper, Simplifier},
};

/// Builder for creating segmentation pipelines with a fluent API
pub struct PipelineBuilder {
    mask_builder: Option<Box<dyn ImagePreprocessor>>,
    seed_stamper: Option<Box<dyn SeedStamper>>,
    simplifier: Option<Box<dyn Simplifier>>,
    gradient: Option<Box<dyn GradientOperator>>,
    segmenter: Option<Box<dyn MarkerSegmenter>>,
    cytoplasm: Option<Box<dyn ImagePreprocessor>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            mask_builder: None,
            seed_stamper: None,
            simplifier: None,
            gradient: None,
            segmenter: None,
            cytoplasm: None,
        }
    }

    /// Builder with every stage configured from `config`
    pub fn from_config(config: &SegmentationConfig) -> Result<Self> {
        config.validate()?;
        let [seed_x, seed_y] = config.hole_fill_seed;

        Ok(Self::new()
            .set_mask_builder(ThresholdAndHoleRepair {
                threshold: config.threshold_value,
                seed: (seed_x, seed_y),
                tolerance: config.flood_tolerance,
            })
            .set_seed_stamper(BorderSeeds { thickness: config.border_seed_thickness })
            .set_simplifier(ScaleSpaceToggle::with_iterations(config.toggle_iterations))
            .set_gradient(GradientStage::new(config.gradient_strategy, config.gradient_iterations))
            .set_segmenter(MarkerWatershedSegmenter { color_seed: config.color_seed })
            .set_cytoplasm(CytoplasmMask::new(
                config.cytoplasm.threshold_value,
                config.cytoplasm.kernel_size,
            )?))
    }

    /// Set the nucleus mask stage (replaces any existing one)
    pub fn set_mask_builder<P>(mut self, stage: P) -> Self
    where
        P: ImagePreprocessor + 'static,
    {
        self.mask_builder = Some(Box::new(stage));
        self
    }

    /// Set the seed stamper (replaces any existing one)
    pub fn set_seed_stamper<S>(mut self, stamper: S) -> Self
    where
        S: SeedStamper + 'static,
    {
        self.seed_stamper = Some(Box::new(stamper));
        self
    }

    /// Set the simplification operator (replaces any existing one)
    pub fn set_simplifier<S>(mut self, simplifier: S) -> Self
    where
        S: Simplifier + 'static,
    {
        self.simplifier = Some(Box::new(simplifier));
        self
    }

    /// Set the gradient operator (replaces any existing one)
    pub fn set_gradient<G>(mut self, gradient: G) -> Self
    where
        G: GradientOperator + 'static,
    {
        self.gradient = Some(Box::new(gradient));
        self
    }

    /// Set the marker segmenter (replaces any existing one)
    pub fn set_segmenter<M>(mut self, segmenter: M) -> Self
    where
        M: MarkerSegmenter + 'static,
    {
        self.segmenter = Some(Box::new(segmenter));
        self
    }

    /// Set the cytoplasm mask stage (replaces any existing one)
    pub fn set_cytoplasm<P>(mut self, stage: P) -> Self
    where
        P: ImagePreprocessor + 'static,
    {
        self.cytoplasm = Some(Box::new(stage));
        self
    }

    /// Toggle simplification with `iterations` dilations/erosions
    pub fn with_toggle_iterations(self, iterations: u32) -> Self {
        self.set_simplifier(ScaleSpaceToggle::with_iterations(iterations))
    }

    /// Gradient terrain computed with the given strategy
    pub fn with_gradient_strategy(self, strategy: GradientStrategy) -> Self {
        self.set_gradient(GradientStage {
            strategy,
            ..GradientStage::default()
        })
    }

    /// Reproducible region colors
    pub fn with_color_seed(self, seed: u64) -> Self {
        self.set_segmenter(MarkerWatershedSegmenter::with_seed(seed))
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> Pipeline {
        let mask_builder = self.mask_builder
            .unwrap_or_else(|| Box::new(ThresholdAndHoleRepair::default()));

        let seed_stamper = self.seed_stamper
            .unwrap_or_else(|| Box::new(BorderSeeds::default()));

        let simplifier = self.simplifier
            .unwrap_or_else(|| Box::new(ScaleSpaceToggle::default()));

        let gradient = self.gradient
            .unwrap_or_else(|| Box::new(GradientStage::default()));

        let segmenter = self.segmenter
            .unwrap_or_else(|| Box::new(MarkerWatershedSegmenter::default()));

        let cytoplasm = self.cytoplasm
            .unwrap_or_else(|| Box::new(CytoplasmMask::default()));

        Pipeline::new(mask_builder, seed_stamper, simplifier, gradient, segmenter, cytoplasm)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
