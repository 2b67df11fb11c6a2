use std::{path::Path, sync::Arc};

use image::GrayImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
    algorithms::ScaleSpaceToggle,
    config::SegmentationConfig,
    error::{NucleusError, Result},
    pipeline::Pipeline,
    traits::Simplifier,
    types::Segmentation,
};

#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params")]
#[strum(serialize_all = "snake_case")]
pub enum SegmentationCommand {
    /// Run only the scale-space toggle
    #[serde(rename = "simplify")]
    Simplify {
        /// Overrides the configured number of dilations/erosions
        iterations: Option<u32>,
    },

    /// Segment nuclei with the marker-controlled watershed
    #[serde(rename = "segment_nuclei")]
    SegmentNuclei,

    /// Build the whole-cell mask
    #[serde(rename = "segment_cytoplasm")]
    SegmentCytoplasm,
}

impl SegmentationCommand {
    /// Get the JSON schema for all commands
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SegmentationCommand)
    }

    /// Get a list of all available command names
    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    /// Get a description of the command
    pub fn description(&self) -> &'static str {
        match self {
            Self::Simplify { .. } => "Simplify the image with the scale-space toggle operator",
            Self::SegmentNuclei => "Segment nuclei: threshold, border seeds, toggle, gradient and watershed",
            Self::SegmentCytoplasm => "Mask whole cells with a threshold and a large elliptical opening",
        }
    }
}

/// What a command produced
#[derive(Debug, Clone)]
pub enum SegmentationOutput {
    Simplified(GrayImage),
    Nuclei(Segmentation),
    Cytoplasm(GrayImage),
}

/// Holds one grayscale image and runs commands against it
#[derive(Clone)]
pub struct SegmentationManager {
    image: Option<GrayImage>,
    pipeline: Arc<Pipeline>,
}

impl SegmentationManager {
    pub fn new() -> Self {
        Self::with_pipeline(Pipeline::builder().build())
    }

    /// Create a new manager with a custom pipeline
    pub fn with_pipeline(pipeline: Pipeline) -> Self {
        Self {
            image: None,
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn from_config(config: &SegmentationConfig) -> Result<Self> {
        Ok(Self::with_pipeline(Pipeline::from_config(config)?))
    }

    /// Load an image from file, converted to grayscale
    pub fn load_image<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let img = image::open(path)?;
        self.image = Some(img.to_luma8());
        Ok(())
    }

    /// Load an image from memory, converted to grayscale
    pub fn load_image_from_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let img = image::load_from_memory(bytes)?;
        self.image = Some(img.to_luma8());
        Ok(())
    }

    /// Set the image directly
    pub fn set_image(&mut self, image: GrayImage) {
        self.image = Some(image);
    }

    pub fn image(&self) -> Option<&GrayImage> {
        self.image.as_ref()
    }

    pub fn execute(&self, command: SegmentationCommand) -> Result<SegmentationOutput> {
        let image = self.image.as_ref().ok_or(NucleusError::NoImageLoaded)?;

        match command {
            SegmentationCommand::Simplify { iterations: Some(iterations) } => {
                let simplified = ScaleSpaceToggle::with_iterations(iterations).simplify(image)?;
                Ok(SegmentationOutput::Simplified(simplified))
            }
            SegmentationCommand::Simplify { iterations: None } => {
                Ok(SegmentationOutput::Simplified(self.pipeline.simplify(image)?))
            }
            SegmentationCommand::SegmentNuclei => {
                Ok(SegmentationOutput::Nuclei(self.pipeline.segment_nuclei(image)?))
            }
            SegmentationCommand::SegmentCytoplasm => {
                Ok(SegmentationOutput::Cytoplasm(self.pipeline.segment_cytoplasm(image)?))
            }
        }
    }
}

impl Default for SegmentationManager {
    fn default() -> Self {
        Self::new()
    }
}
