use image::DynamicImage;

use crate::{error::Result, traits::OutputSink, types::Stage};

/// Discards every stage
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&mut self, _stage: Stage, _image: &DynamicImage) -> Result<()> {
        Ok(())
    }
}

/// Keeps a copy of every stage in emission order
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub stages: Vec<(Stage, DynamicImage)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stage: Stage) -> Option<&DynamicImage> {
        self.stages.iter().find(|(s, _)| *s == stage).map(|(_, image)| image)
    }

    pub fn stage_order(&self) -> Vec<Stage> {
        self.stages.iter().map(|(stage, _)| *stage).collect()
    }
}

impl OutputSink for MemorySink {
    fn emit(&mut self, stage: Stage, image: &DynamicImage) -> Result<()> {
        self.stages.push((stage, image.clone()));
        Ok(())
    }
}
