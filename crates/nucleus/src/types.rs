use image::{ImageBuffer, Luma, RgbImage};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Signed region identifiers: 0 = unlabeled, positive = region id, -1 = ridge.
pub type LabelMap = ImageBuffer<Luma<i32>, Vec<i32>>;

/// Label written by the watershed on pixels that separate two basins.
pub const RIDGE_LABEL: i32 = -1;

/// Value marking foreground in every binary mask produced by the crate.
pub const FOREGROUND: u8 = u8::MAX;

/// How a nucleus segmentation run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SegmentationOutcome {
    /// At least one marker was found and the watershed ran
    Segmented,
    /// No foreground survived masking; the watershed was skipped
    EmptyMask,
}

/// Result of the marker-controlled watershed stage
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Label colors blended 50/50 with the source image
    pub image: RgbImage,
    /// Per-pixel region ids after flooding
    pub labels: LabelMap,
    /// Number of outer contours used as markers
    pub component_count: usize,
    pub outcome: SegmentationOutcome,
}

impl Segmentation {
    pub fn is_empty(&self) -> bool {
        self.outcome == SegmentationOutcome::EmptyMask
    }

    /// Distinct positive labels present in the label map, ascending.
    pub fn region_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.labels.pixels().map(|p| p.0[0]).filter(|&l| l > 0).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Number of pixels carrying the ridge label
    pub fn ridge_pixel_count(&self) -> usize {
        self.labels.pixels().filter(|p| p.0[0] == RIDGE_LABEL).count()
    }
}

/// Intermediate products a pipeline run can report to an output sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Threshold,
    Seeded,
    Simplified,
    Gradient,
    Segmentation,
    Cytoplasm,
}
