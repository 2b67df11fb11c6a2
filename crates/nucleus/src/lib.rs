//! # Nucleus Segmentation Library
//!
//! Segments white-blood-cell nuclei in grayscale microscopy images. A
//! scale-space toggle operator simplifies the image while keeping edges
//! sharp, and a marker-controlled watershed floods the resulting gradient
//! from seeds found by thresholding.
//!
//! ## Core Features
//!
//! - **Trait-based Architecture**: every stage sits behind a trait and can be swapped
//! - **Pipeline System**: mask, seeds, toggle, gradient and watershed composed by a builder
//! - **Stage Sinks**: observe every intermediate image of a run
//! - **Configuration**: TOML/JSON config files with a generated JSON schema
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nucleus::Pipeline;
//! use image::open;
//!
//! let pipeline = Pipeline::builder()
//!     .with_color_seed(42)
//!     .build();
//!
//! let image = open("smear.png")?.to_luma8();
//! let result = pipeline.segment_nuclei(&image)?;
//! println!("{} nuclei ({})", result.component_count, result.outcome);
//! result.image.save("segmented.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use nucleus::{Pipeline, algorithms::*};
//!
//! let pipeline = Pipeline::builder()
//!     .set_mask_builder(ThresholdAndHoleRepair { threshold: 100, ..Default::default() })
//!     .set_seed_stamper(BorderSeeds { thickness: 3 })
//!     .with_toggle_iterations(10)
//!     .with_gradient_strategy(GradientStrategy::Derivative)
//!     .build();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod buffer;
pub mod traits;
pub mod algorithms;
pub mod config;
pub mod sink;
pub mod pipeline;
pub mod manager;

// Re-exports for convenience
pub use error::{NucleusError, Result};
pub use types::{LabelMap, Segmentation, SegmentationOutcome, Stage, RIDGE_LABEL};
pub use traits::*;
pub use algorithms::*;
pub use config::{CytoplasmConfig, SegmentationConfig};
pub use sink::{MemorySink, NullSink};
pub use pipeline::{Pipeline, builder::PipelineBuilder};
pub use manager::{SegmentationCommand, SegmentationManager, SegmentationOutput};
