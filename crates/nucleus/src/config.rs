use std::{fs, path::Path};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    algorithms::{
        GradientStrategy, DEFAULT_BORDER_THICKNESS, DEFAULT_CYTOPLASM_KERNEL,
        DEFAULT_CYTOPLASM_THRESHOLD, DEFAULT_FLOOD_TOLERANCE, DEFAULT_GRADIENT_ITERATIONS,
        DEFAULT_THRESHOLD, DEFAULT_TOGGLE_ITERATIONS,
    },
    error::{NucleusError, Result},
};

/// Tunables of every pipeline variant
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Dilation/erosion repetitions of the scale-space toggle
    pub toggle_iterations: u32,
    pub gradient_strategy: GradientStrategy,
    /// Dilation/erosion repetitions of the morphological gradient
    #[schemars(range(min = 1))]
    pub gradient_iterations: u32,
    /// Pixels darker than this become nucleus candidates
    pub threshold_value: u8,
    /// Width of the foreground frame stamped along the image border; at least
    /// 2 so the frame survives the watershed's one-pixel ridge
    #[schemars(range(min = 2))]
    pub border_seed_thickness: u32,
    /// Background pixel (x, y) the hole-repair flood fill starts from
    pub hole_fill_seed: [u32; 2],
    /// Intensity tolerance of the hole-repair flood fill
    pub flood_tolerance: u8,
    /// Fixed seed for region colors; omit for fresh colors every run
    pub color_seed: Option<u64>,
    pub cytoplasm: CytoplasmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct CytoplasmConfig {
    pub threshold_value: u8,
    /// Diameter of the elliptical opening element (odd)
    pub kernel_size: u32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            toggle_iterations: DEFAULT_TOGGLE_ITERATIONS,
            gradient_strategy: GradientStrategy::default(),
            gradient_iterations: DEFAULT_GRADIENT_ITERATIONS,
            threshold_value: DEFAULT_THRESHOLD,
            border_seed_thickness: DEFAULT_BORDER_THICKNESS,
            hole_fill_seed: [0, 0],
            flood_tolerance: DEFAULT_FLOOD_TOLERANCE,
            color_seed: None,
            cytoplasm: CytoplasmConfig::default(),
        }
    }
}

impl Default for CytoplasmConfig {
    fn default() -> Self {
        Self {
            threshold_value: DEFAULT_CYTOPLASM_THRESHOLD,
            kernel_size: DEFAULT_CYTOPLASM_KERNEL,
        }
    }
}

impl SegmentationConfig {
    /// Load from a `.toml` or `.json` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content)?,
            Some("json") => Self::from_json(&content)?,
            _ => {
                return Err(NucleusError::Configuration(format!(
                    "unsupported config format for {}, use .toml or .json",
                    path.display()
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// JSON schema of the configuration file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SegmentationConfig)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gradient_iterations == 0 {
            return Err(NucleusError::Configuration(
                "gradient_iterations must be at least 1".to_string(),
            ));
        }
        if self.border_seed_thickness < 2 {
            return Err(NucleusError::Configuration(format!(
                "border_seed_thickness must be at least 2, got {}",
                self.border_seed_thickness
            )));
        }
        let kernel = self.cytoplasm.kernel_size;
        if kernel == 0 || kernel % 2 == 0 {
            return Err(NucleusError::Configuration(format!(
                "cytoplasm kernel_size must be positive and odd, got {kernel}"
            )));
        }
        Ok(())
    }
}
