use thiserror::Error;

#[derive(Error, Debug)]
pub enum NucleusError {
    #[error("Image error: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("No image loaded")]
    NoImageLoaded,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Pixel ({row}, {col}) out of range for {width}x{height} image")]
    OutOfRange {
        row: u32,
        col: u32,
        width: u32,
        height: u32,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NucleusError>;
