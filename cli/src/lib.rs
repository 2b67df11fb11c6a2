use std::{
    fs,
    path::{Path, PathBuf},
};

use image::DynamicImage;
use nucleus::{NucleusError, OutputSink, Stage};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Nucleus(#[from] NucleusError),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Unsupported output format for {0}. Please use .png, .jpg or .tif files")]
    UnsupportedOutputFormat(PathBuf),
}

/// Writes every emitted stage as `<stage>.png` into one directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    /// Create the directory if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, CliError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, written: Vec::new() })
    }

    pub fn path_for(&self, stage: Stage) -> PathBuf {
        self.dir.join(format!("{stage}.png"))
    }

    /// Files written so far, in emission order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl OutputSink for DirectorySink {
    fn emit(&mut self, stage: Stage, image: &DynamicImage) -> nucleus::Result<()> {
        let path = self.path_for(stage);
        image.save(&path)?;
        debug!(stage = %stage, path = %path.display(), "wrote stage image");
        self.written.push(path);
        Ok(())
    }
}

/// Reject output paths whose extension the encoder cannot handle
pub fn check_output_path(path: &Path) -> Result<(), CliError> {
    match path.extension().and_then(|ext| ext.to_str()).map(|ext| ext.to_ascii_lowercase()) {
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "tif" | "tiff") => Ok(()),
        _ => Err(CliError::UnsupportedOutputFormat(path.to_path_buf())),
    }
}
