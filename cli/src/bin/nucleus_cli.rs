use clap::{Parser, Subcommand};
use cli::{check_output_path, DirectorySink};
use color_eyre::eyre::Result;
use image::GrayImage;
use nucleus::{
    GradientStrategy, NullSink, OutputSink, Pipeline, SegmentationCommand, SegmentationConfig, SegmentationOutcome,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Optional TOML or JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simplify an image with the scale-space toggle operator
    Simplify {
        /// Path to the input image
        #[arg(short, long)]
        input: PathBuf,
        /// Path of the simplified image
        #[arg(short, long)]
        output: PathBuf,
        /// Overrides the configured toggle iterations
        #[arg(long)]
        iterations: Option<u32>,
    },
    /// Segment nuclei and write the colorized result
    Segment {
        /// Path to the input image
        #[arg(short, long)]
        input: PathBuf,
        /// Path of the colorized segmentation
        #[arg(short, long)]
        output: PathBuf,
        /// Directory receiving every intermediate stage as PNG
        #[arg(long)]
        stages_dir: Option<PathBuf>,
        /// Fixed seed for region colors
        #[arg(long)]
        color_seed: Option<u64>,
        /// Edge map feeding the watershed: morphological or derivative
        #[arg(long)]
        gradient: Option<GradientStrategy>,
    },
    /// Mask whole cells
    Cytoplasm {
        /// Path to the input image
        #[arg(short, long)]
        input: PathBuf,
        /// Path of the binary cell mask
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print JSON schemas of the configuration file and the command set
    Schema,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Simplify { input, output, iterations } => {
            if let Some(iterations) = iterations {
                config.toggle_iterations = *iterations;
            }
            simplify(&config, input, output)?;
        }
        Commands::Segment { input, output, stages_dir, color_seed, gradient } => {
            if color_seed.is_some() {
                config.color_seed = *color_seed;
            }
            if let Some(gradient) = gradient {
                config.gradient_strategy = *gradient;
            }
            segment(&config, input, output, stages_dir.as_deref())?;
        }
        Commands::Cytoplasm { input, output } => {
            cytoplasm(&config, input, output)?;
        }
        Commands::Schema => {
            let schemas = serde_json::json!({
                "config": SegmentationConfig::schema(),
                "commands": SegmentationCommand::schema(),
            });
            println!("{}", serde_json::to_string_pretty(&schemas)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SegmentationConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Ok(SegmentationConfig::from_file(path)?)
        }
        None => Ok(SegmentationConfig::default()),
    }
}

fn load_gray(path: &Path) -> Result<GrayImage> {
    let image = image::open(path)?.to_luma8();
    info!("Loaded {:?} ({}x{})", path, image.width(), image.height());
    Ok(image)
}

fn simplify(config: &SegmentationConfig, input: &Path, output: &Path) -> Result<()> {
    check_output_path(output)?;
    let pipeline = Pipeline::from_config(config)?;
    let simplified = pipeline.simplify(&load_gray(input)?)?;
    simplified.save(output)?;
    info!("Simplified image written to {:?}", output);
    Ok(())
}

fn segment(config: &SegmentationConfig, input: &Path, output: &Path, stages_dir: Option<&Path>) -> Result<()> {
    check_output_path(output)?;
    let pipeline = Pipeline::from_config(config)?;
    let image = load_gray(input)?;

    let mut sink: Box<dyn OutputSink> = match stages_dir {
        Some(dir) => Box::new(DirectorySink::new(dir)?),
        None => Box::new(NullSink),
    };
    let result = pipeline.segment_nuclei_with_sink(&image, sink.as_mut())?;

    if result.outcome == SegmentationOutcome::EmptyMask {
        warn!("No nucleus candidates found in {:?}", input);
    }
    result.image.save(output)?;
    info!(
        "Segmented {} component(s), {} ridge pixel(s) -> {:?}",
        result.component_count,
        result.ridge_pixel_count(),
        output
    );
    Ok(())
}

fn cytoplasm(config: &SegmentationConfig, input: &Path, output: &Path) -> Result<()> {
    check_output_path(output)?;
    let pipeline = Pipeline::from_config(config)?;
    let mask = pipeline.segment_cytoplasm(&load_gray(input)?)?;
    mask.save(output)?;
    info!("Cytoplasm mask written to {:?}", output);
    Ok(())
}
