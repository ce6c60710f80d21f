//! Extraction options shared by `batch` and `process`.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use tracing::debug;

use pdfpix_core::models::config::{PdfpixConfig, Profile};

use super::config::default_config_path;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ProfileArg {
    /// Line numbers from text geometry, overwrite on conflict
    LineEstimate,
    /// Heading paths from page text, size filter, `(n)` suffixes
    HeadingPath,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::LineEstimate => Profile::LineEstimate,
            ProfileArg::HeadingPath => Profile::HeadingPath,
        }
    }
}

/// Output and policy flags.
#[derive(Args, Debug)]
pub struct ExtractOptions {
    /// Output directory for images
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Extraction profile
    #[arg(short, long, value_enum)]
    pub profile: Option<ProfileArg>,

    /// Write summary.csv with one row per image into the output directory
    #[arg(long)]
    pub summary: bool,

    /// Write the full run report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Print per-page diagnostics (text presence, position, image count)
    #[arg(long)]
    pub diagnostics: bool,

    /// Approximate text line height in points
    #[arg(long)]
    pub line_height: Option<f32>,

    /// Drop images narrower or shorter than this many pixels
    #[arg(long)]
    pub min_dimension: Option<u32>,

    /// Downsample large images to this fraction of their longer side
    #[arg(long)]
    pub resize_ratio: Option<f32>,

    /// WebP quality (0-100)
    #[arg(long)]
    pub quality: Option<f32>,
}

impl ExtractOptions {
    /// Build the run configuration.
    ///
    /// The config file (`-c`, or the default location if it exists) comes
    /// first. Without a file the command's default profile applies.
    /// `--profile` replaces the profile presets, the remaining flags override
    /// single values.
    pub fn resolve(&self, config_path: Option<&str>, default_profile: Profile) -> anyhow::Result<PdfpixConfig> {
        let mut config = match load_config(config_path)? {
            Some(config) => config,
            None => PdfpixConfig::for_profile(default_profile),
        };

        if let Some(profile) = self.profile {
            config.apply_profile(profile.into());
        }
        if let Some(dir) = &self.output_dir {
            config.output.images_dir = dir.clone();
        }
        if let Some(line_height) = self.line_height {
            config.position.line_height = line_height;
        }
        if let Some(min) = self.min_dimension {
            config.filter.min_dimension = Some(min);
        }
        if let Some(ratio) = self.resize_ratio {
            config.filter.resize_ratio = Some(ratio);
        }
        if let Some(quality) = self.quality {
            config.output.quality = quality;
        }

        config.validate()?;
        debug!("Using profile {}", config.profile);
        Ok(config)
    }
}

fn load_config(config_path: Option<&str>) -> anyhow::Result<Option<PdfpixConfig>> {
    let path = match config_path {
        Some(path) => PathBuf::from(path),
        None => {
            let path = default_config_path();
            if !path.exists() {
                return Ok(None);
            }
            path
        }
    };
    debug!("Loading configuration from {}", path.display());
    let config = PdfpixConfig::from_file(Path::new(&path))
        .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path.display(), e))?;
    Ok(Some(config))
}
