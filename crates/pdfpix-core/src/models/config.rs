//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{PdfpixError, Result};

/// Extraction profile.
///
/// Each profile is a complete preset of the naming, ordering, filtering and
/// output-directory policies. The two presets are deliberately incompatible:
/// pick one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Tag images with an estimated text line number. Images are taken top to
    /// bottom, the output directory is wiped at start and names are
    /// overwritten on conflict.
    #[default]
    LineEstimate,
    /// Tag images with the dotted heading numbers found on the page. Small
    /// images are dropped, large ones downsampled, and name conflicts get a
    /// `(n)` suffix.
    HeadingPath,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::LineEstimate => f.write_str("line-estimate"),
            Profile::HeadingPath => f.write_str("heading-path"),
        }
    }
}

/// What to do when the target file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Replace the existing file (logged).
    Overwrite,
    /// Append `(1)`, `(2)`, ... until the name is free.
    Suffix,
}

/// Main configuration for a pdfpix run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfpixConfig {
    /// Selected profile.
    pub profile: Profile,

    /// Input discovery.
    pub input: InputConfig,

    /// Position heuristics.
    pub position: PositionConfig,

    /// Image filtering and resizing.
    pub filter: FilterConfig,

    /// Output directory and naming policy.
    pub output: OutputConfig,
}

impl Default for PdfpixConfig {
    fn default() -> Self {
        Self::for_profile(Profile::default())
    }
}

/// Input discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Directory scanned for documents in batch mode.
    pub docs_dir: PathBuf,

    /// File extensions (case-insensitive, without dot) treated as PDFs.
    pub extensions: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("./docs"),
            extensions: vec!["pdf".to_string()],
        }
    }
}

/// Position heuristics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// Approximate height of one text line in page units.
    pub line_height: f32,

    /// Part of the font size drawn above the baseline.
    pub ascent: f32,

    /// Part of the font size drawn below the baseline.
    pub descent: f32,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            line_height: 12.0,
            ascent: 0.8,
            descent: 0.2,
        }
    }
}

/// Image filtering and resizing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Drop images whose width or height is below this many pixels.
    pub min_dimension: Option<u32>,

    /// Downsample so the longer side is at most this fraction of the original.
    pub resize_ratio: Option<f32>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_dimension: None,
            resize_ratio: None,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the `.webp` files.
    pub images_dir: PathBuf,

    /// Remove every regular file in `images_dir` before the run.
    pub clear_on_start: bool,

    /// Name conflict policy.
    pub collision: CollisionPolicy,

    /// Abort the run on the first failed write instead of skipping the image.
    pub abort_on_write_error: bool,

    /// Lossy WebP quality, 0 to 100.
    pub quality: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("./images"),
            clear_on_start: true,
            collision: CollisionPolicy::Overwrite,
            abort_on_write_error: true,
            quality: 80.0,
        }
    }
}

impl PdfpixConfig {
    /// Build the preset for a profile.
    pub fn for_profile(profile: Profile) -> Self {
        let mut config = Self {
            profile,
            input: InputConfig::default(),
            position: PositionConfig::default(),
            filter: FilterConfig::default(),
            output: OutputConfig::default(),
        };
        config.apply_profile(profile);
        config
    }

    /// Switch to another profile, resetting every profile-dependent policy.
    /// Paths and position heuristics are kept.
    pub fn apply_profile(&mut self, profile: Profile) {
        self.profile = profile;
        match profile {
            Profile::LineEstimate => {
                self.filter.min_dimension = None;
                self.filter.resize_ratio = None;
                self.output.clear_on_start = true;
                self.output.collision = CollisionPolicy::Overwrite;
                self.output.abort_on_write_error = true;
            }
            Profile::HeadingPath => {
                self.filter.min_dimension = Some(500);
                self.filter.resize_ratio = Some(0.7);
                self.output.clear_on_start = false;
                self.output.collision = CollisionPolicy::Suffix;
                self.output.abort_on_write_error = false;
            }
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.position.line_height > 0.0) {
            return Err(PdfpixError::Config(format!(
                "line_height must be positive, got {}",
                self.position.line_height
            )));
        }
        if self.position.ascent < 0.0 || self.position.descent < 0.0 {
            return Err(PdfpixError::Config(
                "ascent and descent must not be negative".to_string(),
            ));
        }
        if let Some(ratio) = self.filter.resize_ratio {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(PdfpixError::Config(format!(
                    "resize_ratio must be in (0, 1], got {ratio}"
                )));
            }
        }
        if !(0.0..=100.0).contains(&self.output.quality) {
            return Err(PdfpixError::Config(format!(
                "quality must be in [0, 100], got {}",
                self.output.quality
            )));
        }
        if self.input.extensions.is_empty() {
            return Err(PdfpixError::Config(
                "at least one input extension is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> std::result::Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Parse a (possibly partial) JSON configuration.
    ///
    /// Missing keys are filled from the preset of the profile named in the
    /// document, not from the default profile.
    pub fn from_json_str(content: &str) -> serde_json::Result<Self> {
        let overrides: serde_json::Value = serde_json::from_str(content)?;
        let profile = match overrides.get("profile") {
            Some(value) => serde_json::from_value(value.clone())?,
            None => Profile::default(),
        };
        let mut merged = serde_json::to_value(Self::for_profile(profile))?;
        merge_json(&mut merged, overrides);
        serde_json::from_value(merged)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

fn merge_json(base: &mut serde_json::Value, overrides: serde_json::Value) {
    match (base, overrides) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_line_estimate_preset() {
        let config = PdfpixConfig::for_profile(Profile::LineEstimate);
        assert!(config.output.clear_on_start);
        assert_eq!(config.output.collision, CollisionPolicy::Overwrite);
        assert_eq!(config.filter.min_dimension, None);
        assert_eq!(config.filter.resize_ratio, None);
    }

    #[test]
    fn test_heading_path_preset() {
        let config = PdfpixConfig::for_profile(Profile::HeadingPath);
        assert!(!config.output.clear_on_start);
        assert_eq!(config.output.collision, CollisionPolicy::Suffix);
        assert_eq!(config.filter.min_dimension, Some(500));
        assert_eq!(config.filter.resize_ratio, Some(0.7));
        assert!(!config.output.abort_on_write_error);
    }

    #[test]
    fn test_apply_profile_keeps_paths() {
        let mut config = PdfpixConfig::default();
        config.output.images_dir = PathBuf::from("/tmp/out");
        config.position.line_height = 14.0;
        config.apply_profile(Profile::HeadingPath);
        assert_eq!(config.output.images_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.position.line_height, 14.0);
        assert_eq!(config.profile, Profile::HeadingPath);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PdfpixConfig::default();
        config.position.line_height = 0.0;
        assert!(config.validate().is_err());

        let mut config = PdfpixConfig::default();
        config.filter.resize_ratio = Some(1.5);
        assert!(config.validate().is_err());

        let mut config = PdfpixConfig::default();
        config.input.extensions.clear();
        assert!(config.validate().is_err());

        let mut config = PdfpixConfig::default();
        config.output.quality = 120.0;
        assert!(config.validate().is_err());

        assert!(PdfpixConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_named_profile_preset() {
        let json = r#"{ "profile": "heading-path", "position": { "line_height": 10.0 } }"#;
        let config = PdfpixConfig::from_json_str(json).unwrap();
        assert_eq!(config.profile, Profile::HeadingPath);
        assert_eq!(config.position.line_height, 10.0);
        assert_eq!(config.position.ascent, 0.8);
        assert_eq!(config.filter.min_dimension, Some(500));
        assert_eq!(config.output.collision, CollisionPolicy::Suffix);
        assert_eq!(config.input.docs_dir, PathBuf::from("./docs"));
    }

    #[test]
    fn test_explicit_values_override_preset() {
        let json = r#"{ "profile": "heading-path", "filter": { "min_dimension": null } }"#;
        let config = PdfpixConfig::from_json_str(json).unwrap();
        assert_eq!(config.filter.min_dimension, None);
        assert_eq!(config.filter.resize_ratio, Some(0.7));
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = PdfpixConfig::from_json_str("{}").unwrap();
        assert_eq!(config.profile, Profile::LineEstimate);
        assert!(config.output.clear_on_start);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = PdfpixConfig::for_profile(Profile::HeadingPath);
        config.save(&path).unwrap();

        let loaded = PdfpixConfig::from_file(&path).unwrap();
        assert_eq!(loaded.profile, Profile::HeadingPath);
        assert_eq!(loaded.output.collision, CollisionPolicy::Suffix);
    }
}
