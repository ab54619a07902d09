pub mod resolve;
pub mod template;

use std::path::Path;

use anyhow::{Context, Result};
use imgdiff_core::{ComparisonOptions, GmsdOptions, Metric, SsimOptions};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::io::DEFAULT_JPEG_QUALITY;

pub use self::resolve::{CompareArgs, ResolvedConfig};
pub use self::template::{config_file_exists, write_gitignore, write_template};

pub(crate) const CONFIG_DIR: &str = ".imgdiff";
pub(crate) const CONFIG_FILE: &str = "config.toml";

pub fn validate_threshold(v: f64) -> Result<f64, String> {
    if !(0.0..=1.0).contains(&v) {
        return Err(format!("threshold must be between 0.0 and 1.0, got {v}"));
    }
    Ok(v)
}

/// `[diff]`: metric selection, pixel engine options and output encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    pub metric: Metric,
    #[serde(flatten)]
    pub options: ComparisonOptions,
    /// JPEG quality for `.jpg` diff images (1..100).
    pub quality: u8,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            metric: Metric::default(),
            options: ComparisonOptions::default(),
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

pub fn validate_quality(v: u8) -> Result<u8, String> {
    if !(1..=100).contains(&v) {
        return Err(format!("quality must be between 1 and 100, got {v}"));
    }
    Ok(v)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SsimConfig {
    #[serde(flatten)]
    pub options: SsimOptions,
    /// Lowest SSIM that still passes.
    pub min_score: f64,
}

impl Default for SsimConfig {
    fn default() -> Self {
        Self {
            options: SsimOptions::default(),
            min_score: 0.99,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GmsdConfig {
    #[serde(flatten)]
    pub options: GmsdOptions,
    /// Highest GMSD that still passes.
    pub max_score: f64,
}

impl Default for GmsdConfig {
    fn default() -> Self {
        Self {
            options: GmsdOptions::default(),
            max_score: 0.01,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Concurrent comparisons. Defaults to the available parallelism.
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub diff: DiffConfig,
    pub ssim: SsimConfig,
    pub gmsd: GmsdConfig,
    pub pool: PoolConfig,
}

impl Config {
    /// Validate semantic constraints that serde cannot express.
    fn validate(&self) -> Result<()> {
        self.diff.options.validate().context("Invalid [diff] section")?;
        validate_quality(self.diff.quality)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Invalid [diff] section")?;
        self.ssim.options.validate().context("Invalid [ssim] section")?;
        self.gmsd.options.validate().context("Invalid [gmsd] section")?;
        if self.pool.workers == Some(0) {
            anyhow::bail!("pool.workers must be at least 1");
        }
        Ok(())
    }
}

pub fn parse(content: &str, origin: &Path) -> Result<Config> {
    let config: Config =
        toml::from_str(content).with_context(|| format!("Failed to parse {}", origin.display()))?;
    config.validate()?;
    Ok(config)
}

/// Load `<dir>/config.toml`, falling back to defaults when it is absent.
pub fn load_from(dir: &Path) -> Result<Config> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse(&content, &path)
}

pub fn load() -> Result<Config> {
    load_from(Path::new(CONFIG_DIR))
}

#[cfg(test)]
mod tests {
    use imgdiff_core::{Downsample, SsimVariant};

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse("", Path::new("config.toml")).unwrap();
        assert_eq!(config.diff.metric, Metric::Pixel);
        assert_eq!(config.diff.options.threshold, 0.1);
        assert_eq!(config.ssim.min_score, 0.99);
        assert_eq!(config.diff.quality, 90);
        assert!(config.gmsd.options.downsample);
    }

    #[test]
    fn sections_are_read() {
        let toml = r#"
            [diff]
            metric = "ssim"
            threshold = 0.05
            antialiasing = true
            quality = 75

            [ssim]
            variant = "multi-scale"
            downsample = "fast"
            window_size = 7
            min_score = 0.95

            [gmsd]
            downsample = false

            [pool]
            workers = 3
        "#;
        let config = parse(toml, Path::new("config.toml")).unwrap();
        assert_eq!(config.diff.metric, Metric::Ssim);
        assert_eq!(config.diff.options.threshold, 0.05);
        assert!(config.diff.options.antialiasing);
        assert_eq!(config.diff.quality, 75);
        assert_eq!(config.ssim.options.variant, SsimVariant::MultiScale);
        assert_eq!(config.ssim.options.downsample, Downsample::Fast);
        assert_eq!(config.ssim.options.window_size, 7);
        assert_eq!(config.ssim.min_score, 0.95);
        assert!(!config.gmsd.options.downsample);
        assert_eq!(config.pool.workers, Some(3));
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let err = parse("[diff]\nthreshold = 2.0\n", Path::new("config.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("threshold"));
    }

    #[test]
    fn zero_quality_rejected() {
        let err = parse("[diff]\nquality = 0\n", Path::new("config.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("quality"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_from(dir.path()).unwrap();
        assert_eq!(config.pool.workers, None);
    }

    #[test]
    fn validate_threshold_bounds() {
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert!(validate_threshold(-0.1).is_err());
    }
}
