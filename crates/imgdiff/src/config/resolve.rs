use std::sync::Arc;

use anyhow::{Context, Result};
use imgdiff_core::{
    ComparisonOptions, DiffEngine, Downsample, GmsdEngine, GmsdOptions, Metric, PixelEngine,
    SsimEngine, SsimOptions, SsimVariant,
};

use super::{Config, load, validate_quality, validate_threshold};
use crate::io::Encoding;

fn parse_threshold(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    validate_threshold(v)
}

fn parse_alpha(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !(0.0..=1.0).contains(&v) {
        return Err(format!("alpha must be between 0.0 and 1.0, got {v}"));
    }
    Ok(v)
}

/// Comparison flags shared by every subcommand that diffs images.
///
/// `None` and `false` mean "not given"; the file or env layer decides.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct CompareArgs {
    /// Engine to run: pixel, ssim or gmsd
    #[arg(long)]
    pub metric: Option<Metric>,

    /// Per-pixel color tolerance (0.0–1.0, 0.0 = exact)
    #[arg(long, value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    /// Detect anti-aliased pixels and ignore them
    #[arg(long)]
    pub antialiasing: bool,

    /// Count anti-aliased pixels as differences
    #[arg(long)]
    pub include_aa: bool,

    /// Opacity of the faded original behind the diff (0.0–1.0)
    #[arg(long, value_parser = parse_alpha)]
    pub alpha: Option<f64>,

    /// Paint differences on a transparent canvas
    #[arg(long)]
    pub diff_mask: bool,

    /// Fail on size changes instead of padding both images
    #[arg(long)]
    pub fail_on_layout: bool,

    /// PNG compression level for written diffs (0–9)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=9))]
    pub compression: Option<u8>,

    /// JPEG quality for `.jpg` diff output (1–100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// SSIM window side length
    #[arg(long)]
    pub window_size: Option<usize>,

    /// SSIM prescaling: original or fast
    #[arg(long)]
    pub downsample: Option<Downsample>,

    /// SSIM variant: direct, integral or multi-scale
    #[arg(long)]
    pub variant: Option<SsimVariant>,

    /// Concurrent comparisons
    #[arg(long, short = 'j')]
    pub workers: Option<usize>,
}

/// Environment overrides (`IMGDIFF_*`).
#[derive(Debug, Default)]
pub struct EnvLayer {
    pub threshold: Option<f64>,
    pub metric: Option<Metric>,
}

impl EnvLayer {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let threshold = get("IMGDIFF_THRESHOLD")
            .map(|v| v.parse::<f64>())
            .transpose()
            .context("IMGDIFF_THRESHOLD must be a valid float")?;
        let metric = get("IMGDIFF_METRIC")
            .map(|v| v.parse::<Metric>())
            .transpose()
            .map_err(|e| anyhow::anyhow!("IMGDIFF_METRIC: {e}"))?;
        Ok(Self { threshold, metric })
    }
}

/// Fully resolved settings after the CLI > env > file > defaults merge.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub metric: Metric,
    pub pixel: ComparisonOptions,
    pub ssim: SsimOptions,
    pub min_score: f64,
    pub gmsd: GmsdOptions,
    pub max_score: f64,
    pub quality: u8,
    pub workers: usize,
}

impl ResolvedConfig {
    /// Read `.imgdiff/config.toml` and the environment, then apply `cli`.
    pub fn new(cli: &CompareArgs) -> Result<Self> {
        let file = load()?;
        let env = EnvLayer::from_env()?;
        Self::resolve(file, env, cli)
    }

    pub fn resolve(file: Config, env: EnvLayer, cli: &CompareArgs) -> Result<Self> {
        let metric = cli.metric.or(env.metric).unwrap_or(file.diff.metric);

        let mut pixel = file.diff.options;
        pixel.threshold = cli.threshold.or(env.threshold).unwrap_or(pixel.threshold);
        validate_threshold(pixel.threshold).map_err(|e| anyhow::anyhow!("{e}"))?;
        pixel.antialiasing |= cli.antialiasing;
        pixel.include_aa |= cli.include_aa;
        pixel.diff_mask |= cli.diff_mask;
        pixel.fail_on_layout_diff |= cli.fail_on_layout;
        if let Some(alpha) = cli.alpha {
            pixel.alpha = alpha;
        }
        if let Some(level) = cli.compression {
            pixel.compression = level;
        }
        pixel.validate().context("Invalid comparison options")?;
        let quality = validate_quality(cli.quality.unwrap_or(file.diff.quality))
            .map_err(|e| anyhow::anyhow!(e))?;

        let mut ssim = file.ssim.options;
        if let Some(size) = cli.window_size {
            ssim.window_size = size;
        }
        if let Some(downsample) = cli.downsample {
            ssim.downsample = downsample;
        }
        if let Some(variant) = cli.variant {
            ssim.variant = variant;
        }
        ssim.validate().context("Invalid SSIM options")?;

        let workers = cli
            .workers
            .or(file.pool.workers)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(4, |n| n.get()))
            .max(1);

        Ok(Self {
            metric,
            pixel,
            ssim,
            min_score: file.ssim.min_score,
            gmsd: file.gmsd.options,
            max_score: file.gmsd.max_score,
            quality,
            workers,
        })
    }

    /// Force the metric, as the `ssim` and `gmsd` subcommands do.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Encoder settings for diff images written to disk.
    pub fn encoding(&self) -> Encoding {
        Encoding {
            compression: self.pixel.compression,
            quality: self.quality,
        }
    }

    pub fn engine(&self) -> Arc<dyn DiffEngine> {
        match self.metric {
            Metric::Pixel => Arc::new(PixelEngine {
                options: self.pixel.clone(),
            }),
            Metric::Ssim => Arc::new(SsimEngine {
                options: self.ssim.clone(),
                min_score: self.min_score,
            }),
            Metric::Gmsd => Arc::new(GmsdEngine {
                options: self.gmsd.clone(),
                max_score: self.max_score,
            }),
        }
    }
}
