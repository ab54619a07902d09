use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DiffError, Result};

/// Options for the pixel engine and the diff renderer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonOptions {
    /// Matching threshold, 0.0 (exact) to 1.0 (anything matches).
    pub threshold: f64,
    /// Detect anti-aliased pixels and classify them separately.
    pub antialiasing: bool,
    /// Count anti-aliased pixels as differences.
    pub include_aa: bool,
    /// Opacity of the original image behind the diff, 0.0 to 1.0.
    pub alpha: f64,
    pub aa_color: [u8; 3],
    pub diff_color: [u8; 3],
    /// Color for pixels where the first image is brighter. Falls back to `diff_color`.
    pub diff_color_alt: Option<[u8; 3]>,
    /// Render differences over a transparent background.
    pub diff_mask: bool,
    /// Report a layout difference instead of padding mismatched images.
    /// The core always short-circuits on mismatched dimensions; this flag
    /// tells collaborators not to fall back to a padded comparison.
    pub fail_on_layout_diff: bool,
    /// Skip the scan when both buffers are byte-identical.
    pub fast_buffer_check: bool,
    /// PNG compression level for the written diff, 0 (fastest) to 9 (smallest).
    pub compression: u8,
}

impl Default for ComparisonOptions {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            antialiasing: false,
            include_aa: false,
            alpha: 0.1,
            aa_color: [255, 255, 0],
            diff_color: [255, 0, 0],
            diff_color_alt: None,
            diff_mask: false,
            fail_on_layout_diff: false,
            fast_buffer_check: true,
            compression: 0,
        }
    }
}

impl ComparisonOptions {
    pub fn validate(&self) -> Result<()> {
        unit_range("threshold", self.threshold)?;
        unit_range("alpha", self.alpha)?;
        if self.compression > 9 {
            return Err(DiffError::InvalidOption(format!(
                "compression must be between 0 and 9, got {}",
                self.compression
            )));
        }
        Ok(())
    }

    pub fn diff_color_alt(&self) -> [u8; 3] {
        self.diff_color_alt.unwrap_or(self.diff_color)
    }
}

fn unit_range(name: &str, v: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&v) {
        return Err(DiffError::InvalidOption(format!(
            "{name} must be between 0.0 and 1.0, got {v}"
        )));
    }
    Ok(())
}

/// Which engine a caller runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    #[default]
    Pixel,
    Ssim,
    Gmsd,
}

/// How a score map is painted into an RGBA buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapStyle {
    #[default]
    Grayscale,
    /// Blue (similar) to red (divergent).
    Heatmap,
}

/// Pre-scaling applied before SSIM.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Downsample {
    /// Box filter plus subsampling by `max(1, round(min(w, h) / 256))`.
    #[default]
    Original,
    /// One 2x2 average pooling whenever `Original` would scale down.
    Fast,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SsimVariant {
    /// Recompute every window from its pixels.
    #[default]
    Direct,
    /// Summed-area tables; uniform windows only.
    Integral,
    /// Five-scale MS-SSIM.
    MultiScale,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowShape {
    /// Circular-symmetric Gaussian, sigma 1.5.
    #[default]
    Gaussian,
    Uniform,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsimOptions {
    pub window_size: usize,
    pub variant: SsimVariant,
    pub window: WindowShape,
    pub downsample: Downsample,
    pub k1: f64,
    pub k2: f64,
    pub map_style: MapStyle,
}

impl Default for SsimOptions {
    fn default() -> Self {
        Self {
            window_size: 11,
            variant: SsimVariant::Direct,
            window: WindowShape::Gaussian,
            downsample: Downsample::Original,
            k1: 0.01,
            k2: 0.03,
            map_style: MapStyle::Grayscale,
        }
    }
}

impl SsimOptions {
    pub fn validate(&self) -> Result<()> {
        if self.window_size < 2 {
            return Err(DiffError::InvalidOption(format!(
                "window_size must be at least 2, got {}",
                self.window_size
            )));
        }
        if !(self.k1 > 0.0 && self.k2 > 0.0) {
            return Err(DiffError::InvalidOption(
                "k1 and k2 must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Stabilization constants for 8-bit luminance.
    pub(crate) fn constants(&self) -> (f64, f64) {
        ((self.k1 * 255.0).powi(2), (self.k2 * 255.0).powi(2))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GmsdOptions {
    /// 2x average pooling before gradients.
    pub downsample: bool,
    /// Stabilization constant for 8-bit luminance.
    pub c: f64,
    pub map_style: MapStyle,
}

impl Default for GmsdOptions {
    fn default() -> Self {
        Self {
            downsample: true,
            c: 170.0,
            map_style: MapStyle::Grayscale,
        }
    }
}

impl GmsdOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.c > 0.0) {
            return Err(DiffError::InvalidOption(format!(
                "c must be positive, got {}",
                self.c
            )));
        }
        Ok(())
    }
}

macro_rules! kebab_enum {
    ($ty:ty { $($name:literal => $variant:path),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(format!(
                        "unknown value '{other}', expected one of: {}",
                        [$($name),+].join(", ")
                    )),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($variant => f.write_str($name),)+
                }
            }
        }
    };
}

kebab_enum!(Metric {
    "pixel" => Metric::Pixel,
    "ssim" => Metric::Ssim,
    "gmsd" => Metric::Gmsd,
});

kebab_enum!(Downsample {
    "original" => Downsample::Original,
    "fast" => Downsample::Fast,
});

kebab_enum!(SsimVariant {
    "direct" => SsimVariant::Direct,
    "integral" => SsimVariant::Integral,
    "multi-scale" => SsimVariant::MultiScale,
});

kebab_enum!(WindowShape {
    "gaussian" => WindowShape::Gaussian,
    "uniform" => WindowShape::Uniform,
});

kebab_enum!(MapStyle {
    "grayscale" => MapStyle::Grayscale,
    "heatmap" => MapStyle::Heatmap,
});
