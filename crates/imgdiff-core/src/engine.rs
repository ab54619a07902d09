use serde::{Deserialize, Serialize};

use crate::error::{DiffError, Result};
use crate::gmsd::gmsd;
use crate::image::ImageRef;
use crate::options::{ComparisonOptions, GmsdOptions, SsimOptions};
use crate::pixel::{Reason, compare_pixels};
use crate::ssim::ssim;

/// Outcome of one engine run, shaped for reports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineReport {
    pub metric: String,
    #[serde(rename = "match")]
    pub is_match: bool,
    pub reason: Reason,
    /// Pixel: fraction of differing pixels. SSIM: similarity. GMSD: deviation.
    /// Absent for layout differences.
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_percentage: Option<f64>,
}

impl EngineReport {
    fn scored(metric: &str, is_match: bool, score: f64) -> Self {
        Self {
            metric: metric.to_string(),
            is_match,
            reason: if is_match {
                Reason::Match
            } else {
                Reason::PixelDiff
            },
            score: Some(score),
            diff_count: None,
            diff_percentage: None,
        }
    }

    fn layout(metric: &str) -> Self {
        Self {
            metric: metric.to_string(),
            is_match: false,
            reason: Reason::LayoutDiff,
            score: None,
            diff_count: None,
            diff_percentage: None,
        }
    }
}

/// A comparison strategy selectable at runtime.
///
/// `output`, when given, must be as long as the input buffers and receives
/// the engine's visualization (diff image or score map).
pub trait DiffEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Report for inputs already known to be equal, shaped like a real run.
    fn identical(&self) -> EngineReport;

    fn compare(
        &self,
        a: ImageRef<'_>,
        b: ImageRef<'_>,
        output: Option<&mut [u8]>,
    ) -> Result<EngineReport>;
}

#[derive(Clone, Debug, Default)]
pub struct PixelEngine {
    pub options: ComparisonOptions,
}

impl DiffEngine for PixelEngine {
    fn name(&self) -> &str {
        "pixel"
    }

    fn identical(&self) -> EngineReport {
        EngineReport {
            metric: self.name().to_string(),
            is_match: true,
            reason: Reason::Match,
            score: Some(0.0),
            diff_count: Some(0),
            diff_percentage: Some(0.0),
        }
    }

    fn compare(
        &self,
        a: ImageRef<'_>,
        b: ImageRef<'_>,
        output: Option<&mut [u8]>,
    ) -> Result<EngineReport> {
        let verdict = compare_pixels(a, b, output, &self.options)?;
        if verdict.reason == Reason::LayoutDiff {
            return Ok(EngineReport::layout(self.name()));
        }
        Ok(EngineReport {
            metric: self.name().to_string(),
            is_match: verdict.is_match,
            reason: verdict.reason,
            score: Some(verdict.diff_percentage / 100.0),
            diff_count: Some(verdict.diff_count),
            diff_percentage: Some(verdict.diff_percentage),
        })
    }
}

#[derive(Clone, Debug)]
pub struct SsimEngine {
    pub options: SsimOptions,
    /// Lowest score that still counts as a match.
    pub min_score: f64,
}

impl Default for SsimEngine {
    fn default() -> Self {
        Self {
            options: SsimOptions::default(),
            min_score: 0.99,
        }
    }
}

impl DiffEngine for SsimEngine {
    fn name(&self) -> &str {
        "ssim"
    }

    fn identical(&self) -> EngineReport {
        EngineReport::scored(self.name(), true, 1.0)
    }

    fn compare(
        &self,
        a: ImageRef<'_>,
        b: ImageRef<'_>,
        output: Option<&mut [u8]>,
    ) -> Result<EngineReport> {
        match ssim(a, b, output, &self.options) {
            Ok(score) => Ok(EngineReport::scored(
                self.name(),
                score >= self.min_score,
                score,
            )),
            Err(DiffError::LayoutMismatch { .. }) => Ok(EngineReport::layout(self.name())),
            Err(e) => Err(e),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GmsdEngine {
    pub options: GmsdOptions,
    /// Highest deviation that still counts as a match.
    pub max_score: f64,
}

impl Default for GmsdEngine {
    fn default() -> Self {
        Self {
            options: GmsdOptions::default(),
            max_score: 0.01,
        }
    }
}

impl DiffEngine for GmsdEngine {
    fn name(&self) -> &str {
        "gmsd"
    }

    fn identical(&self) -> EngineReport {
        EngineReport::scored(self.name(), true, 0.0)
    }

    fn compare(
        &self,
        a: ImageRef<'_>,
        b: ImageRef<'_>,
        output: Option<&mut [u8]>,
    ) -> Result<EngineReport> {
        match gmsd(a, b, output, &self.options) {
            Ok(score) => Ok(EngineReport::scored(
                self.name(),
                score <= self.max_score,
                score,
            )),
            Err(DiffError::LayoutMismatch { .. }) => Ok(EngineReport::layout(self.name())),
            Err(e) => Err(e),
        }
    }
}
