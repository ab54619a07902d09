//! Structural similarity (Wang et al., 2004) over luminance.
//!
//! Three strategies share the same window statistics: [`direct`] recomputes
//! every window, [`integral`] reads uniform windows from summed-area tables,
//! and [`multiscale`] pools the images into a five-level pyramid.

mod direct;
mod integral;
mod multiscale;

use tracing::debug;

use crate::error::Result;
use crate::image::{ImageRef, layout_check};
use crate::luma::{Plane, box_downsample, downsample_factor, luminance, pool2};
use crate::options::{Downsample, SsimOptions, SsimVariant};
use crate::render::{check_output, render_score_map};
use crate::score::{ScoreMap, SimilarityResult, mean};

/// Per-window luminance term and contrast-structure term. SSIM is their
/// product.
pub(crate) struct Components {
    pub width: usize,
    pub height: usize,
    pub luminance: Vec<f64>,
    pub contrast_structure: Vec<f64>,
}

impl Components {
    fn with_capacity(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            luminance: Vec::with_capacity(width * height),
            contrast_structure: Vec::with_capacity(width * height),
        }
    }

    fn push(&mut self, stats: WindowStats, c1: f64, c2: f64) {
        let (l, cs) = stats.terms(c1, c2);
        self.luminance.push(l);
        self.contrast_structure.push(cs);
    }

    pub fn ssim_map(&self) -> ScoreMap {
        let values = self
            .luminance
            .iter()
            .zip(&self.contrast_structure)
            .map(|(l, cs)| l * cs)
            .collect();
        ScoreMap::new(self.width, self.height, values)
    }
}

/// First and second moments of one window pair.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WindowStats {
    pub mean_a: f64,
    pub mean_b: f64,
    pub var_a: f64,
    pub var_b: f64,
    pub covar: f64,
}

impl WindowStats {
    fn terms(self, c1: f64, c2: f64) -> (f64, f64) {
        let l = (2.0 * self.mean_a * self.mean_b + c1)
            / (self.mean_a * self.mean_a + self.mean_b * self.mean_b + c1);
        let cs = (2.0 * self.covar + c2) / (self.var_a + self.var_b + c2);
        (l, cs)
    }
}

fn prescale(plane: Plane, mode: Downsample) -> Plane {
    let f = downsample_factor(plane.width, plane.height);
    match (mode, f) {
        (_, 1) => plane,
        (Downsample::Original, f) => box_downsample(&plane, f),
        (Downsample::Fast, _) => pool2(&plane),
    }
}

/// SSIM score, optionally painting the similarity map into `output`
/// (same size as the inputs).
pub fn ssim(
    a: ImageRef<'_>,
    b: ImageRef<'_>,
    output: Option<&mut [u8]>,
    options: &SsimOptions,
) -> Result<f64> {
    layout_check(a, b)?;
    match output {
        None => Ok(compute(a, b, options, false)?.score),
        Some(out) => {
            check_output(out, a.data().len())?;
            let result = compute(a, b, options, true)?;
            if let Some(map) = &result.map {
                render_score_map(map, out, a.width(), a.height(), options.map_style)?;
            }
            Ok(result.score)
        }
    }
}

/// SSIM score plus the per-window map. For the multi-scale variant the map
/// is the finest scale.
pub fn ssim_map(
    a: ImageRef<'_>,
    b: ImageRef<'_>,
    options: &SsimOptions,
) -> Result<SimilarityResult> {
    layout_check(a, b)?;
    compute(a, b, options, true)
}

fn compute(
    a: ImageRef<'_>,
    b: ImageRef<'_>,
    options: &SsimOptions,
    keep_map: bool,
) -> Result<SimilarityResult> {
    options.validate()?;
    let (c1, c2) = options.constants();
    let (x, y) = (luminance(a), luminance(b));

    if options.variant == SsimVariant::MultiScale {
        return Ok(multiscale::ssim(x, y, options, c1, c2, keep_map));
    }

    let x = prescale(x, options.downsample);
    let y = prescale(y, options.downsample);
    let window = options.window_size.min(x.width).min(x.height);
    debug!(
        variant = %options.variant,
        width = x.width,
        height = x.height,
        window,
        "computing ssim"
    );

    let components = match options.variant {
        SsimVariant::Integral => integral::components(&x, &y, window, c1, c2),
        _ => direct::components(&x, &y, options.window, window, c1, c2),
    };
    let map = components.ssim_map();
    Ok(SimilarityResult {
        score: mean(&map.values),
        map: keep_map.then_some(map),
    })
}
