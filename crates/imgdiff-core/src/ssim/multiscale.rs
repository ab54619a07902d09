//! Multi-scale SSIM over a 2×2 pooling pyramid, with the full term at the
//! finest scale and contrast-structure at the coarser ones.

use tracing::debug;

use super::{Components, direct};
use crate::luma::{Plane, pool2};
use crate::options::SsimOptions;
use crate::score::{SimilarityResult, mean};

/// Per-scale exponents, finest first.
pub(crate) const SCALE_WEIGHTS: [f64; 5] = [0.0448, 0.2856, 0.3001, 0.2363, 0.1333];

/// Full SSIM at the finest scale, contrast-structure at every coarser one.
/// Scales that no longer fit the window are dropped and the remaining
/// exponents renormalized.
pub(crate) fn ssim(
    x: Plane,
    y: Plane,
    options: &SsimOptions,
    c1: f64,
    c2: f64,
    keep_map: bool,
) -> SimilarityResult {
    let window = options.window_size.min(x.width).min(x.height);

    let mut levels: Vec<Components> = Vec::with_capacity(SCALE_WEIGHTS.len());
    let (mut x, mut y) = (x, y);
    for scale in 0..SCALE_WEIGHTS.len() {
        if x.width < window || x.height < window {
            break;
        }
        levels.push(direct::components(&x, &y, options.window, window, c1, c2));
        if scale + 1 < SCALE_WEIGHTS.len() {
            x = pool2(&x);
            y = pool2(&y);
        }
    }
    debug!(scales = levels.len(), window, "computing ms-ssim");

    let used = &SCALE_WEIGHTS[..levels.len()];
    let total: f64 = used.iter().sum();
    let finest = levels[0].ssim_map();

    let mut score = 1.0;
    for (i, (level, weight)) in levels.iter().zip(used).enumerate() {
        let term = if i == 0 {
            finest.mean()
        } else {
            mean(&level.contrast_structure)
        };
        score *= term.max(0.0).powf(weight / total);
    }

    SimilarityResult {
        score,
        map: keep_map.then_some(finest),
    }
}
