use super::{Components, WindowStats};
use crate::luma::Plane;
use crate::options::WindowShape;

const GAUSSIAN_SIGMA: f64 = 1.5;

/// Normalized `size x size` window weights, row-major.
pub(crate) fn window_weights(shape: WindowShape, size: usize) -> Vec<f64> {
    let profile: Vec<f64> = match shape {
        WindowShape::Uniform => vec![1.0; size],
        WindowShape::Gaussian => {
            let center = (size as f64 - 1.0) / 2.0;
            (0..size)
                .map(|i| {
                    let d = i as f64 - center;
                    (-(d * d) / (2.0 * GAUSSIAN_SIGMA * GAUSSIAN_SIGMA)).exp()
                })
                .collect()
        }
    };
    let mut weights: Vec<f64> = profile
        .iter()
        .flat_map(|wy| profile.iter().map(move |wx| wx * wy))
        .collect();
    let total: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// Weighted statistics for the window whose top-left corner is `(x0, y0)`.
fn window_stats(
    x: &Plane,
    y: &Plane,
    weights: &[f64],
    size: usize,
    x0: usize,
    y0: usize,
) -> WindowStats {
    let (mut sa, mut sb, mut saa, mut sbb, mut sab) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for dy in 0..size {
        let row = (y0 + dy) * x.width + x0;
        let wrow = &weights[dy * size..(dy + 1) * size];
        for (dx, w) in wrow.iter().enumerate() {
            let (pa, pb) = (x.data[row + dx], y.data[row + dx]);
            sa += w * pa;
            sb += w * pb;
            saa += w * pa * pa;
            sbb += w * pb * pb;
            sab += w * pa * pb;
        }
    }
    WindowStats {
        mean_a: sa,
        mean_b: sb,
        var_a: saa - sa * sa,
        var_b: sbb - sb * sb,
        covar: sab - sa * sb,
    }
}

/// Every valid window position, recomputed from scratch.
pub(crate) fn components(
    x: &Plane,
    y: &Plane,
    shape: WindowShape,
    size: usize,
    c1: f64,
    c2: f64,
) -> Components {
    let weights = window_weights(shape, size);
    let out_w = x.width - size + 1;
    let out_h = x.height - size + 1;
    let mut out = Components::with_capacity(out_w, out_h);
    for y0 in 0..out_h {
        for x0 in 0..out_w {
            out.push(window_stats(x, y, &weights, size, x0, y0), c1, c2);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        for shape in [WindowShape::Gaussian, WindowShape::Uniform] {
            let w = window_weights(shape, 11);
            assert_eq!(w.len(), 121);
            assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn gaussian_peaks_at_center() {
        let w = window_weights(WindowShape::Gaussian, 11);
        let center = w[5 * 11 + 5];
        assert!(w.iter().all(|v| *v <= center));
        assert!(w[0] < center / 100.0);
    }

    #[test]
    fn flat_planes_have_zero_variance() {
        let a = Plane::new(4, 4, vec![100.0; 16]);
        let b = Plane::new(4, 4, vec![50.0; 16]);
        let weights = window_weights(WindowShape::Uniform, 3);
        let s = window_stats(&a, &b, &weights, 3, 1, 1);
        assert!((s.mean_a - 100.0).abs() < 1e-9);
        assert!(s.var_a.abs() < 1e-9);
        assert!(s.covar.abs() < 1e-9);
    }
}
