//! Uniform-window SSIM from summed-area tables (the "hitchhiker's" method):
//! every window's moments cost four lookups per table.

use super::{Components, WindowStats};
use crate::luma::Plane;

/// `(w + 1) x (h + 1)` inclusive prefix sums with a zero border.
struct SummedArea {
    stride: usize,
    sums: Vec<f64>,
}

impl SummedArea {
    fn build(width: usize, height: usize, value: impl Fn(usize) -> f64) -> Self {
        let stride = width + 1;
        let mut sums = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += value(y * width + x);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self { stride, sums }
    }

    #[inline(always)]
    fn window(&self, x0: usize, y0: usize, size: usize) -> f64 {
        let (x1, y1) = (x0 + size, y0 + size);
        self.sums[y1 * self.stride + x1] - self.sums[y0 * self.stride + x1]
            - self.sums[y1 * self.stride + x0]
            + self.sums[y0 * self.stride + x0]
    }
}

pub(crate) fn components(x: &Plane, y: &Plane, size: usize, c1: f64, c2: f64) -> Components {
    let (w, h) = (x.width, x.height);
    let sa = SummedArea::build(w, h, |i| x.data[i]);
    let sb = SummedArea::build(w, h, |i| y.data[i]);
    let saa = SummedArea::build(w, h, |i| x.data[i] * x.data[i]);
    let sbb = SummedArea::build(w, h, |i| y.data[i] * y.data[i]);
    let sab = SummedArea::build(w, h, |i| x.data[i] * y.data[i]);

    let n = (size * size) as f64;
    let out_w = w - size + 1;
    let out_h = h - size + 1;
    let mut out = Components::with_capacity(out_w, out_h);
    for y0 in 0..out_h {
        for x0 in 0..out_w {
            let mean_a = sa.window(x0, y0, size) / n;
            let mean_b = sb.window(x0, y0, size) / n;
            let stats = WindowStats {
                mean_a,
                mean_b,
                var_a: saa.window(x0, y0, size) / n - mean_a * mean_a,
                var_b: sbb.window(x0, y0, size) / n - mean_b * mean_b,
                covar: sab.window(x0, y0, size) / n - mean_a * mean_b,
            };
            out.push(stats, c1, c2);
        }
    }
    out
}
