//! Luminance planes shared by the SSIM and GMSD engines.

use crate::image::ImageRef;

const LUMA: [f64; 3] = [0.29894, 0.58704, 0.11402];

/// Row-major single-channel float image.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl Plane {
    pub fn new(width: usize, height: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    #[inline(always)]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }
}

/// Luminance of every pixel, composited over white by alpha.
pub(crate) fn luminance(image: ImageRef<'_>) -> Plane {
    let data = image
        .data()
        .chunks_exact(4)
        .map(|px| {
            let a = f64::from(px[3]) / 255.0;
            let blend = |c: u8| 255.0 + (f64::from(c) - 255.0) * a;
            LUMA[0] * blend(px[0]) + LUMA[1] * blend(px[1]) + LUMA[2] * blend(px[2])
        })
        .collect();
    Plane::new(image.width() as usize, image.height() as usize, data)
}

/// Scale factor used to bring the short side near 256 pixels.
pub(crate) fn downsample_factor(width: usize, height: usize) -> usize {
    ((width.min(height) as f64 / 256.0).round() as usize).max(1)
}

/// Mirror an out-of-range index back into `0..n`, repeating the edge sample.
#[inline]
fn symmetric(i: isize, n: usize) -> usize {
    let n = n as isize;
    let mut i = i;
    if i < 0 {
        i = -i - 1;
    }
    if i >= n {
        i = 2 * n - i - 1;
    }
    i.clamp(0, n - 1) as usize
}

/// `f x f` box filter with symmetric borders, then keep every `f`-th sample.
pub(crate) fn box_downsample(plane: &Plane, f: usize) -> Plane {
    if f <= 1 {
        return plane.clone();
    }
    let lo = ((f - 1) / 2) as isize;
    let hi = f as isize - 1 - lo;
    let norm = (f * f) as f64;

    let out_w = plane.width.div_ceil(f);
    let out_h = plane.height.div_ceil(f);
    let mut data = Vec::with_capacity(out_w * out_h);
    for oy in 0..out_h {
        let cy = (oy * f) as isize;
        for ox in 0..out_w {
            let cx = (ox * f) as isize;
            let mut sum = 0.0;
            for dy in -lo..=hi {
                let y = symmetric(cy + dy, plane.height);
                for dx in -lo..=hi {
                    sum += plane.get(symmetric(cx + dx, plane.width), y);
                }
            }
            data.push(sum / norm);
        }
    }
    Plane::new(out_w, out_h, data)
}

/// 2x2 average pooling. An odd trailing row or column is dropped; a
/// dimension of 1 is kept.
pub(crate) fn pool2(plane: &Plane) -> Plane {
    let out_w = (plane.width / 2).max(1);
    let out_h = (plane.height / 2).max(1);
    let mut data = Vec::with_capacity(out_w * out_h);
    for oy in 0..out_h {
        for ox in 0..out_w {
            let mut sum = 0.0;
            let mut n = 0.0;
            for y in (2 * oy)..(2 * oy + 2).min(plane.height) {
                for x in (2 * ox)..(2 * ox + 2).min(plane.width) {
                    sum += plane.get(x, y);
                    n += 1.0;
                }
            }
            data.push(sum / n);
        }
    }
    Plane::new(out_w, out_h, data)
}
