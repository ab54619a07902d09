//! YIQ perceptual color delta.
//!
//! Kotsarenko & Ramos, "Measuring perceived color difference using YIQ NTSC
//! transmission color space in mobile applications" (2010).

pub const YIQ_Y: [f64; 3] = [0.29889531, 0.58662247, 0.11448223];
pub const YIQ_I: [f64; 3] = [0.59597799, -0.2741761, -0.32180189];
pub const YIQ_Q: [f64; 3] = [0.21147017, -0.52261711, 0.31114694];
pub const YIQ_WEIGHTS: [f64; 3] = [0.5053, 0.299, 0.1957];

/// Largest delta two 8-bit colors can produce with the weights above.
pub const MAX_YIQ_DELTA: f64 = 35215.0;

/// Squared-delta cutoff for a 0..1 threshold.
#[inline]
pub fn max_delta(threshold: f64) -> f64 {
    MAX_YIQ_DELTA * threshold * threshold
}

/// Composite one channel over white.
#[inline(always)]
fn blend(c: f64, a: f64) -> f64 {
    255.0 + (c - 255.0) * a
}

#[inline(always)]
fn blended_rgb(pixel: u32) -> [f64; 3] {
    let [r, g, b, a] = pixel.to_le_bytes();
    if a == 255 {
        return [f64::from(r), f64::from(g), f64::from(b)];
    }
    let a = f64::from(a) / 255.0;
    [
        blend(f64::from(r), a),
        blend(f64::from(g), a),
        blend(f64::from(b), a),
    ]
}

#[inline(always)]
fn rgb_diff(pixel_a: u32, pixel_b: u32) -> [f64; 3] {
    let a = blended_rgb(pixel_a);
    let b = blended_rgb(pixel_b);
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline(always)]
fn dot(coeffs: &[f64; 3], d: &[f64; 3]) -> f64 {
    d[0] * coeffs[0] + d[1] * coeffs[1] + d[2] * coeffs[2]
}

/// Weighted squared YIQ difference. Negative when `pixel_a` is brighter,
/// which lets the renderer tell lightening from darkening.
#[inline]
pub fn color_delta(pixel_a: u32, pixel_b: u32) -> f64 {
    if pixel_a == pixel_b {
        return 0.0;
    }
    let d = rgb_diff(pixel_a, pixel_b);
    let y = dot(&YIQ_Y, &d);
    let i = dot(&YIQ_I, &d);
    let q = dot(&YIQ_Q, &d);

    let delta = YIQ_WEIGHTS[0] * y * y + YIQ_WEIGHTS[1] * i * i + YIQ_WEIGHTS[2] * q * q;
    if y > 0.0 { -delta } else { delta }
}

/// Signed brightness difference only (the Y component).
#[inline]
pub fn luma_delta(pixel_a: u32, pixel_b: u32) -> f64 {
    if pixel_a == pixel_b {
        return 0.0;
    }
    dot(&YIQ_Y, &rgb_diff(pixel_a, pixel_b))
}

/// Brightness of a pixel composited over white, 0..255.
#[inline]
pub fn luma(pixel: u32) -> f64 {
    dot(&YIQ_Y, &blended_rgb(pixel))
}
