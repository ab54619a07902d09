//! Diff image rendering.
//!
//! The pixel engine drives a [`PixelSink`] while it scans; `Discard` makes
//! the no-output case free, `Painter` writes the diff image as it goes.

use crate::error::{DiffError, Result};
use crate::image::{CHANNELS, ImageRef};
use crate::options::{ComparisonOptions, MapStyle};
use crate::pixel::PixelClassification;
use crate::score::ScoreMap;
use crate::yiq::{YIQ_Y, luma_delta};

pub(crate) fn check_output(output: &[u8], expected: usize) -> Result<()> {
    if output.len() != expected {
        return Err(DiffError::InvalidBuffer {
            expected,
            actual: output.len(),
        });
    }
    Ok(())
}

/// Receives the classification of every pixel the engine visits.
pub(crate) trait PixelSink {
    fn unchanged(&mut self, image: ImageRef<'_>, index: usize);

    /// `brighter` is true when the first image is brighter at this pixel.
    fn changed(&mut self, index: usize, brighter: bool);

    fn antialiased(&mut self, index: usize);

    /// Whole block with nothing above threshold.
    fn unchanged_block(&mut self, image: ImageRef<'_>, x0: u32, y0: u32, x1: u32, y1: u32) {
        let width = image.width() as usize;
        for y in y0 as usize..y1 as usize {
            for x in x0 as usize..x1 as usize {
                self.unchanged(image, y * width + x);
            }
        }
    }
}

/// Sink for callers that only want the count.
pub(crate) struct Discard;

impl PixelSink for Discard {
    #[inline(always)]
    fn unchanged(&mut self, _: ImageRef<'_>, _: usize) {}

    #[inline(always)]
    fn changed(&mut self, _: usize, _: bool) {}

    #[inline(always)]
    fn antialiased(&mut self, _: usize) {}

    #[inline(always)]
    fn unchanged_block(&mut self, _: ImageRef<'_>, _: u32, _: u32, _: u32, _: u32) {}
}

/// Writes the diff image.
pub(crate) struct Painter<'o> {
    out: &'o mut [u8],
    diff_mask: bool,
    alpha: f64,
    diff_color: [u8; 3],
    diff_color_alt: [u8; 3],
    aa_color: [u8; 3],
}

impl<'o> Painter<'o> {
    /// In mask mode the buffer is cleared up front so untouched pixels stay
    /// transparent.
    pub(crate) fn new(out: &'o mut [u8], options: &ComparisonOptions) -> Self {
        if options.diff_mask {
            out.fill(0);
        }
        Self {
            out,
            diff_mask: options.diff_mask,
            alpha: options.alpha,
            diff_color: options.diff_color,
            diff_color_alt: options.diff_color_alt(),
            aa_color: options.aa_color,
        }
    }

    #[inline(always)]
    fn put(&mut self, index: usize, rgb: [u8; 3]) {
        let p = index * CHANNELS;
        self.out[p..p + CHANNELS].copy_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
    }
}

impl PixelSink for Painter<'_> {
    #[inline]
    fn unchanged(&mut self, image: ImageRef<'_>, index: usize) {
        if !self.diff_mask {
            let g = faded_gray(image.pixel(index), self.alpha);
            self.put(index, [g, g, g]);
        }
    }

    #[inline]
    fn changed(&mut self, index: usize, brighter: bool) {
        let color = if brighter {
            self.diff_color_alt
        } else {
            self.diff_color
        };
        self.put(index, color);
    }

    #[inline]
    fn antialiased(&mut self, index: usize) {
        self.put(index, self.aa_color);
    }
}

/// Luma of `pixel` blended toward white by `alpha` and the pixel's own
/// opacity.
#[inline]
pub fn faded_gray(pixel: u32, alpha: f64) -> u8 {
    let [r, g, b, a] = pixel.to_le_bytes();
    let luma = f64::from(r) * YIQ_Y[0] + f64::from(g) * YIQ_Y[1] + f64::from(b) * YIQ_Y[2];
    let value = 255.0 + (luma - 255.0) * alpha * f64::from(a) / 255.0;
    value.clamp(0.0, 255.0) as u8
}

/// Paint a classification array produced by
/// [`classify_pixels`](crate::pixel::classify_pixels).
///
/// `a` and `b` are needed to pick `diff_color_alt` for pixels where the
/// first image is brighter and to draw the faded background.
pub fn render_classification(
    classes: &[PixelClassification],
    a: ImageRef<'_>,
    b: ImageRef<'_>,
    output: &mut [u8],
    options: &ComparisonOptions,
) -> Result<()> {
    check_output(output, a.data().len())?;
    if classes.len() != a.pixel_count() {
        return Err(DiffError::InvalidBuffer {
            expected: a.pixel_count(),
            actual: classes.len(),
        });
    }

    let mut painter = Painter::new(output, options);
    for (index, class) in classes.iter().enumerate() {
        match class {
            PixelClassification::Identical => painter.unchanged(a, index),
            PixelClassification::Changed => {
                let brighter = luma_delta(a.pixel(index), b.pixel(index)) > 0.0;
                painter.changed(index, brighter);
            }
            PixelClassification::Antialiased => painter.antialiased(index),
        }
    }
    Ok(())
}

/// Scale `map` to `width x height` by nearest lookup and paint it.
/// Values are clamped to `[0, 1]`; 1 means similar.
pub fn render_score_map(
    map: &ScoreMap,
    output: &mut [u8],
    width: u32,
    height: u32,
    style: MapStyle,
) -> Result<()> {
    let (w, h) = (width as usize, height as usize);
    check_output(output, w * h * CHANNELS)?;
    if map.width == 0 || map.height == 0 {
        return Err(DiffError::InvalidOption("score map is empty".to_string()));
    }

    for y in 0..h {
        let my = (y * map.height / h).min(map.height - 1);
        for x in 0..w {
            let mx = (x * map.width / w).min(map.width - 1);
            let v = map.get(mx, my);
            let rgba = score_color(if v.is_finite() { v } else { 0.0 }, style);
            let p = (y * w + x) * CHANNELS;
            output[p..p + CHANNELS].copy_from_slice(&rgba);
        }
    }
    Ok(())
}

fn score_color(v: f64, style: MapStyle) -> [u8; 4] {
    let v = v.clamp(0.0, 1.0);
    match style {
        MapStyle::Grayscale => {
            let g = (v * 255.0).round() as u8;
            [g, g, g, 255]
        }
        MapStyle::Heatmap => {
            let t = 1.0 - v;
            let r = (t * 255.0).round() as u8;
            let b = (v * 255.0).round() as u8;
            [r, 0, b, 255]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Image, pack_rgba};

    #[test]
    fn faded_white_stays_white() {
        assert_eq!(faded_gray(pack_rgba(255, 255, 255, 255), 0.1), 255);
    }

    #[test]
    fn faded_black_is_light_gray() {
        // 255 - 255 * 0.1 = 229.5
        assert_eq!(faded_gray(pack_rgba(0, 0, 0, 255), 0.1), 229);
        assert_eq!(faded_gray(pack_rgba(0, 0, 0, 255), 1.0), 0);
    }

    #[test]
    fn transparent_pixels_fade_to_white() {
        assert_eq!(faded_gray(pack_rgba(0, 0, 0, 0), 1.0), 255);
    }

    #[test]
    fn mask_painter_clears_buffer() {
        let mut out = vec![7u8; 16];
        let opts = ComparisonOptions {
            diff_mask: true,
            ..Default::default()
        };
        let img = Image::new(2, 2).unwrap();
        let mut painter = Painter::new(&mut out, &opts);
        painter.unchanged(img.as_view(), 0);
        painter.antialiased(1);
        painter.changed(2, false);
        assert_eq!(&out[0..4], &[0; 4]);
        assert_eq!(&out[4..8], &[255, 255, 0, 255]);
        assert_eq!(&out[8..12], &[255, 0, 0, 255]);
        assert_eq!(&out[12..16], &[0; 4]);
    }

    #[test]
    fn brighter_pixels_use_alt_color() {
        let mut out = vec![0u8; 8];
        let opts = ComparisonOptions {
            diff_color_alt: Some([0, 255, 0]),
            ..Default::default()
        };
        let mut painter = Painter::new(&mut out, &opts);
        painter.changed(0, true);
        painter.changed(1, false);
        assert_eq!(&out[0..4], &[0, 255, 0, 255]);
        assert_eq!(&out[4..8], &[255, 0, 0, 255]);
    }

    #[test]
    fn score_map_scales_to_output() {
        let map = ScoreMap::new(2, 1, vec![1.0, 0.0]);
        let mut out = vec![0u8; 4 * 4 * 4];
        render_score_map(&map, &mut out, 4, 4, MapStyle::Grayscale).unwrap();
        assert_eq!(&out[0..4], &[255, 255, 255, 255]);
        assert_eq!(&out[12..16], &[0, 0, 0, 255]);
    }

    #[test]
    fn heatmap_runs_blue_to_red() {
        assert_eq!(score_color(1.0, MapStyle::Heatmap), [0, 0, 255, 255]);
        assert_eq!(score_color(0.0, MapStyle::Heatmap), [255, 0, 0, 255]);
        assert_eq!(score_color(-0.3, MapStyle::Grayscale), [0, 0, 0, 255]);
    }

    #[test]
    fn wrong_output_size_rejected() {
        let map = ScoreMap::new(1, 1, vec![1.0]);
        let mut out = vec![0u8; 3];
        assert!(render_score_map(&map, &mut out, 1, 1, MapStyle::Grayscale).is_err());
    }
}
