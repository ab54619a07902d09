//! Perceptual pixel comparison.
//!
//! Two passes over square blocks: a cold pass finds blocks with at least one
//! pixel over the threshold and paints the rest as background; the hot pass
//! classifies every pixel of the flagged blocks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::antialiasing::is_antialiased;
use crate::error::{DiffError, Result};
use crate::image::{CHANNELS, ImageRef};
use crate::options::ComparisonOptions;
use crate::render::{Discard, Painter, PixelSink, check_output};
use crate::yiq::{color_delta, max_delta};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    Match,
    PixelDiff,
    LayoutDiff,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelClassification {
    /// Equal, or within threshold.
    Identical,
    Changed,
    Antialiased,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonVerdict {
    #[serde(rename = "match")]
    pub is_match: bool,
    pub reason: Reason,
    pub diff_count: u32,
    pub diff_percentage: f64,
    pub antialiased_count: u32,
}

impl ComparisonVerdict {
    fn layout() -> Self {
        Self {
            is_match: false,
            reason: Reason::LayoutDiff,
            diff_count: 0,
            diff_percentage: 0.0,
            antialiased_count: 0,
        }
    }

    fn from_counts(diff_count: u32, antialiased_count: u32, total: usize) -> Self {
        let diff_percentage = if total == 0 {
            0.0
        } else {
            f64::from(diff_count) / total as f64 * 100.0
        };
        Self {
            is_match: diff_count == 0,
            reason: if diff_count == 0 {
                Reason::Match
            } else {
                Reason::PixelDiff
            },
            diff_count,
            diff_percentage,
            antialiased_count,
        }
    }
}

/// Block edge for the cold pass: a power of two in `[8, 128]` that grows
/// with the fourth root of the area.
pub(crate) fn block_size(width: u32, height: u32) -> u32 {
    let area = f64::from(width) * f64::from(height);
    let raw = 16.0 * (area.sqrt() / 100.0).sqrt();
    let exp = raw.log2().round().clamp(3.0, 7.0) as u32;
    1 << exp
}

/// Compare two images pixel by pixel.
///
/// Mismatched dimensions return a `LayoutDiff` verdict without reading any
/// pixel. When `output` is given it must be as long as the input buffers and
/// receives the rendered diff.
pub fn compare_pixels(
    a: ImageRef<'_>,
    b: ImageRef<'_>,
    output: Option<&mut [u8]>,
    options: &ComparisonOptions,
) -> Result<ComparisonVerdict> {
    if a.dimensions() != b.dimensions() {
        debug!(
            left = ?a.dimensions(),
            right = ?b.dimensions(),
            "dimension mismatch, skipping pixel scan"
        );
        return Ok(ComparisonVerdict::layout());
    }
    options.validate()?;

    match output {
        Some(out) => {
            check_output(out, a.data().len())?;
            let mut painter = Painter::new(out, options);
            Ok(scan(a, b, options, &mut painter))
        }
        None => Ok(scan(a, b, options, &mut Discard)),
    }
}

/// Per-pixel classification of two same-sized images.
pub fn classify_pixels(
    a: ImageRef<'_>,
    b: ImageRef<'_>,
    options: &ComparisonOptions,
) -> Result<Vec<PixelClassification>> {
    if a.dimensions() != b.dimensions() {
        let (left_w, left_h) = a.dimensions();
        let (right_w, right_h) = b.dimensions();
        return Err(DiffError::LayoutMismatch {
            left_w,
            left_h,
            right_w,
            right_h,
        });
    }
    options.validate()?;

    let mut recorder = Recorder {
        classes: vec![PixelClassification::Identical; a.pixel_count()],
    };
    scan(a, b, options, &mut recorder);
    Ok(recorder.classes)
}

struct Recorder {
    classes: Vec<PixelClassification>,
}

impl PixelSink for Recorder {
    fn unchanged(&mut self, _: ImageRef<'_>, _: usize) {}

    fn changed(&mut self, index: usize, _: bool) {
        self.classes[index] = PixelClassification::Changed;
    }

    fn antialiased(&mut self, index: usize) {
        self.classes[index] = PixelClassification::Antialiased;
    }

    fn unchanged_block(&mut self, _: ImageRef<'_>, _: u32, _: u32, _: u32, _: u32) {}
}

#[derive(Clone, Copy)]
struct Block {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

fn scan<S: PixelSink>(
    a: ImageRef<'_>,
    b: ImageRef<'_>,
    options: &ComparisonOptions,
    sink: &mut S,
) -> ComparisonVerdict {
    let (width, height) = a.dimensions();
    let total = a.pixel_count();

    if options.fast_buffer_check && a.data() == b.data() {
        sink.unchanged_block(a, 0, 0, width, height);
        return ComparisonVerdict::from_counts(0, 0, total);
    }

    let cutoff = max_delta(options.threshold);
    let size = block_size(width, height);

    let mut hot = Vec::new();
    for y0 in (0..height).step_by(size as usize) {
        for x0 in (0..width).step_by(size as usize) {
            let block = Block {
                x0,
                y0,
                x1: (x0 + size).min(width),
                y1: (y0 + size).min(height),
            };
            if block_exceeds(a, b, block, cutoff) {
                hot.push(block);
            } else {
                sink.unchanged_block(a, block.x0, block.y0, block.x1, block.y1);
            }
        }
    }
    debug!(block = size, hot = hot.len(), "cold pass finished");

    let mut diff_count = 0u32;
    let mut aa_count = 0u32;
    for block in hot {
        for y in block.y0..block.y1 {
            for x in block.x0..block.x1 {
                let index = y as usize * width as usize + x as usize;
                let (pa, pb) = (a.pixel(index), b.pixel(index));
                let delta = if pa == pb { 0.0 } else { color_delta(pa, pb) };

                if delta.abs() <= cutoff {
                    sink.unchanged(a, index);
                } else if options.antialiasing
                    && (is_antialiased(a, b, x, y) || is_antialiased(b, a, x, y))
                {
                    aa_count += 1;
                    if options.include_aa {
                        diff_count += 1;
                        sink.changed(index, delta < 0.0);
                    } else {
                        sink.antialiased(index);
                    }
                } else {
                    diff_count += 1;
                    sink.changed(index, delta < 0.0);
                }
            }
        }
    }

    ComparisonVerdict::from_counts(diff_count, aa_count, total)
}

/// Whether any pixel in the block is over the cutoff. Equal rows are
/// skipped by a byte comparison.
fn block_exceeds(a: ImageRef<'_>, b: ImageRef<'_>, block: Block, cutoff: f64) -> bool {
    (block.y0..block.y1).any(|y| {
        let row_a = a.row_span(y, block.x0, block.x1);
        let row_b = b.row_span(y, block.x0, block.x1);
        row_a != row_b && span_exceeds(row_a, row_b, cutoff)
    })
}

/// Pixels compared per chunk before falling back to per-pixel deltas.
const SPAN_PIXELS: usize = 8;

/// Scans two equal-length RGBA byte spans in fixed-width chunks; only
/// chunks whose bytes differ pay for the YIQ delta.
fn span_exceeds(row_a: &[u8], row_b: &[u8], cutoff: f64) -> bool {
    let mut chunks_a = row_a.chunks_exact(SPAN_PIXELS * CHANNELS);
    let mut chunks_b = row_b.chunks_exact(SPAN_PIXELS * CHANNELS);
    for (ca, cb) in (&mut chunks_a).zip(&mut chunks_b) {
        if ca != cb && pixels_exceed(ca, cb, cutoff) {
            return true;
        }
    }
    pixels_exceed(chunks_a.remainder(), chunks_b.remainder(), cutoff)
}

#[inline]
fn pixels_exceed(a: &[u8], b: &[u8], cutoff: f64) -> bool {
    a.chunks_exact(CHANNELS)
        .zip(b.chunks_exact(CHANNELS))
        .any(|(pa, pb)| pa != pb && color_delta(packed(pa), packed(pb)).abs() > cutoff)
}

#[inline(always)]
fn packed(px: &[u8]) -> u32 {
    u32::from_le_bytes([px[0], px[1], px[2], px[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> Image {
        Image::filled(w, h, rgba).unwrap()
    }

    #[test]
    fn block_size_scales_with_area() {
        assert_eq!(block_size(1, 1), 8);
        assert_eq!(block_size(100, 100), 16);
        assert_eq!(block_size(1600, 1600), 64);
        assert_eq!(block_size(100_000, 100_000), 128);
    }

    #[test]
    fn span_scan_sees_chunk_and_remainder_pixels() {
        // 11 pixels: one full chunk of 8 plus a remainder of 3
        let base = vec![200u8; 11 * CHANNELS];
        let cutoff = max_delta(0.1);
        assert!(!span_exceeds(&base, &base, cutoff));

        for changed in [2, 9] {
            let mut other = base.clone();
            other[changed * CHANNELS..changed * CHANNELS + 3].copy_from_slice(&[0, 0, 0]);
            assert!(span_exceeds(&base, &other, cutoff), "pixel {changed}");
        }

        let mut faint = base.clone();
        faint[10 * CHANNELS] = 201;
        assert!(!span_exceeds(&base, &faint, cutoff));
    }

    #[test]
    fn identical_images_match() {
        let img = solid(20, 20, [10, 20, 30, 255]);
        let verdict =
            compare_pixels(img.as_view(), img.as_view(), None, &Default::default()).unwrap();
        assert!(verdict.is_match);
        assert_eq!(verdict.reason, Reason::Match);
        assert_eq!(verdict.diff_count, 0);
    }

    #[test]
    fn fast_path_renders_same_output_as_scan() {
        let img = solid(20, 20, [0, 0, 0, 255]);
        let other = img.clone();
        let fast = ComparisonOptions::default();
        let slow = ComparisonOptions {
            fast_buffer_check: false,
            ..Default::default()
        };
        let mut out_fast = vec![0u8; img.data().len()];
        let mut out_slow = vec![0u8; img.data().len()];
        compare_pixels(img.as_view(), other.as_view(), Some(&mut out_fast), &fast).unwrap();
        compare_pixels(img.as_view(), other.as_view(), Some(&mut out_slow), &slow).unwrap();
        assert_eq!(out_fast, out_slow);
        assert_eq!(&out_fast[0..4], &[229, 229, 229, 255]);
    }

    #[test]
    fn single_changed_pixel_is_counted_and_painted() {
        let a = solid(10, 10, [255, 255, 255, 255]);
        let mut b = a.clone();
        b.put_pixel(3, 7, [0, 0, 0, 255]);
        let mut out = vec![0u8; a.data().len()];
        let verdict =
            compare_pixels(a.as_view(), b.as_view(), Some(&mut out), &Default::default()).unwrap();
        assert_eq!(verdict.diff_count, 1);
        assert_eq!(verdict.reason, Reason::PixelDiff);
        assert!((verdict.diff_percentage - 1.0).abs() < 1e-9);
        let p = (7 * 10 + 3) * 4;
        // a is brighter here, so the alt color (defaulting to diff_color) is used
        assert_eq!(&out[p..p + 4], &[255, 0, 0, 255]);
        assert_eq!(&out[0..4], &[255, 255, 255, 255]);
    }

    #[test]
    fn small_changes_stay_under_threshold() {
        let a = solid(8, 8, [100, 100, 100, 255]);
        let b = solid(8, 8, [101, 100, 100, 255]);
        let verdict = compare_pixels(a.as_view(), b.as_view(), None, &Default::default()).unwrap();
        assert!(verdict.is_match);
        let exact = ComparisonOptions {
            threshold: 0.0,
            ..Default::default()
        };
        let verdict = compare_pixels(a.as_view(), b.as_view(), None, &exact).unwrap();
        assert_eq!(verdict.diff_count, 64);
    }

    #[test]
    fn layout_mismatch_short_circuits() {
        let a = solid(10, 10, [0, 0, 0, 255]);
        let b = solid(20, 20, [0, 0, 0, 255]);
        let mut out = vec![0u8; 3];
        // output length is never checked once dimensions differ
        let verdict =
            compare_pixels(a.as_view(), b.as_view(), Some(&mut out), &Default::default()).unwrap();
        assert_eq!(verdict.reason, Reason::LayoutDiff);
        assert!(!verdict.is_match);
    }

    #[test]
    fn wrong_output_length_rejected() {
        let a = solid(4, 4, [0, 0, 0, 255]);
        let mut out = vec![0u8; 10];
        let err = compare_pixels(a.as_view(), a.as_view(), Some(&mut out), &Default::default())
            .unwrap_err();
        assert!(matches!(err, DiffError::InvalidBuffer { .. }));
    }

    #[test]
    fn classification_matches_verdict() {
        let a = solid(12, 12, [255, 255, 255, 255]);
        let mut b = a.clone();
        b.put_pixel(0, 0, [0, 0, 0, 255]);
        b.put_pixel(11, 11, [0, 0, 255, 255]);
        let classes = classify_pixels(a.as_view(), b.as_view(), &Default::default()).unwrap();
        assert_eq!(classes.len(), 144);
        let changed = classes
            .iter()
            .filter(|c| **c == PixelClassification::Changed)
            .count();
        assert_eq!(changed, 2);
        assert_eq!(classes[143], PixelClassification::Changed);
    }

    #[test]
    fn verdict_serializes_with_camel_case_keys() {
        let v = ComparisonVerdict::from_counts(5, 0, 100);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["match"], false);
        assert_eq!(json["reason"], "pixel-diff");
        assert_eq!(json["diffCount"], 5);
        assert_eq!(json["diffPercentage"], 5.0);
    }
}
