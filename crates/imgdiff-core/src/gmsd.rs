//! Gradient Magnitude Similarity Deviation (Xue et al., 2014).
//!
//! The score is the standard deviation of the per-pixel gradient magnitude
//! similarity, so 0 means the gradient fields agree everywhere.

use tracing::debug;

use crate::error::Result;
use crate::image::{ImageRef, layout_check};
use crate::luma::{Plane, luminance, pool2};
use crate::options::GmsdOptions;
use crate::render::{check_output, render_score_map};
use crate::score::{ScoreMap, SimilarityResult, std_dev};

/// Prewitt gradient magnitude with zero padding outside the plane.
fn gradient_magnitude(plane: &Plane) -> Vec<f64> {
    let (w, h) = (plane.width as isize, plane.height as isize);
    let at = |x: isize, y: isize| {
        if x < 0 || y < 0 || x >= w || y >= h {
            0.0
        } else {
            plane.get(x as usize, y as usize)
        }
    };

    let mut out = Vec::with_capacity(plane.data.len());
    for y in 0..h {
        for x in 0..w {
            let mut gx = 0.0;
            let mut gy = 0.0;
            for d in -1..=1 {
                gx += at(x - 1, y + d) - at(x + 1, y + d);
                gy += at(x + d, y - 1) - at(x + d, y + 1);
            }
            gx /= 3.0;
            gy /= 3.0;
            out.push((gx * gx + gy * gy).sqrt());
        }
    }
    out
}

fn similarity(a: ImageRef<'_>, b: ImageRef<'_>, options: &GmsdOptions) -> Result<ScoreMap> {
    layout_check(a, b)?;
    options.validate()?;

    let (mut x, mut y) = (luminance(a), luminance(b));
    if options.downsample {
        x = pool2(&x);
        y = pool2(&y);
    }
    debug!(width = x.width, height = x.height, "computing gmsd");

    let g1 = gradient_magnitude(&x);
    let g2 = gradient_magnitude(&y);
    let c = options.c;
    let values = g1
        .iter()
        .zip(&g2)
        .map(|(m1, m2)| (2.0 * m1 * m2 + c) / (m1 * m1 + m2 * m2 + c))
        .collect();
    Ok(ScoreMap::new(x.width, x.height, values))
}

/// GMSD score, optionally painting the similarity map into `output`.
pub fn gmsd(
    a: ImageRef<'_>,
    b: ImageRef<'_>,
    output: Option<&mut [u8]>,
    options: &GmsdOptions,
) -> Result<f64> {
    if let Some(out) = &output {
        layout_check(a, b)?;
        check_output(out, a.data().len())?;
    }
    let map = similarity(a, b, options)?;
    if let Some(out) = output {
        render_score_map(&map, out, a.width(), a.height(), options.map_style)?;
    }
    Ok(std_dev(&map.values))
}

pub fn gmsd_map(
    a: ImageRef<'_>,
    b: ImageRef<'_>,
    options: &GmsdOptions,
) -> Result<SimilarityResult> {
    let map = similarity(a, b, options)?;
    Ok(SimilarityResult {
        score: std_dev(&map.values),
        map: Some(map),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiffError;
    use crate::image::Image;

    fn stripes(w: u32, h: u32, period: u32) -> Image {
        let mut img = Image::filled(w, h, [255, 255, 255, 255]).unwrap();
        for y in 0..h {
            for x in (0..w).filter(|x| (x / period) % 2 == 0) {
                img.put_pixel(x, y, [0, 0, 0, 255]);
            }
        }
        img
    }

    #[test]
    fn identical_images_score_zero() {
        let img = stripes(32, 32, 4);
        assert_eq!(gmsd(img.as_view(), img.as_view(), None, &GmsdOptions::default()).unwrap(), 0.0);
    }

    #[test]
    fn different_structure_scores_positive_and_symmetric() {
        let a = stripes(32, 32, 4);
        let b = stripes(32, 32, 8);
        let opts = GmsdOptions::default();
        let ab = gmsd(a.as_view(), b.as_view(), None, &opts).unwrap();
        let ba = gmsd(b.as_view(), a.as_view(), None, &opts).unwrap();
        assert!(ab > 0.0);
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn flat_plane_has_gradient_only_at_border() {
        let plane = Plane::new(5, 5, vec![30.0; 25]);
        let g = gradient_magnitude(&plane);
        assert_eq!(g[2 * 5 + 2], 0.0);
        // left neighbors are zero padding: gx = (0 - 90) / 3
        assert!((g[2 * 5] - 30.0).abs() < 1e-9);
    }

    #[test]
    fn map_is_downsampled_by_default() {
        let a = stripes(32, 20, 4);
        let result = gmsd_map(a.as_view(), a.as_view(), &GmsdOptions::default()).unwrap();
        let map = result.map.unwrap();
        assert_eq!((map.width, map.height), (16, 10));
        let full = GmsdOptions {
            downsample: false,
            ..Default::default()
        };
        let map = gmsd_map(a.as_view(), a.as_view(), &full).unwrap().map.unwrap();
        assert_eq!((map.width, map.height), (32, 20));
    }

    #[test]
    fn mismatched_dimensions_are_an_error() {
        let a = stripes(8, 8, 2);
        let b = stripes(8, 9, 2);
        let err = gmsd(a.as_view(), b.as_view(), None, &GmsdOptions::default()).unwrap_err();
        assert!(matches!(err, DiffError::LayoutMismatch { .. }));
    }
}
