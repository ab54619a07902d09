//! Anti-aliased pixel detection.
//!
//! Based on "Anti-aliased Pixel and Intensity Slope Detector" by
//! V. Vysniauskas (2009): a pixel on a smoothed edge sits between a darker
//! and a brighter neighbor, and at least one of those neighbors belongs to a
//! flat region in both images.

use crate::image::ImageRef;
use crate::yiq::luma_delta;

/// Equal neighbors needed before a pixel counts as part of a flat region.
pub const MANY_SIBLINGS: u32 = 3;

/// Inclusive 3x3 neighborhood bounds, clipped to the image.
#[inline]
fn neighborhood(x: u32, y: u32, width: u32, height: u32) -> (u32, u32, u32, u32) {
    (
        x.saturating_sub(1),
        y.saturating_sub(1),
        (x + 1).min(width - 1),
        (y + 1).min(height - 1),
    )
}

#[inline]
fn on_boundary(x: u32, y: u32, width: u32, height: u32) -> bool {
    x == 0 || y == 0 || x == width - 1 || y == height - 1
}

/// Whether the pixel at `(x, y)` has at least [`MANY_SIBLINGS`] identical
/// neighbors. Border pixels get one implicit match.
pub fn has_many_siblings(image: ImageRef<'_>, x: u32, y: u32) -> bool {
    let (width, height) = image.dimensions();
    let (x0, y0, x1, y1) = neighborhood(x, y, width, height);
    let center = image.pixel_xy(x, y);
    let mut count = u32::from(on_boundary(x, y, width, height));

    for ny in y0..=y1 {
        for nx in x0..=x1 {
            if nx == x && ny == y {
                continue;
            }
            if image.pixel_xy(nx, ny) == center {
                count += 1;
                if count >= MANY_SIBLINGS {
                    return true;
                }
            }
        }
    }
    false
}

/// Whether the difference at `(x, y)` looks like edge smoothing in `image`
/// rather than a content change relative to `other`. Callers check both
/// directions.
pub fn is_antialiased(image: ImageRef<'_>, other: ImageRef<'_>, x: u32, y: u32) -> bool {
    let (width, height) = image.dimensions();
    let (x0, y0, x1, y1) = neighborhood(x, y, width, height);
    let center = image.pixel_xy(x, y);

    let mut zeroes = u32::from(on_boundary(x, y, width, height));
    let mut min_delta = 0.0;
    let mut max_delta = 0.0;
    // neighbor deltas are center minus neighbor
    let mut brightest = (0, 0);
    let mut darkest = (0, 0);

    for ny in y0..=y1 {
        for nx in x0..=x1 {
            if nx == x && ny == y {
                continue;
            }
            let neighbor = image.pixel_xy(nx, ny);
            if neighbor == center {
                zeroes += 1;
                // a pixel inside a flat patch is not an edge
                if zeroes >= MANY_SIBLINGS {
                    return false;
                }
                continue;
            }

            let delta = luma_delta(center, neighbor);
            if delta < min_delta {
                min_delta = delta;
                brightest = (nx, ny);
            } else if delta > max_delta {
                max_delta = delta;
                darkest = (nx, ny);
            }
        }
    }

    // no gradient on one side
    if min_delta == 0.0 || max_delta == 0.0 {
        return false;
    }

    let flat_in_both = |(px, py): (u32, u32)| {
        has_many_siblings(image, px, py) && has_many_siblings(other, px, py)
    };
    flat_in_both(darkest) || flat_in_both(brightest)
}
