use anyhow::{Context, Result};
use imgdiff_core::{DiffEngine, EngineReport, Image, Reason};
use tracing::debug;

use crate::io;

pub struct CompareResult {
    pub is_match: bool,
    /// The engine's verdict. Byte-identical inputs get the engine's
    /// [`DiffEngine::identical`] report without running it.
    pub report: EngineReport,
    /// The engine's rendering: diff overlay or score map.
    pub diff_image: Option<Image>,
    /// `Some((ref_w, ref_h, cur_w, cur_h))` when images have different dimensions.
    pub dimension_mismatch: Option<(u32, u32, u32, u32)>,
}

impl CompareResult {
    fn identical(engine: &dyn DiffEngine) -> Self {
        Self {
            is_match: true,
            report: engine.identical(),
            diff_image: None,
            dimension_mismatch: None,
        }
    }
}

/// Run `engine` on two decoded images.
///
/// Differently sized images are padded onto a common magenta canvas so the
/// size change shows up in the rendering, unless `fail_on_layout` is set, in
/// which case the engine's layout verdict is returned without pixel work.
/// Either way a size change never counts as a match.
///
/// With `render` unset the engine gets no output buffer and `diff_image`
/// stays `None`.
pub fn compare_images(
    left: &Image,
    right: &Image,
    engine: &dyn DiffEngine,
    fail_on_layout: bool,
    render: bool,
) -> Result<CompareResult> {
    let dimension_mismatch = (left.dimensions() != right.dimensions())
        .then(|| (left.width(), left.height(), right.width(), right.height()));

    if dimension_mismatch.is_some() && fail_on_layout {
        let report = engine.compare(left.as_view(), right.as_view(), None)?;
        return Ok(CompareResult {
            is_match: false,
            report,
            diff_image: None,
            dimension_mismatch,
        });
    }

    let padded;
    let (left, right) = if dimension_mismatch.is_some() {
        let w = left.width().max(right.width());
        let h = left.height().max(right.height());
        debug!(w, h, "padding to common canvas");
        padded = (io::pad_to(left, w, h)?, io::pad_to(right, w, h)?);
        (&padded.0, &padded.1)
    } else {
        (left, right)
    };

    let mut output = render.then(|| vec![0u8; left.data().len()]);
    let mut report = engine
        .compare(left.as_view(), right.as_view(), output.as_deref_mut())
        .with_context(|| format!("{} comparison failed", engine.name()))?;
    if dimension_mismatch.is_some() {
        report.is_match = false;
        report.reason = Reason::LayoutDiff;
    }
    let diff_image = output
        .map(|buf| Image::from_raw(buf, left.width(), left.height()))
        .transpose()?;

    Ok(CompareResult {
        is_match: report.is_match,
        report,
        diff_image,
        dimension_mismatch,
    })
}

/// Two-phase comparison of encoded snapshots:
/// 1. Byte-identical check
/// 2. Decode and run `engine`
///
/// Runs synchronously; call it from a pool worker.
pub fn compare_bytes(
    reference: &[u8],
    current: &[u8],
    engine: &dyn DiffEngine,
    fail_on_layout: bool,
    render: bool,
) -> Result<CompareResult> {
    if reference == current {
        return Ok(CompareResult::identical(engine));
    }
    let left = io::decode_bytes(reference).context("Failed to decode reference image")?;
    let right = io::decode_bytes(current).context("Failed to decode current image")?;
    compare_images(&left, &right, engine, fail_on_layout, render)
}
