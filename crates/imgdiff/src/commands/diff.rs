use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::compare::diff::compare_images;
use crate::config::ResolvedConfig;
use crate::io;
use crate::report::{self, OutputFormat};

/// `imgdiff diff|ssim|gmsd`: compare two image files.
/// Returns exit code: 0 = match, 1 = difference (pixels or dimensions).
pub fn diff(
    reference: &Path,
    current: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    config: &ResolvedConfig,
) -> Result<i32> {
    let left = io::decode(reference)?;
    let right = io::decode(current)?;
    let engine = config.engine();
    debug!(
        metric = engine.name(),
        reference = %reference.display(),
        current = %current.display(),
        "comparing"
    );

    let result = compare_images(
        &left,
        &right,
        engine.as_ref(),
        config.pixel.fail_on_layout_diff,
        output.is_some(),
    )?;

    let written = match (output, &result.diff_image) {
        (Some(path), Some(image)) => {
            io::encode(image, path, config.encoding())?;
            info!(path = %path.display(), "wrote diff image");
            Some(path)
        }
        _ => None,
    };

    report::print_comparison(&result, written, format)?;
    Ok(if result.is_match { 0 } else { 1 })
}
