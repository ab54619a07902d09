use std::path::Path;

use anyhow::{Context, Result};

use super::CONFIG_FILE;

/// Hand-crafted config template with commented-out keys, so that users see
/// the available knobs without reading docs.
const CONFIG_TEMPLATE: &str = r#"# ─────────────────────────────────────────────────────────
# Comparison settings. All fields are optional.
# ─────────────────────────────────────────────────────────
[diff]
# metric = "pixel"                  # "pixel" | "ssim" | "gmsd"
# threshold = 0.1                   # per-pixel color tolerance (0.0 = exact)
# antialiasing = false              # detect and ignore anti-aliased edges
# include_aa = false                # count anti-aliased pixels as differences
# alpha = 0.1                       # opacity of the faded original in the diff
# diff_color = [255, 0, 0]
# diff_color_alt = [0, 255, 0]      # pixels where the reference is brighter
# aa_color = [255, 255, 0]
# diff_mask = false                 # paint differences on a transparent canvas
# fail_on_layout_diff = false       # fail size changes instead of padding
# compression = 0                   # PNG level for diff images (0..9)
# quality = 90                      # JPEG quality for .jpg diff images (1..100)

[ssim]
# variant = "direct"                # "direct" | "integral" | "multi-scale"
# window = "gaussian"               # "gaussian" | "uniform"
# window_size = 11
# downsample = "original"           # "original" | "fast"
# map_style = "grayscale"           # "grayscale" | "heatmap"
# min_score = 0.99                  # lowest score that passes

[gmsd]
# downsample = true
# c = 170.0
# map_style = "grayscale"
# max_score = 0.01                  # highest deviation that passes

[pool]
# workers = 4                       # default: available parallelism
"#;

pub fn config_file_exists(dir: &Path) -> bool {
    dir.join(CONFIG_FILE).exists()
}

pub fn write_gitignore(dir: &Path, force: bool) -> Result<()> {
    let path = dir.join(".gitignore");
    if !force && path.exists() {
        return Ok(());
    }
    std::fs::write(&path, "current/\ndifference/\n")
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write the commented template to `<dir>/config.toml`.
pub fn write_template(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(CONFIG_FILE);
    std::fs::write(&path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
