use std::path::Path;

use anyhow::{Result, bail};

use crate::config;

/// `imgdiff init`: create `<dir>/config.toml` and its `.gitignore`.
pub fn init(dir: &Path, force: bool) -> Result<()> {
    if !force && config::config_file_exists(dir) {
        bail!(
            "{}/config.toml already exists (use --force to overwrite)",
            dir.display()
        );
    }

    config::write_template(dir)?;
    config::write_gitignore(dir, force)?;

    let verb = if force { "Regenerated" } else { "Created" };
    println!("{verb} {}/config.toml", dir.display());
    Ok(())
}
