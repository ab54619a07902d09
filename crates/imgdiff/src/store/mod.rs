use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::CONFIG_DIR;

pub const REFERENCE_DIR: &str = "reference";
pub const CURRENT_DIR: &str = "current";
pub const DIFFERENCE_DIR: &str = "difference";

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

fn write_file(path: &Path, png: &[u8]) -> Result<()> {
    ensure_parent(path)?;
    std::fs::write(path, png).with_context(|| format!("Failed to write {}", path.display()))
}

/// Snapshot PNGs on disk, keyed by id (relative path without `.png`).
///
/// `reference/` holds approved baselines; `current/` and `difference/` hold
/// the captures and diffs of the last run that still need attention.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(CONFIG_DIR)
    }
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn file_path(&self, subdir: &str, id: &str) -> PathBuf {
        self.root.join(subdir).join(format!("{id}.png"))
    }

    pub fn write_reference(&self, id: &str, png: &[u8]) -> Result<()> {
        write_file(&self.file_path(REFERENCE_DIR, id), png)?;
        // Stale output for this id no longer applies.
        self.clean_output(id);
        Ok(())
    }

    pub fn write_current(&self, id: &str, png: &[u8]) -> Result<()> {
        write_file(&self.file_path(CURRENT_DIR, id), png)
    }

    pub fn write_difference(&self, id: &str, png: &[u8]) -> Result<()> {
        write_file(&self.file_path(DIFFERENCE_DIR, id), png)
    }

    pub fn read_reference(&self, id: &str) -> Option<Vec<u8>> {
        std::fs::read(self.file_path(REFERENCE_DIR, id)).ok()
    }

    pub fn read_current(&self, id: &str) -> Option<Vec<u8>> {
        std::fs::read(self.file_path(CURRENT_DIR, id)).ok()
    }

    pub fn has_difference(&self, id: &str) -> bool {
        self.file_path(DIFFERENCE_DIR, id).exists()
    }

    pub fn clean_output(&self, id: &str) {
        let _ = std::fs::remove_file(self.file_path(CURRENT_DIR, id));
        let _ = std::fs::remove_file(self.file_path(DIFFERENCE_DIR, id));
    }

    /// Remove everything under `current/` and `difference/`.
    pub fn clear_output_dirs(&self) {
        for subdir in [CURRENT_DIR, DIFFERENCE_DIR] {
            let dir = self.root.join(subdir);
            if dir.exists() {
                debug!(dir = %dir.display(), "clearing");
                let _ = std::fs::remove_dir_all(&dir);
            }
        }
    }

    pub fn list_current_ids(&self) -> Result<BTreeSet<String>> {
        self.list_ids(CURRENT_DIR)
    }

    pub fn list_reference_ids(&self) -> Result<BTreeSet<String>> {
        self.list_ids(REFERENCE_DIR)
    }

    fn list_ids(&self, subdir: &str) -> Result<BTreeSet<String>> {
        let dir = self.root.join(subdir);
        Ok(image_files(&dir, &["png"])?.into_keys().collect())
    }
}

/// Every file under `dir` with one of `extensions`, keyed by a
/// slash-separated id relative to `dir` with the extension stripped.
pub fn image_files(dir: &Path, extensions: &[&str]) -> Result<BTreeMap<String, PathBuf>> {
    let mut ids = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(ids);
    }
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = format!("{base}/**/*");
    for entry in glob::glob(&pattern).with_context(|| format!("Bad glob pattern {pattern}"))? {
        let path = entry.context("Failed to walk snapshot directory")?;
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)));
        if !matches || !path.is_file() {
            continue;
        }
        if let Ok(rel) = path.strip_prefix(dir) {
            let id: Vec<String> = rel
                .with_extension("")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            ids.insert(id.join("/"), path.clone());
        }
    }
    Ok(ids)
}
