use anyhow::{Result, bail};
use tracing::debug;

use super::matches_filter;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    New,
    Failed,
}

/// `imgdiff approve`: promote `current/` snapshots to `reference/`.
pub fn approve(
    store: &Store,
    filter: Option<&str>,
    new_only: bool,
    failed_only: bool,
    all: bool,
) -> Result<()> {
    let (new_only, failed_only) = if all {
        (false, false)
    } else {
        (new_only, failed_only)
    };
    let ids = store.list_current_ids()?;
    if ids.is_empty() {
        println!("Nothing to approve, current/ is empty.");
        return Ok(());
    }

    let selected: Vec<(&str, Kind)> = ids
        .iter()
        .map(|id| {
            let kind = if store.has_difference(id) {
                Kind::Failed
            } else {
                Kind::New
            };
            (id.as_str(), kind)
        })
        .filter(|(_, kind)| {
            if new_only {
                *kind == Kind::New
            } else if failed_only {
                *kind == Kind::Failed
            } else {
                true
            }
        })
        .filter(|(id, _)| matches_filter(id, filter))
        .collect();

    if selected.is_empty() {
        println!("No snapshots matched the given filters.");
        return Ok(());
    }

    let mut count_new = 0usize;
    let mut count_failed = 0usize;

    for (id, kind) in &selected {
        let Some(png) = store.read_current(id) else {
            bail!("Could not read current/{id}.png");
        };
        store.write_reference(id, &png)?;
        debug!(id, ?kind, "approved");
        let label = match kind {
            Kind::Failed => {
                count_failed += 1;
                "\x1b[31mFAIL\x1b[0m"
            }
            Kind::New => {
                count_new += 1;
                "\x1b[33m NEW\x1b[0m"
            }
        };
        println!("  Approved  {label}  {id}");
    }

    let total = count_new + count_failed;
    println!();
    println!("{total} snapshot(s) approved ({count_new} new, {count_failed} failed).");

    Ok(())
}
