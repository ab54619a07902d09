use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use imgdiff_core::DiffEngine;
use tracing::debug;

use super::matches_filter;
use crate::compare::SnapshotStatus;
use crate::compare::diff::compare_bytes;
use crate::config::ResolvedConfig;
use crate::io;
use crate::pool::ComparePool;
use crate::report::terminal::{self, Tally};
use crate::store::{self, Store};

struct Job {
    id: String,
    capture: PathBuf,
}

/// Everything a worker needs to settle one snapshot.
struct Settle {
    store: Store,
    engine: Arc<dyn DiffEngine>,
    fail_on_layout: bool,
    compression: u8,
    update: bool,
}

impl Settle {
    fn check(&self, job: &Job) -> Result<SnapshotStatus> {
        let current = io::read_as_png(&job.capture)?;

        let Some(reference) = self.store.read_reference(&job.id) else {
            if self.update {
                self.store.write_reference(&job.id, &current)?;
                return Ok(SnapshotStatus::Added { promoted: true });
            }
            self.store.write_current(&job.id, &current)?;
            return Ok(SnapshotStatus::Added { promoted: false });
        };

        let result = compare_bytes(
            &reference,
            &current,
            self.engine.as_ref(),
            self.fail_on_layout,
            !self.update,
        )?;
        if result.is_match {
            self.store.clean_output(&job.id);
            return Ok(SnapshotStatus::Matched);
        }
        if self.update {
            self.store.write_reference(&job.id, &current)?;
            return Ok(SnapshotStatus::Updated {
                report: result.report,
            });
        }

        self.store.write_current(&job.id, &current)?;
        if let Some(image) = &result.diff_image {
            self.store
                .write_difference(&job.id, &io::png_bytes(image, self.compression)?)?;
        }
        Ok(SnapshotStatus::Failed {
            report: result.report,
            dimension_mismatch: result.dimension_mismatch,
        })
    }
}

/// `imgdiff test`: compare every image under `captures` with its reference.
/// Returns exit code: 0 = all pass, 1 = any fail, new or errored.
pub async fn test(
    captures: &Path,
    filter: Option<&str>,
    update: bool,
    config: &ResolvedConfig,
    store: Store,
) -> Result<i32> {
    if !captures.is_dir() {
        bail!("{} is not a directory", captures.display());
    }
    let jobs: Vec<Job> = store::image_files(captures, &io::EXTENSIONS)?
        .into_iter()
        .filter(|(id, _)| matches_filter(id, filter))
        .map(|(id, capture)| Job { id, capture })
        .collect();
    if jobs.is_empty() {
        println!("No snapshots found in {}.", captures.display());
        return Ok(0);
    }

    let planned: BTreeSet<String> = jobs.iter().map(|job| job.id.clone()).collect();

    // Full run: wipe both output dirs. Filtered run: only the snapshots being tested.
    if filter.is_some() {
        for job in &jobs {
            store.clean_output(&job.id);
        }
    } else {
        store.clear_output_dirs();
    }

    let run_start = Instant::now();
    let total = jobs.len();
    let settle = Settle {
        store: store.clone(),
        engine: config.engine(),
        fail_on_layout: config.pixel.fail_on_layout_diff,
        compression: config.pixel.compression,
        update,
    };
    debug!(
        total,
        metric = settle.engine.name(),
        workers = config.workers,
        "starting run"
    );

    let mut pool = ComparePool::new(config.workers.min(total), move |job: Job| {
        let started = Instant::now();
        let status = settle
            .check(&job)
            .unwrap_or_else(|e| SnapshotStatus::Error(format!("{e:#}")));
        Ok((job.id, status, started.elapsed()))
    });

    let mut names = HashMap::with_capacity(total);
    for job in jobs {
        let name = job.id.clone();
        let task = pool.submit(job)?;
        names.insert(task, name);
    }
    pool.close();

    let mut tally = Tally::default();
    let mut done = 0usize;
    while let Some((task, outcome)) = pool.recv().await {
        done += 1;
        let (name, status, elapsed) = match outcome {
            Ok(settled) => settled,
            Err(e) => (
                names.remove(&task).unwrap_or_default(),
                SnapshotStatus::Error(format!("{e:#}")),
                Duration::ZERO,
            ),
        };
        debug!(done, total, name = %name, "received result");
        tally.record(&name, &status);
        terminal::print_line(&name, &status, elapsed);
        terminal::show_progress(done, total);
    }
    pool.shutdown().await?;

    // References without a capture: only detectable on full runs.
    if filter.is_none() {
        for id in store.list_reference_ids()?.difference(&planned) {
            terminal::print_removed_line(id);
            tally.removed.push(id.clone());
        }
    }

    terminal::print_actionable_summary(&tally);
    terminal::print_summary(&tally, run_start.elapsed());
    Ok(tally.exit_code())
}

#[cfg(test)]
mod tests {
    use imgdiff_core::Image;

    use super::*;
    use crate::config::resolve::EnvLayer;
    use crate::config::{CompareArgs, Config};

    fn config() -> ResolvedConfig {
        let args = CompareArgs {
            workers: Some(2),
            ..Default::default()
        };
        ResolvedConfig::resolve(Config::default(), EnvLayer::default(), &args).unwrap()
    }

    fn capture(dir: &Path, id: &str, color: [u8; 4]) {
        let image = Image::filled(12, 12, color).unwrap();
        io::encode(&image, &dir.join(format!("{id}.png")), io::Encoding::default()).unwrap();
    }

    #[tokio::test]
    async fn lifecycle_new_then_matched_then_failed() {
        let dir = tempfile::tempdir().unwrap();
        let captures = dir.path().join("captures");
        let store = Store::new(dir.path().join(".imgdiff"));
        capture(&captures, "home", [255, 255, 255, 255]);
        capture(&captures, "nav/menu", [0, 0, 0, 255]);

        // No references yet: both are new and pending.
        let code = test(&captures, None, false, &config(), store.clone()).await.unwrap();
        assert_eq!(code, 1);
        assert_eq!(store.list_current_ids().unwrap().len(), 2);

        super::super::approve(&store, None, false, false, true).unwrap();
        assert_eq!(store.list_reference_ids().unwrap().len(), 2);

        let code = test(&captures, None, false, &config(), store.clone()).await.unwrap();
        assert_eq!(code, 0);
        assert!(store.list_current_ids().unwrap().is_empty());

        capture(&captures, "home", [0, 0, 255, 255]);
        let code = test(&captures, None, false, &config(), store.clone()).await.unwrap();
        assert_eq!(code, 1);
        assert!(store.has_difference("home"));
        assert!(!store.has_difference("nav/menu"));

        // A vanished capture does not fail the run.
        std::fs::remove_file(captures.join("home.png")).unwrap();
        let code = test(&captures, None, false, &config(), store.clone()).await.unwrap();
        assert_eq!(code, 0);
        assert!(store.read_reference("home").is_some());
    }

    #[tokio::test]
    async fn update_writes_references_directly() {
        let dir = tempfile::tempdir().unwrap();
        let captures = dir.path().join("captures");
        let store = Store::new(dir.path().join(".imgdiff"));
        capture(&captures, "card", [10, 200, 10, 255]);

        let code = test(&captures, None, true, &config(), store.clone()).await.unwrap();
        assert_eq!(code, 0);
        assert!(store.read_reference("card").is_some());

        capture(&captures, "card", [200, 10, 10, 255]);
        let code = test(&captures, None, true, &config(), store.clone()).await.unwrap();
        assert_eq!(code, 0);
        let stored = io::decode_bytes(&store.read_reference("card").unwrap()).unwrap();
        assert_eq!(stored.get_pixel(0, 0), [200, 10, 10, 255]);
    }

    #[tokio::test]
    async fn filter_limits_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let captures = dir.path().join("captures");
        let store = Store::new(dir.path().join(".imgdiff"));
        capture(&captures, "alpha", [1, 2, 3, 255]);
        capture(&captures, "beta", [4, 5, 6, 255]);

        test(&captures, Some("ALPHA"), false, &config(), store.clone())
            .await
            .unwrap();
        let pending: Vec<String> = store.list_current_ids().unwrap().into_iter().collect();
        assert_eq!(pending, vec!["alpha".to_string()]);
    }

    #[tokio::test]
    async fn missing_capture_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join(".imgdiff"));
        let result = test(&dir.path().join("nope"), None, false, &config(), store).await;
        assert!(result.is_err());
    }
}
