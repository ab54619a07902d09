use std::io::Write;
use std::time::Duration;

use crate::compare::SnapshotStatus;

/// Clear the current terminal line (wipes progress indicator).
pub fn clear_line() {
    print!("\r\x1b[2K");
}

pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

/// Status label and detail for one snapshot line.
fn status_parts(status: &SnapshotStatus) -> (&'static str, String) {
    match status {
        SnapshotStatus::Matched => ("\x1b[32mPASS\x1b[0m", String::new()),
        SnapshotStatus::Failed {
            report,
            dimension_mismatch,
        } => (
            "\x1b[31mFAIL\x1b[0m",
            format!("  ({})", super::describe(report, *dimension_mismatch)),
        ),
        SnapshotStatus::Added { promoted: true } => {
            ("\x1b[32m ADD\x1b[0m", "  (saved as reference)".to_string())
        }
        SnapshotStatus::Added { promoted: false } => {
            ("\x1b[33m NEW\x1b[0m", "  (no reference)".to_string())
        }
        SnapshotStatus::Updated { report } => (
            "\x1b[36m UPD\x1b[0m",
            format!("  (reference updated, {})", super::describe(report, None)),
        ),
        SnapshotStatus::Error(msg) => ("\x1b[31m ERR\x1b[0m", format!("  ({msg})")),
    }
}

/// Print a single snapshot result line.
pub fn print_line(name: &str, status: &SnapshotStatus, elapsed: Duration) {
    clear_line();
    let (label, detail) = status_parts(status);
    println!(
        "  {label}  {name}{detail}  \x1b[2m{}\x1b[0m",
        format_duration(elapsed)
    );
}

/// Print a reference that no capture matched.
pub fn print_removed_line(name: &str) {
    clear_line();
    println!("  \x1b[2mGONE\x1b[0m  \x1b[2m{name}  (no matching capture)\x1b[0m");
}

/// Show comparison progress indicator.
pub fn show_progress(done: usize, total: usize) {
    if done < total {
        print!("  Comparing  [{done}/{total}]");
        let _ = std::io::stdout().flush();
    }
}

/// Per-status tallies and names collected over a run.
#[derive(Debug, Default)]
pub struct Tally {
    pub matched: usize,
    pub added: Vec<String>,
    pub pending: Vec<String>,
    pub updated: Vec<String>,
    pub failed: Vec<String>,
    pub errored: Vec<String>,
    /// References with no capture. Reported, never failing.
    pub removed: Vec<String>,
}

impl Tally {
    pub fn record(&mut self, name: &str, status: &SnapshotStatus) {
        let bucket = match status {
            SnapshotStatus::Matched => {
                self.matched += 1;
                return;
            }
            SnapshotStatus::Added { promoted: true } => &mut self.added,
            SnapshotStatus::Added { promoted: false } => &mut self.pending,
            SnapshotStatus::Updated { .. } => &mut self.updated,
            SnapshotStatus::Failed { .. } => &mut self.failed,
            SnapshotStatus::Error(_) => &mut self.errored,
        };
        bucket.push(name.to_string());
    }

    pub fn total(&self) -> usize {
        self.matched
            + self.added.len()
            + self.pending.len()
            + self.updated.len()
            + self.failed.len()
            + self.errored.len()
    }

    /// Exit code for the run: 1 when anything still needs attention.
    pub fn exit_code(&self) -> i32 {
        if self.failed.is_empty() && self.pending.is_empty() && self.errored.is_empty() {
            0
        } else {
            1
        }
    }
}

/// Print an actionable summary listing snapshot names grouped by status.
/// Only prints sections with at least one entry.
pub fn print_actionable_summary(tally: &Tally) {
    let sections = [
        ("Failed", &tally.failed),
        ("New", &tally.pending),
        ("Errored", &tally.errored),
        ("Removed", &tally.removed),
    ];
    if sections.iter().all(|(_, names)| names.is_empty()) {
        return;
    }

    clear_line();
    println!();
    println!("Actionable snapshots:");

    for (label, names) in sections {
        if !names.is_empty() {
            println!();
            println!("  {label} ({}):", names.len());
            for name in names {
                println!("    {name}");
            }
        }
    }
}

/// Print the final summary.
pub fn print_summary(tally: &Tally, elapsed: Duration) {
    clear_line();
    println!();
    print!(
        "Snapshots:  {} total, \x1b[32m{} passed\x1b[0m, \x1b[31m{} failed\x1b[0m, \x1b[33m{} new\x1b[0m",
        tally.total(),
        tally.matched,
        tally.failed.len(),
        tally.pending.len(),
    );
    if !tally.added.is_empty() {
        print!(", \x1b[32m{} added\x1b[0m", tally.added.len());
    }
    if !tally.updated.is_empty() {
        print!(", \x1b[36m{} updated\x1b[0m", tally.updated.len());
    }
    if !tally.errored.is_empty() {
        print!(", \x1b[31m{} errored\x1b[0m", tally.errored.len());
    }
    if !tally.removed.is_empty() {
        print!(", \x1b[2m{} removed\x1b[0m", tally.removed.len());
    }
    println!();
    println!("Time:       {}", format_duration(elapsed));

    if !tally.removed.is_empty() {
        println!();
        println!(
            "{} reference(s) no longer match any capture.",
            tally.removed.len()
        );
    }
    if tally.exit_code() != 0 {
        println!();
        if !tally.failed.is_empty() {
            println!("{} snapshot(s) have visual differences.", tally.failed.len());
        }
        if !tally.pending.is_empty() {
            println!("{} snapshot(s) have no reference.", tally.pending.len());
        }
        if !tally.errored.is_empty() {
            println!("{} snapshot(s) could not be compared.", tally.errored.len());
        }
        println!("Run `imgdiff approve` to accept, or `imgdiff test --update` to overwrite.");
    }
}

#[cfg(test)]
mod tests {
    use imgdiff_core::{EngineReport, Reason};

    use super::*;

    fn gmsd_report(is_match: bool, score: f64) -> EngineReport {
        EngineReport {
            metric: "gmsd".into(),
            is_match,
            reason: if is_match {
                Reason::Match
            } else {
                Reason::PixelDiff
            },
            score: Some(score),
            diff_count: None,
            diff_percentage: None,
        }
    }

    #[test]
    fn durations_switch_to_seconds() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
    }

    #[test]
    fn tally_exit_code_ignores_resolved_statuses() {
        let mut tally = Tally::default();
        tally.record("a", &SnapshotStatus::Matched);
        tally.record("b", &SnapshotStatus::Added { promoted: true });
        tally.record(
            "c",
            &SnapshotStatus::Updated {
                report: gmsd_report(false, 0.5),
            },
        );
        assert_eq!(tally.total(), 3);
        assert_eq!(tally.exit_code(), 0);

        tally.record("d", &SnapshotStatus::Added { promoted: false });
        assert_eq!(tally.pending, vec!["d".to_string()]);
        assert_eq!(tally.exit_code(), 1);
    }

    #[test]
    fn failed_line_describes_report() {
        let status = SnapshotStatus::Failed {
            report: gmsd_report(false, 0.25),
            dimension_mismatch: None,
        };
        let (_, detail) = status_parts(&status);
        assert_eq!(detail, "  (gmsd 0.2500)");

        let updated = SnapshotStatus::Updated {
            report: gmsd_report(false, 0.25),
        };
        let (_, detail) = status_parts(&updated);
        assert_eq!(detail, "  (reference updated, gmsd 0.2500)");
    }
}
