pub mod terminal;

use std::path::Path;

use anyhow::{Context, Result};
use imgdiff_core::{EngineReport, Reason};
use serde::Serialize;

use crate::compare::diff::CompareResult;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Dimensions {
    reference: [u32; 2],
    current: [u32; 2],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    #[serde(flatten)]
    report: &'a EngineReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<Dimensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a Path>,
}

pub fn render_json(result: &CompareResult, output: Option<&Path>) -> Result<String> {
    let dimensions = result.dimension_mismatch.map(|(rw, rh, cw, ch)| Dimensions {
        reference: [rw, rh],
        current: [cw, ch],
    });
    serde_json::to_string_pretty(&JsonOutput {
        report: &result.report,
        dimensions,
        output,
    })
    .context("Failed to serialize result")
}

/// One-line human summary of a report, without the status label.
pub fn describe(report: &EngineReport, dimension_mismatch: Option<(u32, u32, u32, u32)>) -> String {
    if let Some((rw, rh, cw, ch)) = dimension_mismatch {
        return format!("dimensions changed: {rw}x{rh} -> {cw}x{ch}");
    }
    if report.reason == Reason::LayoutDiff {
        return "dimensions differ".to_string();
    }
    match (report.diff_count, report.diff_percentage, report.score) {
        (Some(count), Some(pct), _) => format!("{count} pixels, {pct:.2}%"),
        (_, _, Some(score)) => format!("{} {score:.4}", report.metric),
        _ => report.metric.clone(),
    }
}

/// Print the outcome of a single two-file comparison to stdout.
pub fn print_comparison(
    result: &CompareResult,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let report = &result.report;
    match format {
        OutputFormat::Json => println!("{}", render_json(result, output)?),
        OutputFormat::Text => {
            let label = if report.is_match {
                "\x1b[32mPASS\x1b[0m"
            } else {
                "\x1b[31mFAIL\x1b[0m"
            };
            println!("  {label}  {}", describe(report, result.dimension_mismatch));
            if let Some(path) = output {
                println!("  \x1b[2mwrote {}\x1b[0m", path.display());
            }
        }
    }
    Ok(())
}
