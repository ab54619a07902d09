use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::CompareArgs;
use crate::report::OutputFormat;

#[derive(Parser)]
#[command(
    name = "imgdiff",
    version,
    about = "Perceptual image comparison: pixel diff, SSIM and GMSD"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Two images in, verdict out.
#[derive(Args)]
pub struct PairArgs {
    /// Reference image (PNG or JPEG)
    pub reference: PathBuf,
    /// Image to compare against the reference
    pub current: PathBuf,
    /// Write the diff image or score map to this path (.png or .jpg)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,
    #[command(flatten)]
    pub compare: CompareArgs,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compare two images with the configured metric (exit 0/1, 2 on error)
    Diff(PairArgs),

    /// Compare two images by structural similarity
    Ssim(PairArgs),

    /// Compare two images by gradient magnitude similarity deviation
    Gmsd(PairArgs),

    /// Compare a directory of captures against stored references (exit 0/1)
    Test {
        /// Directory of captured PNG, JPEG or QOI images
        captures: PathBuf,
        /// Only run snapshots whose name contains PATTERN (case-insensitive)
        #[arg(long, short = 'f')]
        filter: Option<String>,
        /// Overwrite references with the captures instead of failing
        #[arg(long)]
        update: bool,
        #[command(flatten)]
        compare: CompareArgs,
    },

    /// Promote current/ snapshots to reference/
    Approve {
        /// Only approve snapshots whose name contains PATTERN (case-insensitive)
        #[arg(long, short = 'f')]
        filter: Option<String>,
        /// Only approve new snapshots (no prior reference)
        #[arg(long)]
        new: bool,
        /// Only approve failed snapshots (have a diff)
        #[arg(long)]
        failed: bool,
        /// Approve all pending snapshots (default when no kind flags)
        #[arg(long)]
        all: bool,
    },

    /// Create .imgdiff/config.toml with default settings
    Init {
        /// Overwrite existing config and gitignore
        #[arg(long, short = 'f')]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use imgdiff_core::{Downsample, Metric, SsimVariant};

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn compare_flags_parse() {
        let cli = Cli::try_parse_from([
            "imgdiff",
            "ssim",
            "a.png",
            "b.png",
            "-o",
            "map.png",
            "--variant",
            "multi-scale",
            "--downsample",
            "fast",
            "--window-size",
            "7",
            "--output-format",
            "json",
        ])
        .unwrap();
        let Command::Ssim(pair) = cli.command else {
            panic!("expected ssim");
        };
        assert_eq!(pair.output_format, OutputFormat::Json);
        assert_eq!(pair.compare.variant, Some(SsimVariant::MultiScale));
        assert_eq!(pair.compare.downsample, Some(Downsample::Fast));
        assert_eq!(pair.compare.window_size, Some(7));
    }

    #[test]
    fn pixel_flags_parse() {
        let cli = Cli::try_parse_from([
            "imgdiff",
            "diff",
            "a.png",
            "b.png",
            "--metric",
            "gmsd",
            "--threshold",
            "0.2",
            "--antialiasing",
            "--diff-mask",
            "--fail-on-layout",
            "--compression",
            "9",
            "--quality",
            "80",
        ])
        .unwrap();
        let Command::Diff(pair) = cli.command else {
            panic!("expected diff");
        };
        assert_eq!(pair.compare.metric, Some(Metric::Gmsd));
        assert_eq!(pair.compare.threshold, Some(0.2));
        assert!(pair.compare.antialiasing && pair.compare.diff_mask && pair.compare.fail_on_layout);
        assert_eq!(pair.compare.compression, Some(9));
        assert_eq!(pair.compare.quality, Some(80));
    }

    #[test]
    fn out_of_range_values_rejected() {
        for args in [
            ["imgdiff", "diff", "a.png", "b.png", "--threshold", "1.5"],
            ["imgdiff", "diff", "a.png", "b.png", "--compression", "10"],
            ["imgdiff", "diff", "a.png", "b.png", "--quality", "0"],
            ["imgdiff", "diff", "a.png", "b.png", "--variant", "fancy"],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "{args:?}");
        }
    }
}
