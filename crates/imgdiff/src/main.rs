mod cli;
mod commands;
mod compare;
mod config;
mod io;
mod pool;
mod report;
mod store;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use config::ResolvedConfig;
use imgdiff_core::Metric;
use tracing_subscriber::EnvFilter;

/// Exit code for usage, input and I/O errors.
const EXIT_ERROR: i32 = 2;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("IMGDIFF_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("imgdiff=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_pair(pair: cli::PairArgs, metric: Option<Metric>) -> Result<i32> {
    let mut config = ResolvedConfig::new(&pair.compare)?;
    if let Some(metric) = metric {
        config = config.with_metric(metric);
    }
    commands::diff(
        &pair.reference,
        &pair.current,
        pair.output.as_deref(),
        pair.output_format,
        &config,
    )
}

async fn run(cli: cli::Cli) -> Result<i32> {
    match cli.command {
        cli::Command::Diff(pair) => run_pair(pair, None),
        cli::Command::Ssim(pair) => run_pair(pair, Some(Metric::Ssim)),
        cli::Command::Gmsd(pair) => run_pair(pair, Some(Metric::Gmsd)),
        cli::Command::Test {
            captures,
            filter,
            update,
            compare,
        } => {
            let config = ResolvedConfig::new(&compare)?;
            commands::test(
                &captures,
                filter.as_deref(),
                update,
                &config,
                store::Store::default(),
            )
            .await
        }
        cli::Command::Approve {
            filter,
            new,
            failed,
            all,
        } => {
            commands::approve(&store::Store::default(), filter.as_deref(), new, failed, all)?;
            Ok(0)
        }
        cli::Command::Init { force } => {
            commands::init(Path::new(config::CONFIG_DIR), force)?;
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = cli::Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    };
    std::process::exit(code);
}
