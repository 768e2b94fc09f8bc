//! xlsxremap CLI
//!
//! 設定を読み込み、`DOCS_DIR`直下のファイルを一括処理します。
//! 失敗したファイルが1つでもあれば終了コードは非ゼロになります。

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;
use xlsxremap::{Config, Dispatcher, ErrorPolicy};

/// Convert spreadsheets to CSV and remap one column through a lookup table.
///
/// Settings come from a `.env` file and the process environment
/// (DATA_OUTPUT_DIR, DOCS_DIR, COLUMN_NAME, VALUES, OVERWRITE, DEFAULT).
#[derive(Debug, Parser)]
#[command(name = "xlsxremap", version, about)]
struct Cli {
    /// `.env` file to load instead of `./.env`
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Stop at the first file that fails (overrides ON_ERROR)
    #[arg(long)]
    halt_on_error: bool,

    /// Process files in parallel (overrides PARALLEL)
    #[arg(long)]
    parallel: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG`が設定されていればそれを優先する
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<bool> {
    let config = match &cli.env_file {
        Some(path) => Config::from_env_file(path),
        None => Config::from_env(),
    }
    .context("failed to load configuration")?;

    let mut builder = config.into_builder();
    if cli.halt_on_error {
        builder = builder.with_error_policy(ErrorPolicy::Halt);
    }
    if cli.parallel {
        builder = builder.parallel(true);
    }
    let config = builder.build()?;

    let summary = Dispatcher::new(config).run().context("run aborted")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if summary.is_success() {
        info!(
            processed = summary.processed.len(),
            skipped = summary.skipped.len(),
            "All files processed."
        );
        Ok(true)
    } else {
        for failed in &summary.failed {
            error!(file = %failed.source.display(), "{}", failed.error);
        }
        error!(
            failed = summary.failed.len(),
            processed = summary.processed.len(),
            "run finished with failures"
        );
        Ok(false)
    }
}
