use std::path::PathBuf;

use anyhow::{Context, Result};
use chess_tools::dataset::{DEFAULT_WARNINGS_FILE, METADATA_FILE, validate_metadata, write_warnings};
use clap::Parser;

/// metadata.csv の FEN をすべて検証し、不正な行を警告ファイルに書き出す。
///
/// 不正な行があっても終了コードは 0（レポートを見て判断する）。
#[derive(Parser, Debug)]
#[command(author, version, about = "Check every FEN in a dataset metadata table")]
struct Cli {
    /// Metadata table to check
    #[arg(default_value = METADATA_FILE)]
    metadata: PathBuf,

    /// Where to write warnings (only created when there are any)
    #[arg(long, default_value = DEFAULT_WARNINGS_FILE)]
    warnings: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let report = validate_metadata(&cli.metadata)
        .with_context(|| format!("failed to read {}", cli.metadata.display()))?;

    if write_warnings(&report, &cli.warnings)? {
        println!(
            "{} of {} rows invalid, see {}",
            report.warnings.len(),
            report.checked,
            cli.warnings.display()
        );
    } else {
        println!("All {} positions are valid", report.checked);
    }
    Ok(())
}
