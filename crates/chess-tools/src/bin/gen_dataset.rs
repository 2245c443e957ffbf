use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chess_tools::dataset::{DatasetConfig, generate_dataset};
use chess_tools::position::{DEFAULT_MAX_PLIES, seeded_rng};
use chess_tools::render::{GlyphChoice, Renderer};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

/// ランダム局面の画像データセットを作る。
///
/// `<out>/images/NNNNNN.png` と `<out>/metadata.csv` を書き出す。
/// 既存のファイルは上書きされる。
///
/// 例: `cargo run --release -p chess-tools --bin gen_dataset -- --n 1000 --out data --sq 64 --seed 1`
#[derive(Parser, Debug)]
#[command(author, version, about = "Generate a dataset of random chess positions")]
struct Cli {
    /// Number of samples
    #[arg(long)]
    n: usize,

    /// Output directory
    #[arg(long)]
    out: PathBuf,

    /// Square size in pixels
    #[arg(long = "sq", default_value_t = chess_tools::dataset::generate::DEFAULT_DATASET_SQUARE_SIZE)]
    square_size: u32,

    /// Directory with piece sprites (wk.png, bq.png, ...)
    #[arg(long)]
    sprites: Option<PathBuf>,

    /// Upper bound of random plies per sample
    #[arg(long, default_value_t = DEFAULT_MAX_PLIES)]
    max_plies: u32,

    /// Seed for reproducible datasets
    #[arg(long)]
    seed: Option<u64>,

    /// Colour theme (TOML)
    #[arg(long)]
    theme: Option<PathBuf>,

    /// TrueType font with chess symbols
    #[arg(long)]
    font: Option<PathBuf>,

    /// Draw pieces with the built-in bitmap glyphs instead of the bundled font
    #[arg(long, default_value_t = false, conflicts_with = "font")]
    bitmap_glyphs: bool,

    /// Hide the progress bar
    #[arg(long, default_value_t = false)]
    no_progress: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    if cli.square_size == 0 {
        bail!("--sq must be >= 1");
    }

    let glyphs = match &cli.font {
        Some(path) => GlyphChoice::Font(path.clone()),
        None if cli.bitmap_glyphs => GlyphChoice::Embedded,
        None => GlyphChoice::Bundled,
    };
    let renderer = Renderer::from_options(cli.theme.as_deref(), &glyphs)?;
    let cfg = DatasetConfig {
        samples: cli.n,
        out_dir: cli.out.clone(),
        square_size: cli.square_size,
        sprite_dir: cli.sprites.clone(),
        max_plies: cli.max_plies,
    };

    let pb = if cli.no_progress {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(cli.n as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?,
    );

    let mut rng = seeded_rng(cli.seed);
    let summary = generate_dataset(&cfg, &renderer, &mut rng, &mut |id| {
        pb.set_message(id.to_string());
        pb.inc(1);
    })
    .with_context(|| format!("dataset generation failed in {}", cli.out.display()))?;
    pb.finish_and_clear();

    println!("Wrote {} samples", summary.samples);
    if !summary.failures.is_empty() {
        println!("Skipped {} samples:", summary.failures.len());
        for failure in &summary.failures {
            println!("  {}: {}  -->  {}", failure.id, failure.fen, failure.reason);
        }
    }
    println!("Images: {}", summary.images_dir.display());
    println!("Metadata: {}", summary.metadata.display());
    Ok(())
}
