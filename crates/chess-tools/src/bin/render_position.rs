use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chess_tools::position::{random_legal_fen, seeded_rng};
use chess_tools::render::{
    DEFAULT_MARGIN, DEFAULT_SQUARE_SIZE, GlyphChoice, RenderRequest, Renderer,
};
use clap::{ArgGroup, Parser};

/// FEN から盤面画像 (PNG) を作る。
///
/// # よく使うコマンド例
///
/// - 初期局面を描く:
///   `cargo run -p chess-tools --bin render_position -- --fen "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"`
///
/// - ランダム局面を黒視点で:
///   `cargo run -p chess-tools --bin render_position -- --random 60 --seed 3 --flip --out random.png`
///
/// - スプライトとシステムフォントを使う:
///   `cargo run -p chess-tools --bin render_position -- --random 80 --sprites assets/pieces --system-font`
#[derive(Parser, Debug)]
#[command(author, version, about = "Render a chess position to PNG")]
#[command(group(ArgGroup::new("source").required(true).args(["fen", "random"])))]
struct Cli {
    /// Position to render
    #[arg(long)]
    fen: Option<String>,

    /// Render a random legal position reached in at most MAX_PLIES random plies
    #[arg(long, value_name = "MAX_PLIES")]
    random: Option<u32>,

    /// Seed for --random
    #[arg(long, requires = "random")]
    seed: Option<u64>,

    /// Output PNG path
    #[arg(long, default_value = "board.png")]
    out: PathBuf,

    /// Square size in pixels
    #[arg(long = "sq", default_value_t = DEFAULT_SQUARE_SIZE)]
    square_size: u32,

    /// Margin around the board in pixels
    #[arg(long, default_value_t = DEFAULT_MARGIN)]
    margin: u32,

    /// Draw from Black's point of view
    #[arg(long, default_value_t = false)]
    flip: bool,

    /// Omit coordinate labels
    #[arg(long, default_value_t = false)]
    no_coords: bool,

    /// Directory with piece sprites (wk.png, bq.png, ...)
    #[arg(long)]
    sprites: Option<PathBuf>,

    /// Colour theme (TOML)
    #[arg(long)]
    theme: Option<PathBuf>,

    /// TrueType font with chess symbols
    #[arg(long, conflicts_with_all = ["system_font", "sprites_only"])]
    font: Option<PathBuf>,

    /// Look for a system font with chess symbols
    #[arg(long, default_value_t = false, conflicts_with_all = ["sprites_only", "bitmap_glyphs"])]
    system_font: bool,

    /// Draw pieces with the built-in bitmap glyphs instead of the bundled font
    #[arg(long, default_value_t = false, conflicts_with_all = ["font", "sprites_only"])]
    bitmap_glyphs: bool,

    /// Draw pieces from sprites only (fails if a sprite is missing)
    #[arg(long, default_value_t = false, requires = "sprites")]
    sprites_only: bool,
}

impl Cli {
    fn glyph_choice(&self) -> GlyphChoice {
        if let Some(path) = &self.font {
            GlyphChoice::Font(path.clone())
        } else if self.system_font {
            GlyphChoice::System
        } else if self.sprites_only {
            GlyphChoice::Disabled
        } else if self.bitmap_glyphs {
            GlyphChoice::Embedded
        } else {
            GlyphChoice::Bundled
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let fen = match (&cli.fen, cli.random) {
        (Some(fen), _) => fen.clone(),
        (None, Some(max_plies)) => random_legal_fen(max_plies, &mut seeded_rng(cli.seed)),
        (None, None) => bail!("either --fen or --random is required"),
    };

    let renderer = Renderer::from_options(cli.theme.as_deref(), &cli.glyph_choice())?;
    let req = RenderRequest {
        square_size: cli.square_size,
        margin: cli.margin,
        flipped: cli.flip,
        show_coordinates: !cli.no_coords,
        sprite_dir: cli.sprites.clone(),
        out_path: cli.out.clone(),
    };
    let saved = renderer
        .render_fen(&fen, &req)
        .with_context(|| format!("failed to render {}", cli.out.display()))?;

    println!("Saved: {}", saved.display());
    println!("FEN: {fen}");
    Ok(())
}
