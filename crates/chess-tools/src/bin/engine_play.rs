use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chess_tools::engine::{
    Console, DEFAULT_DEPTH, EngineConfig, EngineProcess, EvalLog, MoveEvent, Mover, SessionConfig,
    SessionResult, describe_position, load_start_position, resolve_engine_path, run_interactive,
    run_selfplay, side_label,
};
use chrono::Local;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use shakmaty::Color;

/// UCI エンジンとの対局セッション。
///
/// # よく使うコマンド例
///
/// - 自己対局（エンジンの手を表示し、相手の手を入力する）:
///   `cargo run -p chess-tools --bin engine_play -- --engine-path stockfish`
///
/// - 黒を持って対局、深さ 8、ログ付き:
///   `cargo run -p chess-tools --bin engine_play -- --mode interactive --side black --depth 8 --log`
///
/// - 途中局面から:
///   `cargo run -p chess-tools --bin engine_play -- --fen "position startpos moves e2e4 e7e5"`
///
/// `--log` 指定時、`--out` 未指定なら `runs/play/<timestamp>-play.jsonl` に書き出す。
#[derive(Parser, Debug)]
#[command(author, version, about = "Play against a UCI chess engine")]
struct Cli {
    /// Session mode
    #[arg(long, value_enum, default_value_t = Mode::Selfplay)]
    mode: Mode,

    /// Side played by the operator in interactive mode
    #[arg(long, value_enum, default_value_t = Side::White)]
    side: Side,

    /// Path to the engine binary (falls back to $UCI_ENGINE, then `stockfish` on PATH)
    #[arg(long)]
    engine_path: Option<PathBuf>,

    /// Extra arguments passed to the engine process
    #[arg(long, num_args = 1..)]
    engine_args: Option<Vec<String>>,

    /// UCI options to set (format: "Name=Value", can be specified multiple times)
    #[arg(long = "uci-option", num_args = 1..)]
    uci_options: Option<Vec<String>>,

    /// Fixed search depth per engine move
    #[arg(long, default_value_t = DEFAULT_DEPTH)]
    depth: u32,

    /// Start position as FEN or full UCI position command
    #[arg(long)]
    fen: Option<String>,

    /// Give up when the engine is silent for this long (milliseconds)
    #[arg(long)]
    read_timeout_ms: Option<u64>,

    /// Write a JSONL move log
    #[arg(long, default_value_t = false)]
    log: bool,

    /// Move log path (implies --log; defaults to runs/play/<timestamp>-play.jsonl)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Do not echo raw engine output
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Selfplay,
    Interactive,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Side {
    White,
    Black,
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum LogEntry<'a> {
    Meta {
        mode: &'a str,
        engine: &'a str,
        engine_name: Option<&'a str>,
        start: String,
        depth: u32,
        timestamp: String,
    },
    Move {
        ply: u32,
        side: char,
        mover: Mover,
        #[serde(skip_serializing_if = "Option::is_none")]
        fen_before: Option<&'a str>,
        #[serde(rename = "move")]
        move_text: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        eval: Option<&'a EvalLog>,
        #[serde(skip_serializing_if = "Option::is_none")]
        elapsed_ms: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        ponder: Option<&'a str>,
    },
    Result {
        outcome: &'a str,
        reason: &'a str,
        plies: u32,
        moves: &'a [String],
    },
}

struct MoveLog {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl MoveLog {
    fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let file =
            File::create(path).with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
        })
    }

    fn write(&mut self, entry: &LogEntry<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

fn resolve_output_path(out: Option<&Path>, timestamp: &chrono::DateTime<Local>) -> PathBuf {
    if let Some(path) = out {
        return path.to_path_buf();
    }
    let dir = PathBuf::from("runs/play");
    let name = format!("{}-play.jsonl", timestamp.format("%Y%m%d-%H%M%S"));
    dir.join(name)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let start = load_start_position(cli.fen.as_deref())?;
    let engine_path = resolve_engine_path(cli.engine_path.as_deref());
    let cfg = EngineConfig {
        path: engine_path.clone(),
        args: cli.engine_args.clone().unwrap_or_default(),
        read_timeout: cli.read_timeout_ms.map(Duration::from_millis),
        uci_options: cli.uci_options.clone().unwrap_or_default(),
    };
    let mut engine = EngineProcess::spawn(&cfg, "engine".to_string())?;

    let mode = match cli.mode {
        Mode::Selfplay => "selfplay",
        Mode::Interactive => "interactive",
    };
    let timestamp = Local::now();
    let mut log = if cli.log || cli.out.is_some() {
        let path = resolve_output_path(cli.out.as_deref(), &timestamp);
        let mut log = MoveLog::create(&path)?;
        log.write(&LogEntry::Meta {
            mode,
            engine: &engine_path.display().to_string(),
            engine_name: engine.id_name.as_deref(),
            start: describe_position(&start),
            depth: cli.depth,
            timestamp: timestamp.to_rfc3339(),
        })?;
        Some(log)
    } else {
        None
    };

    let mut log_error = None;
    let mut on_move = |ev: &MoveEvent<'_>| {
        let Some(log) = log.as_mut() else {
            return;
        };
        if log_error.is_some() {
            return;
        }
        let entry = LogEntry::Move {
            ply: ev.ply,
            side: side_label(ev.side),
            mover: ev.mover,
            fen_before: ev.fen_before.as_deref(),
            move_text: ev.move_text,
            eval: ev.eval,
            elapsed_ms: ev.elapsed_ms,
            ponder: ev.ponder,
        };
        if let Err(e) = log.write(&entry) {
            log_error = Some(e);
        }
    };
    let mut echo = |line: &str| println!("{line}");
    let on_line: Option<&mut dyn FnMut(&str)> = if cli.quiet { None } else { Some(&mut echo) };

    let session = SessionConfig { depth: cli.depth };
    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), io::stdout());
    let result: SessionResult = match cli.mode {
        Mode::Selfplay => {
            run_selfplay(&mut engine, &start, &session, &mut console, &mut on_move, on_line)?
        }
        Mode::Interactive => run_interactive(
            &mut engine,
            &start,
            cli.side.into(),
            &session,
            &mut console,
            &mut on_move,
            on_line,
        )?,
    };
    if let Some(e) = log_error {
        return Err(e.context("failed to write move log"));
    }

    println!(
        "\nResult: {} ({}) after {} plies",
        result.outcome.label(),
        result.reason,
        result.plies
    );
    if let Some(log) = log.as_mut() {
        log.write(&LogEntry::Result {
            outcome: result.outcome.label(),
            reason: &result.reason,
            plies: result.plies,
            moves: &result.moves,
        })?;
        println!("Log: {}", log.path.display());
    }
    Ok(())
}
