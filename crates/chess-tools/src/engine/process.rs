use std::collections::HashSet;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::error::{ToolError, ToolResult};

use super::types::{InfoSnapshot, LineCallback, SearchOutcome, duration_to_millis};

pub const ENGINE_QUIT_TIMEOUT: Duration = Duration::from_millis(300);
pub const ENGINE_QUIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// エンジンパスを指定しない場合に参照する環境変数
pub const ENGINE_PATH_ENV: &str = "UCI_ENGINE";
const FALLBACK_ENGINE: &str = "stockfish";

/// エンジンプロセス起動時の設定。
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub args: Vec<String>,
    /// 1 行読むまでの待ち時間上限。`None` なら無期限に待つ。
    pub read_timeout: Option<Duration>,
    /// 追加の UCI オプション (Name=Value 形式)
    pub uci_options: Vec<String>,
}

impl EngineConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
            read_timeout: None,
            uci_options: Vec::new(),
        }
    }
}

/// `bestmove` 行の解釈結果
#[derive(Debug, PartialEq, Eq)]
pub enum BestMoveLine {
    Move { mv: String, ponder: Option<String> },
    /// `bestmove (none)` / `bestmove 0000`
    NoMove,
    /// マーカーはあるが指し手トークンが無い
    Malformed,
}

/// 行に `bestmove` マーカーが含まれていれば、その直後のトークンを取り出す。
pub fn parse_bestmove(line: &str) -> Option<BestMoveLine> {
    let mut tokens = line.split_whitespace();
    tokens.by_ref().find(|tok| *tok == "bestmove")?;
    let parsed = match tokens.next() {
        None => BestMoveLine::Malformed,
        Some("(none)") | Some("0000") => BestMoveLine::NoMove,
        Some(mv) => {
            let ponder = match (tokens.next(), tokens.next()) {
                (Some("ponder"), Some(p)) => Some(p.to_string()),
                _ => None,
            };
            BestMoveLine::Move {
                mv: mv.to_string(),
                ponder,
            }
        }
    };
    Some(parsed)
}

/// 1本のエンジンに対する入出力をカプセル化する。
///
/// 標準出力は別スレッドで行単位に読み、チャネル経由で受け取る。
/// 破棄時に `quit` を送り、応答がなければ kill して回収する。
pub struct EngineProcess {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    rx: Receiver<String>,
    opt_names: HashSet<String>,
    read_timeout: Option<Duration>,
    pub id_name: Option<String>,
    pub label: String,
}

impl EngineProcess {
    pub fn spawn(cfg: &EngineConfig, label: String) -> ToolResult<Self> {
        let mut cmd = Command::new(&cfg.path);
        if !cfg.args.is_empty() {
            cmd.args(&cfg.args);
        }
        let mut child = cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).spawn().map_err(|e| {
            ToolError::protocol(
                &label,
                format!("failed to spawn engine at {}: {e}", cfg.path.display()),
            )
        })?;
        let stdin = child.stdin.take().ok_or_else(|| ToolError::protocol(&label, "no stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| ToolError::protocol(&label, "no stdout"))?;
        let (tx, rx) = mpsc::channel::<String>();
        std::thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                match line {
                    Ok(l) => {
                        if tx.send(l).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        log::info!("{label}: started {}", cfg.path.display());
        let mut proc = Self {
            child,
            stdin: BufWriter::new(stdin),
            rx,
            opt_names: HashSet::new(),
            read_timeout: cfg.read_timeout,
            id_name: None,
            label,
        };
        proc.initialize(cfg)?;
        Ok(proc)
    }

    fn initialize(&mut self, cfg: &EngineConfig) -> ToolResult<()> {
        self.write_line("uci")?;
        loop {
            let line = self.recv_line()?;
            if let Some(rest) = line.strip_prefix("option ") {
                if let Some(name) = parse_option_name(rest) {
                    self.opt_names.insert(name);
                }
            } else if let Some(name) = line.strip_prefix("id name ") {
                self.id_name = Some(name.trim().to_string());
            } else if line.trim() == "uciok" {
                break;
            }
        }
        for opt in &cfg.uci_options {
            if let Some((name, value)) = opt.split_once('=') {
                self.set_option_if_available(name.trim(), value.trim())?;
            } else {
                // "=" が無いものはボタン型オプションとして名前だけ送る
                self.write_line(&format!("setoption name {}", opt.trim()))?;
            }
        }
        self.sync_ready()?;
        log::info!(
            "{}: ready ({})",
            self.label,
            self.id_name.as_deref().unwrap_or("unnamed engine")
        );
        Ok(())
    }

    pub fn new_game(&mut self) -> ToolResult<()> {
        self.write_line("ucinewgame")?;
        self.sync_ready()
    }

    /// `isready` を送り、`readyok` を受け取るまでブロックする。
    pub fn sync_ready(&mut self) -> ToolResult<()> {
        self.write_line("isready")?;
        loop {
            let line = self.recv_line()?;
            if line.trim() == "readyok" {
                return Ok(());
            }
        }
    }

    /// 局面を送って固定深さで探索し、`bestmove` が来るまで出力を読み続ける。
    ///
    /// `on_line`: エンジン出力 1 行ごとのコールバック（`None` なら読み捨て）。
    pub fn search(
        &mut self,
        position_cmd: &str,
        depth: u32,
        on_line: Option<&mut LineCallback<'_>>,
    ) -> ToolResult<SearchOutcome> {
        self.write_line(position_cmd)?;
        self.write_line(&format!("go depth {depth}"))?;

        let start = Instant::now();
        let mut snapshot = InfoSnapshot::default();
        let mut on_line = on_line;
        loop {
            let line = self.recv_line()?;
            if let Some(ref mut cb) = on_line {
                cb(&line);
            }
            if line.starts_with("info") {
                snapshot.update_from_line(&line);
                continue;
            }
            let Some(parsed) = parse_bestmove(&line) else {
                continue;
            };
            let (bestmove, ponder) = match parsed {
                BestMoveLine::Move { mv, ponder } => (Some(mv), ponder),
                BestMoveLine::NoMove => (None, None),
                BestMoveLine::Malformed => {
                    return Err(ToolError::protocol(
                        &self.label,
                        format!("malformed bestmove line: {line}"),
                    ));
                }
            };
            return Ok(SearchOutcome {
                bestmove,
                ponder,
                elapsed_ms: duration_to_millis(start.elapsed()),
                eval: snapshot.into_eval_log(),
            });
        }
    }

    pub fn recv_line(&self) -> ToolResult<String> {
        let line = match self.read_timeout {
            Some(timeout) => self.rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => ToolError::protocol(&self.label, "engine read timeout"),
                RecvTimeoutError::Disconnected => self.exited(),
            })?,
            None => self.rx.recv().map_err(|_| self.exited())?,
        };
        log::debug!("{} > {}", self.label, line);
        Ok(line)
    }

    fn exited(&self) -> ToolError {
        ToolError::protocol(&self.label, "engine exited unexpectedly")
    }

    pub fn set_option_if_available(&mut self, name: &str, value: &str) -> ToolResult<()> {
        if self.opt_names.is_empty() || self.opt_names.contains(name) {
            self.write_line(&format!("setoption name {name} value {value}"))?;
        } else {
            log::warn!("{}: engine does not advertise option '{name}', skipped", self.label);
        }
        Ok(())
    }

    /// 書き込み失敗はエンジン側が既に終了しているとみなす。
    pub fn write_line(&mut self, msg: &str) -> ToolResult<()> {
        log::debug!("{} < {}", self.label, msg);
        let result = self
            .stdin
            .write_all(msg.as_bytes())
            .and_then(|_| self.stdin.write_all(b"\n"))
            .and_then(|_| self.stdin.flush());
        result.map_err(|e| ToolError::protocol(&self.label, format!("failed to send '{msg}': {e}")))
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        let _ = self.write_line("quit");
        let deadline = Instant::now() + ENGINE_QUIT_TIMEOUT;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                return;
            }
            std::thread::sleep(ENGINE_QUIT_POLL_INTERVAL);
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// `option name <NAME> type ...` から NAME を取り出す（空白を含む名前に対応）。
pub fn parse_option_name(line: &str) -> Option<String> {
    let mut tokens = line.split_whitespace();
    tokens.by_ref().find(|tok| *tok == "name")?;
    let parts: Vec<&str> = tokens.take_while(|tok| *tok != "type").collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

/// エンジンバイナリを探す。明示指定 > 環境変数 > PATH 上の stockfish の優先順位。
pub fn resolve_engine_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(p) = std::env::var(ENGINE_PATH_ENV) {
        if !p.trim().is_empty() {
            return PathBuf::from(p);
        }
    }
    PathBuf::from(FALLBACK_ENGINE)
}
