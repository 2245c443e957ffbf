//! 外部エンジンとの対局ループ。
//!
//! 2 つのモードがある。
//!
//! - 自己対局 ([`run_selfplay`]): エンジンの指し手を表示し、相手側の指し手は
//!   オペレータが入力する。入力は**合法性チェックなしで**そのまま手順に積む。
//!   誤った手を入れた場合の挙動はエンジン任せになる（既知の制約）。
//! - 対話対局 ([`run_interactive`]): オペレータが片側を持ち、入力は現局面の
//!   合法手として検証する。不正な入力は再入力を促すだけでセッションは続く。
//!
//! どちらもエンジンの異常終了・不正な出力は致命的エラーとして呼び出し元へ返す。

use std::collections::HashMap;
use std::io::{BufRead, Write};

use shakmaty::{Chess, Color, Position};

use crate::error::{ToolError, ToolResult};
use crate::position::{
    GameStatus, color_name, game_status, move_to_uci, parse_operator_move, parse_uci_move,
    repetition_key, to_fen,
};

use super::position::{ParsedPosition, build_position, describe_position};
use super::process::EngineProcess;
use super::types::{EvalLog, GameOutcome, LineCallback, Mover, SearchOutcome};

pub const DEFAULT_DEPTH: u32 = 12;

/// オペレータとのやりとり。標準入出力のほか、テストではバッファを渡す。
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// プロンプトを出して 1 行読む。入力終端なら `None`。
    pub fn prompt(&mut self, msg: &str) -> ToolResult<Option<String>> {
        write!(self.output, "{msg}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub fn say(&mut self, msg: &str) -> ToolResult<()> {
        writeln!(self.output, "{msg}")?;
        self.output.flush()?;
        Ok(())
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

fn is_quit(text: &str) -> bool {
    text.eq_ignore_ascii_case("quit") || text.eq_ignore_ascii_case("q")
}

pub struct SessionConfig {
    pub depth: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
        }
    }
}

/// 1 手ごとに呼ばれるイベント
pub struct MoveEvent<'a> {
    pub ply: u32,
    pub side: Color,
    /// 自己対局モードでは相手側の手を検証しないため、局面を持たないことがある
    pub fen_before: Option<String>,
    pub move_text: &'a str,
    pub mover: Mover,
    pub eval: Option<&'a EvalLog>,
    /// エンジンの手のみ: `go` から `bestmove` までの時間
    pub elapsed_ms: Option<u64>,
    /// エンジンの手のみ: `bestmove … ponder` の予想応手
    pub ponder: Option<&'a str>,
}

/// セッション終了時のまとめ
pub struct SessionResult {
    pub outcome: GameOutcome,
    pub reason: String,
    pub plies: u32,
    pub moves: Vec<String>,
}

impl SessionResult {
    fn new(outcome: GameOutcome, reason: &str, state: &ParsedPosition, plies: u32) -> Self {
        Self {
            outcome,
            reason: reason.to_string(),
            plies,
            moves: state.moves.clone(),
        }
    }
}

fn status_outcome(status: GameStatus) -> GameOutcome {
    match status {
        GameStatus::Ongoing => GameOutcome::InProgress,
        GameStatus::Checkmate { winner } => GameOutcome::win_for(winner),
        _ => GameOutcome::Draw,
    }
}

/// 自己対局モード。エンジンが手を返すたびに相手の手を入力してもらう。
pub fn run_selfplay<R: BufRead, W: Write>(
    engine: &mut EngineProcess,
    start: &ParsedPosition,
    config: &SessionConfig,
    console: &mut Console<R, W>,
    on_move: &mut dyn FnMut(&MoveEvent<'_>),
    mut on_line: Option<&mut LineCallback<'_>>,
) -> ToolResult<SessionResult> {
    let mut side = build_position(start)?.turn();
    let mut state = start.clone();
    let mut plies = 0u32;
    engine.new_game()?;

    loop {
        let cb = on_line.as_deref_mut();
        let search = engine.search(&describe_position(&state), config.depth, cb)?;
        let Some(best) = search.bestmove else {
            console.say("\nEngine has no move in this position.")?;
            return Ok(SessionResult::new(GameOutcome::InProgress, "no_move", &state, plies));
        };
        plies += 1;
        on_move(&MoveEvent {
            ply: plies,
            side,
            fen_before: None,
            move_text: &best,
            mover: Mover::Engine,
            eval: search.eval.as_ref(),
            elapsed_ms: Some(search.elapsed_ms),
            ponder: search.ponder.as_deref(),
        });
        console.say(&format!("\nEngine plays: {best}\n"))?;
        state.moves.push(best);
        side = side.other();

        let reply = loop {
            match console.prompt("Enter opponent's move (or 'quit'): ")? {
                None => break None,
                Some(text) if is_quit(&text) => break None,
                Some(text) if text.is_empty() => continue,
                Some(text) => break Some(text),
            }
        };
        let Some(reply) = reply else {
            return Ok(SessionResult::new(GameOutcome::InProgress, "quit", &state, plies));
        };
        plies += 1;
        on_move(&MoveEvent {
            ply: plies,
            side,
            fen_before: None,
            move_text: &reply,
            mover: Mover::Operator,
            eval: None,
            elapsed_ms: None,
            ponder: None,
        });
        state.moves.push(reply);
        side = side.other();
    }
}

/// 対話対局モード。`operator_side` 側の手はオペレータが入力する。
pub fn run_interactive<R: BufRead, W: Write>(
    engine: &mut EngineProcess,
    start: &ParsedPosition,
    operator_side: Color,
    config: &SessionConfig,
    console: &mut Console<R, W>,
    on_move: &mut dyn FnMut(&MoveEvent<'_>),
    mut on_line: Option<&mut LineCallback<'_>>,
) -> ToolResult<SessionResult> {
    let mut pos: Chess = build_position(start)?;
    let mut state = start.clone();
    let mut plies = 0u32;
    let mut seen: HashMap<String, u32> = HashMap::new();
    seen.insert(repetition_key(&pos), 1);
    engine.new_game()?;
    console.say(&format!("You play {}.", color_name(operator_side)))?;

    loop {
        let repetitions = seen.get(&repetition_key(&pos)).copied().unwrap_or(1);
        let status = game_status(&pos, repetitions);
        if status.is_over() {
            let outcome = status_outcome(status);
            console.say(&format!("Game over: {} ({})", outcome.label(), status.reason()))?;
            return Ok(SessionResult::new(outcome, status.reason(), &state, plies));
        }

        let side = pos.turn();
        let fen_before = to_fen(&pos);
        let (mv, mover, search): (_, _, Option<SearchOutcome>) = if side == operator_side {
            console.say(&format!("\nPosition: {fen_before}"))?;
            let Some(text) = console.prompt(&format!("Your move ({}): ", color_name(side)))?
            else {
                return Ok(SessionResult::new(GameOutcome::InProgress, "quit", &state, plies));
            };
            if is_quit(&text) {
                return Ok(SessionResult::new(GameOutcome::InProgress, "quit", &state, plies));
            }
            match parse_operator_move(&pos, &text) {
                Ok(mv) => (mv, Mover::Operator, None),
                Err(e) if e.is_recoverable() => {
                    console.say(&e.to_string())?;
                    continue;
                }
                Err(e) => return Err(e),
            }
        } else {
            let cb = on_line.as_deref_mut();
            let search = engine.search(&describe_position(&state), config.depth, cb)?;
            let Some(best) = search.bestmove.as_deref() else {
                return Err(ToolError::protocol(
                    &engine.label,
                    "engine returned no move in a position that is not game over",
                ));
            };
            let mv = parse_uci_move(&pos, best).ok_or_else(|| {
                ToolError::protocol(&engine.label, format!("engine played illegal move '{best}'"))
            })?;
            console.say(&format!("\nEngine plays: {best}"))?;
            (mv, Mover::Engine, Some(search))
        };

        let uci = move_to_uci(&mv);
        pos.play_unchecked(mv);
        plies += 1;
        *seen.entry(repetition_key(&pos)).or_insert(0) += 1;
        on_move(&MoveEvent {
            ply: plies,
            side,
            fen_before: Some(fen_before),
            move_text: &uci,
            mover,
            eval: search.as_ref().and_then(|s| s.eval.as_ref()),
            elapsed_ms: search.as_ref().map(|s| s.elapsed_ms),
            ponder: search.as_ref().and_then(|s| s.ponder.as_deref()),
        });
        state.moves.push(uci);
    }
}
