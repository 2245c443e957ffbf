//! 局面の検証・ランダム生成・派生情報の抽出。
//!
//! 合法性の判定はすべて `shakmaty` に委譲する。ここにあるのはその薄い
//! ラッパーと、データセット / 対局ループが共通で使う小さな関数だけ。

use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position};

use crate::error::{ToolError, ToolResult};

/// 平手初期局面の FEN
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// ランダム局面生成で最低限進める手数
pub const MIN_RANDOM_PLIES: u32 = 10;

/// ランダム局面生成の手数上限の既定値
pub const DEFAULT_MAX_PLIES: u32 = 80;

/// 50手ルール（半手カウンタ）
const FIFTY_MOVE_HALFMOVES: u32 = 100;

/// FEN をパースし、ルール上ありえる局面であることを確認する。
///
/// 構文エラーだけでなく、手番でない側のキングが取られる状態や
/// 同色キングが2枚ある局面なども `ToolError::Validation` になる。
pub fn validate_fen(fen: &str) -> ToolResult<Chess> {
    let trimmed = fen.trim();
    if trimmed.is_empty() {
        return Err(ToolError::validation(fen, "empty FEN"));
    }
    let setup = Fen::from_ascii(trimmed.as_bytes()).map_err(|e| ToolError::validation(fen, e))?;
    setup
        .into_position::<Chess>(CastlingMode::Standard)
        .map_err(|e| ToolError::validation(fen, e))
}

pub fn is_legal_fen(fen: &str) -> bool {
    validate_fen(fen).is_ok()
}

pub fn to_fen(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// ランダムプレイアウトで得た局面と、実際に進めた手数。
pub struct RandomPosition {
    pub position: Chess,
    pub plies: u32,
}

/// 初期局面から一様ランダムな合法手を `MIN_RANDOM_PLIES..=max_plies` 手進める。
///
/// 途中で終局したらそこで止める。`max_plies` が下限より小さい場合は
/// `max_plies..=max_plies` として扱う。
pub fn random_legal_position<R: Rng + ?Sized>(max_plies: u32, rng: &mut R) -> RandomPosition {
    let mut pos = Chess::default();
    let lower = MIN_RANDOM_PLIES.min(max_plies);
    let target = rng.random_range(lower..=max_plies);
    let mut plies = 0;
    while plies < target {
        let moves = pos.legal_moves();
        let Some(mv) = moves.choose(rng) else {
            break;
        };
        pos.play_unchecked(mv.clone());
        plies += 1;
        if game_status(&pos, 1).is_over() {
            break;
        }
    }
    RandomPosition {
        position: pos,
        plies,
    }
}

pub fn random_legal_fen<R: Rng + ?Sized>(max_plies: u32, rng: &mut R) -> String {
    to_fen(&random_legal_position(max_plies, rng).position)
}

/// `seed` があれば再現可能な乱数列、無ければスレッド乱数から種を取る。
pub fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_rng(&mut rand::rng()),
    }
}

/// 終局判定の結果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
    InsufficientMaterial,
    FiftyMoves,
    Repetition,
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        self != GameStatus::Ongoing
    }

    pub fn reason(self) -> &'static str {
        match self {
            GameStatus::Ongoing => "ongoing",
            GameStatus::Checkmate { .. } => "checkmate",
            GameStatus::Stalemate => "stalemate",
            GameStatus::InsufficientMaterial => "insufficient_material",
            GameStatus::FiftyMoves => "fifty_moves",
            GameStatus::Repetition => "threefold_repetition",
        }
    }
}

/// `repetitions` は現局面がこれまでに現れた回数（現局面自身を含む）。
pub fn game_status(pos: &Chess, repetitions: u32) -> GameStatus {
    if pos.is_checkmate() {
        return GameStatus::Checkmate {
            winner: pos.turn().other(),
        };
    }
    if pos.is_stalemate() {
        return GameStatus::Stalemate;
    }
    if pos.is_insufficient_material() {
        return GameStatus::InsufficientMaterial;
    }
    if pos.halfmoves() >= FIFTY_MOVE_HALFMOVES {
        return GameStatus::FiftyMoves;
    }
    if repetitions >= 3 {
        return GameStatus::Repetition;
    }
    GameStatus::Ongoing
}

/// 千日手判定用のキー（駒配置・手番・キャスリング権・アンパッサン）。
pub fn repetition_key(pos: &Chess) -> String {
    to_fen(pos).split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// データセットのメタデータ列に使う局面の派生情報。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionSummary {
    pub fen: String,
    pub turn: Color,
    pub move_number: u32,
    pub castling_rights: String,
    pub en_passant: String,
    pub is_check: bool,
    pub is_game_over: bool,
}

pub fn summarize(pos: &Chess) -> PositionSummary {
    let fen = to_fen(pos);
    let fields: Vec<&str> = fen.split_whitespace().collect();
    let field = |idx: usize| fields.get(idx).copied().unwrap_or("-").to_string();
    PositionSummary {
        castling_rights: field(2),
        en_passant: field(3),
        turn: pos.turn(),
        move_number: pos.fullmoves().get(),
        is_check: pos.is_check(),
        is_game_over: game_status(pos, 1).is_over(),
        fen,
    }
}

pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

pub fn move_to_uci(mv: &Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

/// 対話入力を指し手として解釈する。UCI 形式 (`e2e4`) と SAN (`Nf3`) を受け付ける。
pub fn parse_operator_move(pos: &Chess, input: &str) -> ToolResult<Move> {
    let text = input.trim();
    if text.is_empty() {
        return Err(ToolError::user_input(input, "empty input"));
    }
    if let Ok(uci) = text.parse::<UciMove>() {
        return uci
            .to_move(pos)
            .map_err(|e| ToolError::user_input(text, format!("illegal move: {e}")));
    }
    match text.parse::<SanPlus>() {
        Ok(san) => san
            .san
            .to_move(pos)
            .map_err(|e| ToolError::user_input(text, format!("illegal move: {e}"))),
        Err(_) => Err(ToolError::user_input(text, "expected UCI (e2e4) or SAN (Nf3) notation")),
    }
}

/// エンジンが返した UCI 文字列を現局面の合法手に解決する。
pub fn parse_uci_move(pos: &Chess, text: &str) -> Option<Move> {
    text.parse::<UciMove>().ok()?.to_move(pos).ok()
}
