use shakmaty::{Chess, Position};

use crate::error::{ToolError, ToolResult};
use crate::position::{parse_uci_move, validate_fen};

/// UCI position 行を分解した結果。対局中はここに指し手を積んでいく。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedPosition {
    pub startpos: bool,
    pub fen: Option<String>,
    pub moves: Vec<String>,
}

impl Default for ParsedPosition {
    fn default() -> Self {
        Self {
            startpos: true,
            fen: None,
            moves: Vec::new(),
        }
    }
}

/// 開始局面の指定を解釈する。`position ...` 行と生の FEN の両方を受け付ける。
pub fn load_start_position(arg: Option<&str>) -> ToolResult<ParsedPosition> {
    let Some(text) = arg else {
        return Ok(ParsedPosition::default());
    };
    let parsed = if text.trim_start().starts_with("position") {
        parse_position_line(text)?
    } else {
        parse_fen_only(text)?
    };
    // 開始局面と初期手順の合法性をここで確定させる
    build_position(&parsed)?;
    Ok(parsed)
}

/// `position ...` 形式の行をパースする。
pub fn parse_position_line(line: &str) -> ToolResult<ParsedPosition> {
    let mut tokens = line.split_whitespace().peekable();
    if tokens.peek().is_some_and(|tok| *tok == "position") {
        tokens.next();
    }
    match tokens.next() {
        Some("startpos") => Ok(ParsedPosition {
            startpos: true,
            fen: None,
            moves: parse_moves(line, tokens)?,
        }),
        Some("fen") => {
            let mut fen_tokens = Vec::new();
            while let Some(token) = tokens.next_if(|tok| *tok != "moves") {
                fen_tokens.push(token);
            }
            if fen_tokens.is_empty() {
                return Err(ToolError::validation(line, "missing FEN payload"));
            }
            Ok(ParsedPosition {
                startpos: false,
                fen: Some(fen_tokens.join(" ")),
                moves: parse_moves(line, tokens)?,
            })
        }
        other => Err(ToolError::validation(
            line,
            format!("expected 'startpos' or 'fen' after 'position', got {other:?}"),
        )),
    }
}

/// FEN 文字列だけが渡されたときの簡易パーサ。
pub fn parse_fen_only(line: &str) -> ToolResult<ParsedPosition> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ToolError::validation(line, "empty FEN"));
    }
    Ok(ParsedPosition {
        startpos: false,
        fen: Some(trimmed.to_string()),
        moves: Vec::new(),
    })
}

fn parse_moves<'a, I>(line: &str, iter: I) -> ToolResult<Vec<String>>
where
    I: Iterator<Item = &'a str>,
{
    let mut iter = iter.peekable();
    match iter.peek() {
        Some(&"moves") => {
            iter.next();
            Ok(iter.map(|mv| mv.to_string()).collect())
        }
        Some(other) => Err(ToolError::validation(
            line,
            format!("expected 'moves' before move list, got '{other}'"),
        )),
        None => Ok(Vec::new()),
    }
}

/// 開始局面に手順を適用した局面を作る。途中に非合法手があればエラー。
pub fn build_position(parsed: &ParsedPosition) -> ToolResult<Chess> {
    let mut pos = match (&parsed.fen, parsed.startpos) {
        (_, true) => Chess::default(),
        (Some(fen), false) => validate_fen(fen)?,
        (None, false) => return Err(ToolError::validation("", "missing FEN payload")),
    };
    for mv_str in &parsed.moves {
        let mv = parse_uci_move(&pos, mv_str).ok_or_else(|| {
            ToolError::validation(
                &describe_position(parsed),
                format!("illegal move '{mv_str}' in start position"),
            )
        })?;
        pos.play_unchecked(mv);
    }
    Ok(pos)
}

/// エンジンへ送る `position` コマンドを組み立てる。
pub fn describe_position(parsed: &ParsedPosition) -> String {
    let mut buf = String::from("position ");
    if parsed.startpos {
        buf.push_str("startpos");
    } else if let Some(fen) = &parsed.fen {
        buf.push_str("fen ");
        buf.push_str(fen);
    }
    if !parsed.moves.is_empty() {
        buf.push_str(" moves ");
        buf.push_str(&parsed.moves.join(" "));
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_position_line_covers_startpos_and_fen() {
        let parsed = parse_position_line("position startpos moves e2e4 e7e5").unwrap();
        assert!(parsed.startpos);
        assert_eq!(parsed.moves, vec!["e2e4", "e7e5"]);

        let fen_line =
            "position fen rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1 moves c7c5";
        let parsed_fen = parse_position_line(fen_line).unwrap();
        assert!(!parsed_fen.startpos);
        assert_eq!(parsed_fen.moves, vec!["c7c5"]);
        assert!(parsed_fen.fen.as_deref().is_some_and(|s| s.ends_with("b KQkq - 0 1")));
    }

    #[test]
    fn parse_position_line_rejects_missing_moves_keyword() {
        assert!(parse_position_line("position startpos e2e4").is_err());
        assert!(parse_position_line("position fen").is_err());
    }

    #[test]
    fn describe_round_trips_the_command() {
        let mut parsed = ParsedPosition::default();
        assert_eq!(describe_position(&parsed), "position startpos");
        parsed.moves.push("e2e4".to_string());
        parsed.moves.push("c7c5".to_string());
        assert_eq!(describe_position(&parsed), "position startpos moves e2e4 c7c5");

        let fen = parse_fen_only("8/8/4k3/8/8/4K3/4R3/8 w - - 0 1").unwrap();
        assert_eq!(describe_position(&fen), "position fen 8/8/4k3/8/8/4K3/4R3/8 w - - 0 1");
    }

    #[test]
    fn load_start_position_checks_legality() {
        assert!(load_start_position(None).unwrap().startpos);
        assert!(load_start_position(Some("position startpos moves e2e4 e7e5")).is_ok());
        assert!(load_start_position(Some("position startpos moves e2e5")).is_err());
        assert!(load_start_position(Some("8/8/8/8/8/8/8/8 w - - 0 1")).is_err());
        let pos = build_position(&load_start_position(Some("position startpos moves e2e4")).unwrap())
            .unwrap();
        assert_eq!(pos.turn(), shakmaty::Color::Black);
    }
}
