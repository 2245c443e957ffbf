use serde::{Deserialize, Serialize};
use shakmaty::Color;
use std::time::Duration;

/// 探索1回ぶんの評価情報。JSONL ログにそのまま書き出す。
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct EvalLog {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_cp: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_mate: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seldepth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nps: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pv: Option<Vec<String>>,
}

/// 探索中に流れてくる `info` 行の最新値（multipv 1 のみ）。
#[derive(Default, Clone, Debug)]
pub struct InfoSnapshot {
    pub score_cp: Option<i32>,
    pub score_mate: Option<i32>,
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub nodes: Option<u64>,
    pub time_ms: Option<u64>,
    pub nps: Option<u64>,
    pub pv: Vec<String>,
}

impl InfoSnapshot {
    pub fn update_from_line(&mut self, line: &str) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.first().copied() != Some("info") {
            return;
        }
        let multipv = tokens
            .windows(2)
            .find(|w| w[0] == "multipv")
            .and_then(|w| w[1].parse::<u32>().ok())
            .unwrap_or(1);
        if multipv != 1 {
            return;
        }

        let mut rest = tokens[1..].iter();
        while let Some(&key) = rest.next() {
            match key {
                "depth" => self.depth = rest.next().and_then(|v| v.parse().ok()),
                "seldepth" => self.seldepth = rest.next().and_then(|v| v.parse().ok()),
                "nodes" => self.nodes = rest.next().and_then(|v| v.parse().ok()),
                "time" => self.time_ms = rest.next().and_then(|v| v.parse().ok()),
                "nps" => self.nps = rest.next().and_then(|v| v.parse().ok()),
                "score" => match (rest.next().copied(), rest.next()) {
                    (Some("cp"), Some(v)) => {
                        self.score_cp = v.parse().ok();
                        self.score_mate = None;
                    }
                    (Some("mate"), Some(v)) => {
                        self.score_mate = v.parse().ok();
                        self.score_cp = None;
                    }
                    _ => {}
                },
                "pv" => {
                    let pv: Vec<String> = rest.by_ref().map(|mv| mv.to_string()).collect();
                    if !pv.is_empty() {
                        self.pv = pv;
                    }
                }
                // `string` 以降は自由文なので読み捨てる
                "string" => break,
                _ => {}
            }
        }
    }

    pub fn into_eval_log(self) -> Option<EvalLog> {
        let empty = self.score_cp.is_none()
            && self.score_mate.is_none()
            && self.depth.is_none()
            && self.seldepth.is_none()
            && self.nodes.is_none()
            && self.time_ms.is_none()
            && self.nps.is_none()
            && self.pv.is_empty();
        if empty {
            return None;
        }
        Some(EvalLog {
            score_cp: self.score_cp,
            score_mate: self.score_mate,
            depth: self.depth,
            seldepth: self.seldepth,
            nodes: self.nodes,
            time_ms: self.time_ms,
            nps: self.nps,
            pv: (!self.pv.is_empty()).then_some(self.pv),
        })
    }
}

pub struct SearchOutcome {
    /// `bestmove (none)` のときは `None`
    pub bestmove: Option<String>,
    pub ponder: Option<String>,
    pub elapsed_ms: u64,
    pub eval: Option<EvalLog>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameOutcome {
    InProgress,
    WhiteWin,
    BlackWin,
    Draw,
}

impl GameOutcome {
    pub fn label(self) -> &'static str {
        match self {
            GameOutcome::InProgress => "in_progress",
            GameOutcome::WhiteWin => "white_win",
            GameOutcome::BlackWin => "black_win",
            GameOutcome::Draw => "draw",
        }
    }

    pub fn win_for(color: Color) -> Self {
        match color {
            Color::White => GameOutcome::WhiteWin,
            Color::Black => GameOutcome::BlackWin,
        }
    }
}

/// 指し手を選んだ主体
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mover {
    Engine,
    Operator,
}

pub fn side_label(color: Color) -> char {
    if color == Color::White { 'w' } else { 'b' }
}

pub fn duration_to_millis(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}

/// エンジンの標準出力 1 行ごとに呼ばれるコールバック
pub type LineCallback<'a> = dyn FnMut(&str) + 'a;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_snapshot_parses_primary_pv() {
        let mut snap = InfoSnapshot::default();
        snap.update_from_line(
            "info depth 10 seldepth 12 multipv 1 score cp 34 nodes 12345 nps 890 time 67 pv e2e4 e7e5",
        );
        assert_eq!(snap.depth, Some(10));
        assert_eq!(snap.seldepth, Some(12));
        assert_eq!(snap.nodes, Some(12_345));
        assert_eq!(snap.time_ms, Some(67));
        assert_eq!(snap.nps, Some(890));
        assert_eq!(snap.score_cp, Some(34));
        assert_eq!(snap.score_mate, None);
        assert_eq!(snap.pv, vec!["e2e4".to_string(), "e7e5".to_string()]);

        // multipv != 1 は無視される
        snap.update_from_line("info depth 20 multipv 2 score cp 100 pv d2d4");
        assert_eq!(snap.depth, Some(10));

        snap.update_from_line("info depth 11 score mate -3 pv g1f3");
        assert_eq!(snap.score_mate, Some(-3));
        assert_eq!(snap.score_cp, None);
    }

    #[test]
    fn info_string_lines_do_not_clobber_values() {
        let mut snap = InfoSnapshot::default();
        snap.update_from_line("info depth 5 score cp 12");
        snap.update_from_line("info string NNUE evaluation using nn.nnue depth 99");
        assert_eq!(snap.depth, Some(5));
        let eval = snap.into_eval_log().unwrap();
        assert_eq!(eval.score_cp, Some(12));
        assert_eq!(eval.pv, None);
    }

    #[test]
    fn empty_snapshot_has_no_eval() {
        assert!(InfoSnapshot::default().into_eval_log().is_none());
    }
}
