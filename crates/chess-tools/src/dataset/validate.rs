use std::fmt;
use std::path::Path;

use crate::error::{ToolError, ToolResult};
use crate::position::validate_fen;

pub const DEFAULT_WARNINGS_FILE: &str = "warnings.txt";

/// 不正だった行 1 つ
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warning {
    pub id: String,
    pub fen: String,
    pub reason: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}  -->  {}", self.id, self.fen, self.reason)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub checked: usize,
    pub warnings: Vec<Warning>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// metadata.csv の各行の FEN を検証する。
///
/// 行単位の問題（読めない行、FEN 欠落、不正局面）はすべて警告として集め、処理は止めない。
/// エラーになるのはファイル自体が開けない場合と `fen` 列が無い場合だけ。
pub fn validate_metadata(path: &Path) -> ToolResult<ValidationReport> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let fen_col = headers.iter().position(|h| h == "fen").ok_or_else(|| {
        ToolError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{}: no 'fen' column", path.display()),
        ))
    })?;
    let id_col = headers.iter().position(|h| h == "id");

    let mut report = ValidationReport::default();
    for (index, result) in reader.records().enumerate() {
        report.checked += 1;
        // ヘッダが 1 行目なのでデータ行は 2 行目から
        let fallback_id = format!("line {}", index + 2);
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                report.warnings.push(Warning {
                    id: fallback_id,
                    fen: String::new(),
                    reason: format!("unreadable row: {e}"),
                });
                continue;
            }
        };
        let id = id_col
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .map_or(fallback_id, str::to_string);
        let Some(fen) = record.get(fen_col).filter(|s| !s.trim().is_empty()) else {
            report.warnings.push(Warning {
                id,
                fen: String::new(),
                reason: "missing fen".to_string(),
            });
            continue;
        };
        if let Err(e) = validate_fen(fen) {
            let reason = match e {
                ToolError::Validation { reason, .. } => reason,
                other => other.to_string(),
            };
            report.warnings.push(Warning {
                id,
                fen: fen.to_string(),
                reason,
            });
        }
    }

    log::info!(
        "checked {} rows in {}, {} warnings",
        report.checked,
        path.display(),
        report.warnings.len()
    );
    Ok(report)
}

/// 警告を 1 行ずつ書き出す。警告が無ければファイルは作らず `false` を返す。
pub fn write_warnings(report: &ValidationReport, path: &Path) -> ToolResult<bool> {
    if report.is_clean() {
        return Ok(false);
    }
    let mut text = String::new();
    for warning in &report.warnings {
        text.push_str(&warning.to_string());
        text.push('\n');
    }
    std::fs::write(path, text)?;
    Ok(true)
}
