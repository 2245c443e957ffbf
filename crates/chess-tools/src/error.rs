//! Error types shared by every tool in this crate.

/// Errors raised by the engine session, the renderer and the dataset tools.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    /// FEN が構文的に壊れている、またはルール上ありえない局面
    #[error("invalid position '{fen}': {reason}")]
    Validation { fen: String, reason: String },

    /// エンジンプロセスの終了、あるいは解釈できない出力
    #[error("{label}: {message}")]
    EngineProtocol { label: String, message: String },

    /// 駒を描くためのスプライトもグリフも無い
    #[error("render failed: {0}")]
    Render(String),

    /// 対話モードでの不正な指し手入力（再入力で回復可能）
    #[error("invalid move '{input}': {reason}")]
    UserInput { input: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Theme(#[from] toml::de::Error),
}

impl ToolError {
    pub fn validation(fen: &str, reason: impl ToString) -> Self {
        ToolError::Validation {
            fen: fen.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn protocol(label: &str, message: impl ToString) -> Self {
        ToolError::EngineProtocol {
            label: label.to_string(),
            message: message.to_string(),
        }
    }

    pub fn user_input(input: &str, reason: impl ToString) -> Self {
        ToolError::UserInput {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// 操作を継続できるエラーかどうか。対話入力の誤りだけが該当する。
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ToolError::UserInput { .. })
    }
}

/// Result type for this crate.
pub type ToolResult<T> = Result<T, ToolError>;
