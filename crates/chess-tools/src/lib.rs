//! チェス局面まわりの小さなツール群。
//!
//! - [`engine`]: 外部 UCI エンジンとの対話（自己対局 / 人間対エンジン）
//! - [`render`]: 局面 (FEN) を PNG 画像として描画
//! - [`dataset`]: ランダム局面の画像データセット生成と検証
//!
//! ルール判定は `shakmaty` に、探索は外部エンジンプロセスに委譲する。

pub mod dataset;
pub mod engine;
pub mod error;
pub mod position;
pub mod render;

pub use error::{ToolError, ToolResult};
