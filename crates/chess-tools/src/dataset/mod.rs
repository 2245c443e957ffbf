//! ランダム局面の画像データセット。
//!
//! 出力ディレクトリ構成:
//!
//! ```text
//! <out>/
//!   metadata.csv        id,fen,turn,move_number,castling_rights,en_passant,is_check,is_game_over
//!   images/000001.png
//!   images/000002.png
//!   ...
//! ```

pub mod generate;
pub mod validate;

pub use generate::{
    DatasetConfig, DatasetRecord, DatasetSummary, IMAGES_DIR, METADATA_FILE, METADATA_HEADER,
    SampleFailure, generate_dataset, image_path, sample_id,
};
pub use validate::{
    DEFAULT_WARNINGS_FILE, ValidationReport, Warning, validate_metadata, write_warnings,
};
