use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};
use shakmaty::Chess;

use crate::error::{ToolError, ToolResult};
use crate::position::{DEFAULT_MAX_PLIES, color_name, random_legal_position, summarize};
use crate::render::geometry::canvas_size;
use crate::render::{RenderRequest, Renderer, SpriteSet};

pub const METADATA_FILE: &str = "metadata.csv";
pub const IMAGES_DIR: &str = "images";
pub const DEFAULT_DATASET_SQUARE_SIZE: u32 = 256;

/// メタデータの列。`DatasetRecord` のフィールド順と一致させる。
pub const METADATA_HEADER: [&str; 8] = [
    "id",
    "fen",
    "turn",
    "move_number",
    "castling_rights",
    "en_passant",
    "is_check",
    "is_game_over",
];

/// metadata.csv の 1 行
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DatasetRecord {
    pub id: String,
    pub fen: String,
    /// `white` / `black`
    pub turn: String,
    pub move_number: u32,
    /// FEN のキャスリング欄（無ければ `-`）
    pub castling_rights: String,
    /// FEN のアンパッサン欄（無ければ `-`）
    pub en_passant: String,
    pub is_check: bool,
    pub is_game_over: bool,
}

impl DatasetRecord {
    pub fn new(id: String, pos: &Chess) -> Self {
        let summary = summarize(pos);
        Self {
            id,
            fen: summary.fen,
            turn: color_name(summary.turn).to_string(),
            move_number: summary.move_number,
            castling_rights: summary.castling_rights,
            en_passant: summary.en_passant,
            is_check: summary.is_check,
            is_game_over: summary.is_game_over,
        }
    }
}

/// 1 始まりの連番を 6 桁ゼロ埋めにしたもの。行 ID と画像ファイル名を兼ねる。
pub fn sample_id(index: usize) -> String {
    format!("{index:06}")
}

#[derive(Clone, Debug)]
pub struct DatasetConfig {
    pub samples: usize,
    pub out_dir: PathBuf,
    pub square_size: u32,
    pub sprite_dir: Option<PathBuf>,
    pub max_plies: u32,
}

impl DatasetConfig {
    pub fn new(samples: usize, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            samples,
            out_dir: out_dir.into(),
            square_size: DEFAULT_DATASET_SQUARE_SIZE,
            sprite_dir: None,
            max_plies: DEFAULT_MAX_PLIES,
        }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.out_dir.join(METADATA_FILE)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.out_dir.join(IMAGES_DIR)
    }
}

/// 描画・保存に失敗して捨てたサンプル
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleFailure {
    pub id: String,
    pub fen: String,
    pub reason: String,
}

pub struct DatasetSummary {
    /// 画像と行を書けたサンプル数
    pub samples: usize,
    pub failures: Vec<SampleFailure>,
    pub metadata: PathBuf,
    pub images_dir: PathBuf,
}

pub fn image_path(images_dir: &Path, id: &str) -> PathBuf {
    images_dir.join(format!("{id}.png"))
}

/// ランダム局面を `cfg.samples` 個生成し、画像と metadata.csv を書き出す。
///
/// 同名ファイルは上書きする（再実行しても前回の結果は残らない）。
/// サンプリングした局面は構成上合法なので、ここでは再検証しない。
/// 各行は画像保存の直後に flush するため、途中で落ちても書けた分は残る。
/// 1 サンプルの描画・保存の失敗は `failures` に記録して続行し、その ID の行は書かない。
/// `on_sample` は成否によらずサンプルごとに ID を渡して呼ぶ。
pub fn generate_dataset<R: Rng + ?Sized>(
    cfg: &DatasetConfig,
    renderer: &Renderer,
    rng: &mut R,
    on_sample: &mut dyn FnMut(&str),
) -> ToolResult<DatasetSummary> {
    if cfg.square_size == 0 {
        return Err(ToolError::Render("square size must be positive".to_string()));
    }
    canvas_size(cfg.square_size, 0)?;

    let images_dir = cfg.images_dir();
    std::fs::create_dir_all(&images_dir)?;
    let metadata = cfg.metadata_path();
    if metadata.exists() {
        log::warn!("{} already exists and will be overwritten", metadata.display());
    }

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(&metadata)?;
    writer.write_record(METADATA_HEADER)?;
    writer.flush()?;

    let mut req = RenderRequest {
        square_size: cfg.square_size,
        margin: 0,
        flipped: false,
        show_coordinates: false,
        sprite_dir: cfg.sprite_dir.clone(),
        ..RenderRequest::default()
    };
    let sprite_px = ((cfg.square_size as f32) * 0.92).round() as u32;
    let sprites = SpriteSet::load_optional(cfg.sprite_dir.as_deref()).scaled(sprite_px);

    let mut written = 0;
    let mut failures = Vec::new();
    for index in 1..=cfg.samples {
        let sample = random_legal_position(cfg.max_plies, rng);
        let id = sample_id(index);
        req.out_path = image_path(&images_dir, &id);

        let saved = renderer
            .draw(&sample.position, &req, &sprites)
            .and_then(|board| board.save(&req.out_path));
        let record = DatasetRecord::new(id, &sample.position);
        match saved {
            Ok(()) => {
                writer.serialize(&record)?;
                writer.flush()?;
                written += 1;
            }
            Err(e) => {
                log::warn!("sample {} skipped: {e}", record.id);
                failures.push(SampleFailure {
                    id: record.id.clone(),
                    fen: record.fen.clone(),
                    reason: e.to_string(),
                });
            }
        }
        on_sample(&record.id);
    }

    log::info!(
        "wrote {written} samples to {} ({} failed)",
        cfg.out_dir.display(),
        failures.len()
    );
    Ok(DatasetSummary {
        samples: written,
        failures,
        metadata,
        images_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{STARTING_FEN, validate_fen};
    use crate::render::Theme;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn ids_are_zero_padded_from_one() {
        assert_eq!(sample_id(1), "000001");
        assert_eq!(sample_id(123_456), "123456");
    }

    #[test]
    fn record_fields_follow_position() {
        let pos = validate_fen(STARTING_FEN).unwrap();
        let record = DatasetRecord::new(sample_id(1), &pos);
        assert_eq!(record.turn, "white");
        assert_eq!(record.move_number, 1);
        assert_eq!(record.castling_rights, "KQkq");
        assert_eq!(record.en_passant, "-");
        assert!(!record.is_check);
        assert!(!record.is_game_over);
        assert_eq!(record.fen, STARTING_FEN);
    }

    #[test]
    fn writes_one_image_and_row_per_sample() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = DatasetConfig::new(3, dir.path());
        cfg.square_size = 8;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut seen = Vec::new();
        let summary =
            generate_dataset(&cfg, &Renderer::default(), &mut rng, &mut |id| seen.push(id.to_string()))
                .unwrap();
        assert_eq!(summary.samples, 3);
        assert!(summary.failures.is_empty());
        assert_eq!(seen, vec!["000001", "000002", "000003"]);

        let text = std::fs::read_to_string(summary.metadata).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], METADATA_HEADER.join(","));
        for (i, line) in lines[1..].iter().enumerate() {
            let id = sample_id(i + 1);
            assert!(line.starts_with(&format!("{id},")));
            assert!(image_path(&summary.images_dir, &id).is_file());
        }
    }

    #[test]
    fn failed_samples_are_recorded_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = DatasetConfig::new(3, dir.path());
        cfg.square_size = 8;
        cfg.max_plies = 10;
        // 字形なし・スプライトなしなので、どのサンプルも描けない
        let renderer = Renderer::new(Theme::default(), None);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut calls = 0;
        let summary = generate_dataset(&cfg, &renderer, &mut rng, &mut |_| calls += 1).unwrap();

        assert_eq!(calls, 3);
        assert_eq!(summary.samples, 0);
        let ids: Vec<&str> = summary.failures.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["000001", "000002", "000003"]);
        assert!(summary.failures.iter().all(|f| f.reason.starts_with("render failed")));
        assert!(validate_fen(&summary.failures[0].fen).is_ok());

        let text = std::fs::read_to_string(summary.metadata).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(!image_path(&summary.images_dir, "000001").exists());
    }

    #[test]
    fn unsaveable_image_does_not_stop_later_samples() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = DatasetConfig::new(3, dir.path());
        cfg.square_size = 8;
        // 000002.png の位置にディレクトリを置いて保存を失敗させる
        std::fs::create_dir_all(image_path(&cfg.images_dir(), "000002")).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let summary = generate_dataset(&cfg, &Renderer::default(), &mut rng, &mut |_| {}).unwrap();

        assert_eq!(summary.samples, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].id, "000002");
        let text = std::fs::read_to_string(summary.metadata).unwrap();
        let ids: Vec<&str> = text.lines().skip(1).map(|l| &l[..6]).collect();
        assert_eq!(ids, ["000001", "000003"]);
    }

    #[test]
    fn oversized_square_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = DatasetConfig::new(1, dir.path().join("big"));
        cfg.square_size = u32::MAX / 4;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = generate_dataset(&cfg, &Renderer::default(), &mut rng, &mut |_| {})
            .err()
            .unwrap();
        assert!(matches!(err, ToolError::Render(_)));
        assert!(!cfg.metadata_path().exists());
    }

    #[test]
    fn zero_samples_still_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DatasetConfig::new(0, dir.path().join("empty"));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let summary = generate_dataset(&cfg, &Renderer::default(), &mut rng, &mut |_| {}).unwrap();
        let text = std::fs::read_to_string(summary.metadata).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
