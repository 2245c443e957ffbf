//! 駒スプライト（PNG）の読み込み。
//!
//! ディレクトリには色 + 駒種の 12 ファイルを置く:
//! `wk.png wq.png wr.png wb.png wn.png wp.png bk.png bq.png br.png bb.png bn.png bp.png`。
//! 欠けているファイルはその駒だけ字形描画にフォールバックする。

use std::collections::HashMap;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use shakmaty::{Color, Piece, Role};

pub const ALL_PIECES: [Piece; 12] = [
    Piece { color: Color::White, role: Role::King },
    Piece { color: Color::White, role: Role::Queen },
    Piece { color: Color::White, role: Role::Rook },
    Piece { color: Color::White, role: Role::Bishop },
    Piece { color: Color::White, role: Role::Knight },
    Piece { color: Color::White, role: Role::Pawn },
    Piece { color: Color::Black, role: Role::King },
    Piece { color: Color::Black, role: Role::Queen },
    Piece { color: Color::Black, role: Role::Rook },
    Piece { color: Color::Black, role: Role::Bishop },
    Piece { color: Color::Black, role: Role::Knight },
    Piece { color: Color::Black, role: Role::Pawn },
];

/// `wp.png` / `bn.png` のようなファイル名
pub fn sprite_file_name(piece: Piece) -> String {
    let color = match piece.color {
        Color::White => 'w',
        Color::Black => 'b',
    };
    format!("{color}{}.png", piece.role.char())
}

#[derive(Clone, Default)]
pub struct SpriteSet {
    sprites: HashMap<char, RgbaImage>,
    /// `scaled` 済みならその一辺
    size: Option<u32>,
}

impl SpriteSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// ディレクトリから読めたものだけを集める。
    pub fn load(dir: &Path) -> Self {
        let mut sprites = HashMap::new();
        for piece in ALL_PIECES {
            let path = dir.join(sprite_file_name(piece));
            if !path.is_file() {
                continue;
            }
            match image::open(&path) {
                Ok(img) => {
                    sprites.insert(piece.char(), img.to_rgba8());
                }
                Err(e) => log::warn!("skipping sprite {}: {e}", path.display()),
            }
        }
        if sprites.len() < ALL_PIECES.len() {
            log::warn!(
                "{}: {} of {} sprites found, missing pieces fall back to glyphs",
                dir.display(),
                sprites.len(),
                ALL_PIECES.len()
            );
        }
        Self {
            sprites,
            size: None,
        }
    }

    pub fn load_optional(dir: Option<&Path>) -> Self {
        dir.map(Self::load).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn size(&self) -> Option<u32> {
        self.size
    }

    pub fn get(&self, piece: Piece) -> Option<&RgbaImage> {
        self.sprites.get(&piece.char())
    }

    /// すべてのスプライトを `size` x `size` に縮小したコピー。
    pub fn scaled(&self, size: u32) -> Self {
        let size = size.max(1);
        let sprites = self
            .sprites
            .iter()
            .map(|(&key, img)| (key, imageops::resize(img, size, size, FilterType::Lanczos3)))
            .collect();
        Self {
            sprites,
            size: Some(size),
        }
    }
}
