//! 局面を PNG 画像に描画する。
//!
//! 手順: FEN 検証 → キャンバス確保 → 枠線 → マス目 → 座標ラベル → 駒 → 保存。
//! 駒はスプライトがあればそれを、無ければ字形（影付き）を描く。

pub mod canvas;
pub mod geometry;
pub mod glyph;
pub mod sprites;
pub mod theme;

use std::path::{Path, PathBuf};

use image::imageops;
use image::{ImageFormat, RgbaImage};
use shakmaty::{Chess, Color, File, Piece, Position, Rank, Square};

use crate::error::{ToolError, ToolResult};
use crate::position::validate_fen;

use canvas::{blend_mask, fill_rect, outline};
use geometry::{BOARD_SIZE, canvas_size, cell_center, cell_origin, is_light_square, square_to_cell};
pub use glyph::{EmbeddedGlyphs, FontGlyphs, GlyphChoice, GlyphSource, default_glyphs};
pub use sprites::SpriteSet;
pub use theme::Theme;

pub const DEFAULT_SQUARE_SIZE: u32 = 96;
pub const DEFAULT_MARGIN: u32 = 32;

const BORDER_WIDTH: u32 = 2;
const FILES: [char; 8] = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];
const RANKS: [char; 8] = ['1', '2', '3', '4', '5', '6', '7', '8'];

/// 描画 1 回ぶんの指定
#[derive(Clone, Debug)]
pub struct RenderRequest {
    pub square_size: u32,
    pub margin: u32,
    pub flipped: bool,
    pub show_coordinates: bool,
    pub sprite_dir: Option<PathBuf>,
    pub out_path: PathBuf,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            square_size: DEFAULT_SQUARE_SIZE,
            margin: DEFAULT_MARGIN,
            flipped: false,
            show_coordinates: true,
            sprite_dir: None,
            out_path: PathBuf::from("board.png"),
        }
    }
}

/// 駒を何で描いたか
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PieceArt {
    Sprite,
    Glyph,
}

/// 描いた駒 1 つぶんの配置
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub square: Square,
    pub piece: Piece,
    /// 描画上のマス目 (列, 行)
    pub cell: (u32, u32),
    pub art: PieceArt,
}

pub struct RenderedBoard {
    pub image: RgbaImage,
    pub placements: Vec<Placement>,
}

impl RenderedBoard {
    pub fn save(&self, path: &Path) -> ToolResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.image.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

pub struct Renderer {
    pub theme: Theme,
    glyphs: Option<Box<dyn GlyphSource>>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(Theme::default(), Some(default_glyphs()))
    }
}

impl Renderer {
    pub fn new(theme: Theme, glyphs: Option<Box<dyn GlyphSource>>) -> Self {
        Self { theme, glyphs }
    }

    /// CLI の指定（配色ファイル、字形の選び方）から組み立てる。
    pub fn from_options(theme: Option<&Path>, glyphs: &GlyphChoice) -> ToolResult<Self> {
        let theme = match theme {
            Some(path) => Theme::load(path)?,
            None => Theme::default(),
        };
        Ok(Self::new(theme, glyphs.resolve()?))
    }

    /// FEN を検証して描画し、`req.out_path` に PNG で保存する。
    pub fn render_fen(&self, fen: &str, req: &RenderRequest) -> ToolResult<PathBuf> {
        let pos = validate_fen(fen)?;
        let sprites = SpriteSet::load_optional(req.sprite_dir.as_deref());
        let board = self.draw(&pos, req, &sprites)?;
        board.save(&req.out_path)?;
        log::debug!("saved {} ({} pieces)", req.out_path.display(), board.placements.len());
        Ok(req.out_path.clone())
    }

    /// 検証済みの局面を描く。`sprites` が描画サイズに縮小済みでなければここで縮小する。
    pub fn draw(
        &self,
        pos: &Chess,
        req: &RenderRequest,
        sprites: &SpriteSet,
    ) -> ToolResult<RenderedBoard> {
        if req.square_size == 0 {
            return Err(ToolError::Render("square size must be positive".to_string()));
        }
        let sq = req.square_size;
        let side = canvas_size(sq, req.margin)?;
        let mut img = RgbaImage::from_pixel(side, side, theme::opaque(self.theme.background));
        outline(&mut img, BORDER_WIDTH, theme::opaque(self.theme.border));

        for file in 0..BOARD_SIZE {
            for rank in 0..BOARD_SIZE {
                let (col, row) = square_to_cell(file, rank, req.flipped);
                let (x0, y0) = cell_origin(col, row, sq, req.margin);
                fill_rect(&mut img, x0, y0, sq, sq, self.theme.square(is_light_square(file, rank)));
            }
        }

        if req.show_coordinates {
            self.draw_coordinates(&mut img, req);
        }

        let sprite_px = ((sq as f32) * 0.92).round() as u32;
        let resized;
        let sprites = if sprites.is_empty() || sprites.size() == Some(sprite_px) {
            sprites
        } else {
            resized = sprites.scaled(sprite_px);
            &resized
        };

        let mut placements = Vec::new();
        for file in 0..BOARD_SIZE {
            for rank in 0..BOARD_SIZE {
                let square = Square::from_coords(File::new(file), Rank::new(rank));
                let Some(piece) = pos.board().piece_at(square) else {
                    continue;
                };
                let cell = square_to_cell(file, rank, req.flipped);
                let (cx, cy) = cell_center(cell.0, cell.1, sq, req.margin);
                let art = if let Some(sprite) = sprites.get(piece) {
                    let (w, h) = sprite.dimensions();
                    let x = i64::from(cx) - i64::from(w / 2);
                    let y = i64::from(cy) - i64::from(h / 2);
                    imageops::overlay(&mut img, sprite, x, y);
                    PieceArt::Sprite
                } else {
                    self.draw_glyph(&mut img, piece, square, (cx, cy), sq)?;
                    PieceArt::Glyph
                };
                placements.push(Placement {
                    square,
                    piece,
                    cell,
                    art,
                });
            }
        }

        Ok(RenderedBoard {
            image: img,
            placements,
        })
    }

    fn draw_glyph(
        &self,
        img: &mut RgbaImage,
        piece: Piece,
        square: Square,
        center: (u32, u32),
        sq: u32,
    ) -> ToolResult<()> {
        let size = ((sq as f32) * 0.8).round().max(1.0) as u32;
        let mask = self
            .glyphs
            .as_ref()
            .and_then(|g| g.piece_mask(piece, size))
            .ok_or_else(|| {
                ToolError::Render(format!(
                    "no sprite and no usable glyph for '{}' on {square}",
                    piece.char()
                ))
            })?;
        let (w, h) = mask.dimensions();
        let x = i64::from(center.0) - i64::from(w / 2);
        let y = i64::from(center.1) - i64::from(h / 2);
        let offset = i64::from((sq / 64).max(1));
        blend_mask(img, &mask, x + offset, y + offset, self.theme.shadow());
        blend_mask(img, &mask, x, y, self.theme.piece_fill(piece.color == Color::White));
        Ok(())
    }

    /// 下辺に筋 (a-h)、左辺に段 (1-8)。反転時は逆順。
    fn draw_coordinates(&self, img: &mut RgbaImage, req: &RenderRequest) {
        let Some(glyphs) = self.glyphs.as_ref() else {
            log::warn!("no glyph source, coordinates skipped");
            return;
        };
        let sq = req.square_size;
        let (_, img_h) = img.dimensions();
        let height = ((req.margin as f32) * 0.35).round().max(7.0) as u32;
        let color = theme::opaque(self.theme.coordinate);

        for col in 0..BOARD_SIZE {
            let label = if req.flipped {
                FILES[(BOARD_SIZE - 1 - col) as usize]
            } else {
                FILES[col as usize]
            };
            let Some(mask) = glyphs.label_mask(label, height) else {
                continue;
            };
            let cx = i64::from(req.margin + col * sq + sq / 2);
            let y = i64::from(img_h) - i64::from(req.margin) + 4;
            blend_mask(img, &mask, cx - i64::from(mask.width() / 2), y, color);
        }

        for row in 0..BOARD_SIZE {
            let label = if req.flipped {
                RANKS[row as usize]
            } else {
                RANKS[(BOARD_SIZE - 1 - row) as usize]
            };
            let Some(mask) = glyphs.label_mask(label, height) else {
                continue;
            };
            let cy = i64::from(req.margin + row * sq + sq / 2);
            blend_mask(img, &mask, 6, cy - i64::from(mask.height() / 2), color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::STARTING_FEN;
    use std::collections::BTreeSet;

    fn request(flipped: bool) -> RenderRequest {
        RenderRequest {
            square_size: 20,
            margin: 0,
            flipped,
            show_coordinates: false,
            ..RenderRequest::default()
        }
    }

    fn occupied(pos: &Chess) -> BTreeSet<Square> {
        pos.board().occupied().into_iter().collect()
    }

    #[test]
    fn placements_match_occupied_squares() {
        let fens = [
            STARTING_FEN,
            "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
            "8/8/4k3/8/8/4K3/4R3/8 w - - 0 1",
        ];
        let renderer = Renderer::default();
        for fen in fens {
            let pos = validate_fen(fen).unwrap();
            let board = renderer.draw(&pos, &request(false), &SpriteSet::empty()).unwrap();
            let drawn: BTreeSet<Square> = board.placements.iter().map(|p| p.square).collect();
            assert_eq!(drawn, occupied(&pos), "{fen}");
            assert_eq!(board.image.dimensions(), (160, 160));
        }
    }

    #[test]
    fn occupied_cells_differ_from_empty_cells_in_pixels() {
        let renderer = Renderer::default();
        let pos = validate_fen(STARTING_FEN).unwrap();
        let req = request(false);
        let board = renderer.draw(&pos, &req, &SpriteSet::empty()).unwrap();
        let sq = req.square_size;
        for file in 0..8 {
            for rank in 0..8 {
                let (col, row) = square_to_cell(file, rank, false);
                let (x0, y0) = cell_origin(col, row, sq, req.margin);
                let background = renderer.theme.square(is_light_square(file, rank));
                let inked = (2..sq - 2)
                    .flat_map(|dy| (2..sq - 2).map(move |dx| (x0 + dx, y0 + dy)))
                    .any(|(x, y)| *board.image.get_pixel(x, y) != background);
                let has_piece = rank <= 1 || rank >= 6;
                assert_eq!(inked, has_piece, "file {file} rank {rank}");
            }
        }
    }

    #[test]
    fn flipped_render_is_rotated_unflipped_render() {
        let renderer = Renderer::default();
        let pos = validate_fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3")
            .unwrap();
        let plain = renderer.draw(&pos, &request(false), &SpriteSet::empty()).unwrap();
        let flipped = renderer.draw(&pos, &request(true), &SpriteSet::empty()).unwrap();
        let rotated: BTreeSet<_> = plain
            .placements
            .iter()
            .map(|p| (p.square, geometry::rotate_cell(p.cell.0, p.cell.1)))
            .collect();
        let direct: BTreeSet<_> = flipped.placements.iter().map(|p| (p.square, p.cell)).collect();
        assert_eq!(rotated, direct);
    }

    #[test]
    fn missing_glyphs_and_sprites_is_a_render_error() {
        let renderer = Renderer::new(Theme::default(), None);
        let pos = Chess::default();
        let err = renderer.draw(&pos, &request(false), &SpriteSet::empty()).err().unwrap();
        assert!(matches!(err, ToolError::Render(_)));
    }

    #[test]
    fn a1_is_painted_with_the_light_colour() {
        let renderer = Renderer::default();
        let pos = validate_fen("8/8/4k3/8/8/4K3/8/8 w - - 0 1").unwrap();
        for flipped in [false, true] {
            let req = request(flipped);
            let board = renderer.draw(&pos, &req, &SpriteSet::empty()).unwrap();
            let (col, row) = square_to_cell(0, 0, flipped);
            let (cx, cy) = cell_center(col, row, req.square_size, req.margin);
            assert_eq!(board.image.get_pixel(cx, cy).0, [238, 238, 210, 255]);
            let (col, row) = square_to_cell(1, 0, flipped);
            let (cx, cy) = cell_center(col, row, req.square_size, req.margin);
            assert_eq!(board.image.get_pixel(cx, cy).0, [118, 150, 86, 255]);
        }
    }

    #[test]
    fn oversized_square_is_a_render_error() {
        let renderer = Renderer::default();
        let pos = Chess::default();
        let req = RenderRequest {
            square_size: u32::MAX / 4,
            ..request(false)
        };
        let err = renderer.draw(&pos, &req, &SpriteSet::empty()).err().unwrap();
        assert!(matches!(err, ToolError::Render(_)));
    }

    #[test]
    fn render_fen_rejects_illegal_positions() {
        let dir = tempfile::tempdir().unwrap();
        let req = RenderRequest {
            out_path: dir.path().join("x.png"),
            ..request(false)
        };
        let err = Renderer::default()
            .render_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKKNR w KQkq - 0 1", &req)
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation { .. }));
        assert!(!req.out_path.exists());
    }

    #[test]
    fn render_fen_writes_png_with_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let req = RenderRequest {
            out_path: dir.path().join("nested").join("board.png"),
            ..RenderRequest::default()
        };
        let out = Renderer::default().render_fen(STARTING_FEN, &req).unwrap();
        let img = image::open(&out).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (96 * 8 + 64, 96 * 8 + 64));
        // 枠線
        assert_eq!(img.get_pixel(0, 0).0, [34, 34, 34, 255]);
    }

    #[test]
    fn sprites_take_priority_over_glyphs() {
        let sprites_dir = tempfile::tempdir().unwrap();
        let red = RgbaImage::from_pixel(10, 10, image::Rgba([255, 0, 0, 255]));
        red.save(sprites_dir.path().join("wk.png")).unwrap();
        let sprites = SpriteSet::load(sprites_dir.path());

        let renderer = Renderer::default();
        let pos = Chess::default();
        let board = renderer.draw(&pos, &request(false), &sprites).unwrap();
        let e1 = board.placements.iter().find(|p| p.square == Square::E1).unwrap();
        assert_eq!(e1.art, PieceArt::Sprite);
        let (cx, cy) = cell_center(e1.cell.0, e1.cell.1, 20, 0);
        let [r, g, b, _] = board.image.get_pixel(cx, cy).0;
        assert!(r > 200 && g < 50 && b < 50);
        assert!(board
            .placements
            .iter()
            .filter(|p| p.square != Square::E1)
            .all(|p| p.art == PieceArt::Glyph));
    }
}
