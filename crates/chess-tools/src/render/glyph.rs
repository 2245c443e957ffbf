//! 駒と座標ラベルの字形を供給する。
//!
//! 既定は同梱の DejaVu Sans ([`FontGlyphs::bundled`]) で、Unicode のチェス記号
//! (U+2654..U+265F) を `ab_glyph` でラスタライズする。バイナリに埋め込むので
//! 環境にフォントが無くても同じ画像になる。ほかに任意の TrueType フォントと、
//! フォントを使わないビットマップ字形 ([`EmbeddedGlyphs`]) を選べる。

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, PxScale};
use image::{GrayImage, Luma};
use shakmaty::{Color, Piece, Role};

use crate::error::{ToolError, ToolResult};

use super::canvas::scale_bitmap;

/// 字形の供給元
pub trait GlyphSource {
    fn name(&self) -> &str;

    /// 駒の字形。おおよそ `size` x `size` に収まるカバレッジマスク。
    fn piece_mask(&self, piece: Piece, size: u32) -> Option<GrayImage>;

    /// 座標ラベル (`a`..`h`, `1`..`8`)。高さ `height` 程度。
    fn label_mask(&self, label: char, height: u32) -> Option<GrayImage>;
}

pub fn unicode_symbol(piece: Piece) -> char {
    match (piece.color, piece.role) {
        (Color::White, Role::King) => '\u{2654}',
        (Color::White, Role::Queen) => '\u{2655}',
        (Color::White, Role::Rook) => '\u{2656}',
        (Color::White, Role::Bishop) => '\u{2657}',
        (Color::White, Role::Knight) => '\u{2658}',
        (Color::White, Role::Pawn) => '\u{2659}',
        (Color::Black, Role::King) => '\u{265A}',
        (Color::Black, Role::Queen) => '\u{265B}',
        (Color::Black, Role::Rook) => '\u{265C}',
        (Color::Black, Role::Bishop) => '\u{265D}',
        (Color::Black, Role::Knight) => '\u{265E}',
        (Color::Black, Role::Pawn) => '\u{265F}',
    }
}

const PAWN: [&str; 16] = [
    "................",
    "................",
    "................",
    ".......##.......",
    "......####......",
    "......####......",
    ".......##.......",
    "......####......",
    ".......##.......",
    "......####......",
    ".....######.....",
    "....########....",
    "...##########...",
    "...##########...",
    "................",
    "................",
];

const KNIGHT: [&str; 16] = [
    "................",
    "......#.#.......",
    ".....######.....",
    "....########....",
    "...###.######...",
    "..###########...",
    "..####.######...",
    ".......######...",
    "......#######...",
    ".....########...",
    "....#########...",
    "....#########...",
    "...###########..",
    "...###########..",
    "................",
    "................",
];

const BISHOP: [&str; 16] = [
    "................",
    ".......##.......",
    "......####......",
    ".....##.###.....",
    ".....#.####.....",
    ".....######.....",
    "......####......",
    ".......##.......",
    "......####......",
    ".......##.......",
    ".....######.....",
    "....########....",
    "...##########...",
    "...##########...",
    "................",
    "................",
];

const ROOK: [&str; 16] = [
    "................",
    "................",
    "...##.####.##...",
    "...##########...",
    "...##########...",
    "....########....",
    ".....######.....",
    ".....######.....",
    ".....######.....",
    ".....######.....",
    "....########....",
    "...##########...",
    "..############..",
    "..############..",
    "................",
    "................",
];

const QUEEN: [&str; 16] = [
    "................",
    "..#....##....#..",
    "..##..####..##..",
    "...##.####.##...",
    "...##########...",
    "....########....",
    "....########....",
    ".....######.....",
    ".....######.....",
    "....########....",
    "...##########...",
    "...##########...",
    "..############..",
    "..############..",
    "................",
    "................",
];

const KING: [&str; 16] = [
    ".......##.......",
    "......####......",
    ".......##.......",
    "..####.##.####..",
    ".##############.",
    ".##############.",
    "..############..",
    "...##########...",
    "....########....",
    "....########....",
    "...##########...",
    "...##########...",
    "..############..",
    "..############..",
    "................",
    "................",
];

fn piece_bitmap(role: Role) -> &'static [&'static str] {
    match role {
        Role::Pawn => &PAWN,
        Role::Knight => &KNIGHT,
        Role::Bishop => &BISHOP,
        Role::Rook => &ROOK,
        Role::Queen => &QUEEN,
        Role::King => &KING,
    }
}

/// 3x5 の座標用フォント
fn label_bitmap(label: char) -> Option<[&'static str; 5]> {
    let rows = match label {
        'a' => [".#.", "#.#", "###", "#.#", "#.#"],
        'b' => ["##.", "#.#", "##.", "#.#", "##."],
        'c' => [".##", "#..", "#..", "#..", ".##"],
        'd' => ["##.", "#.#", "#.#", "#.#", "##."],
        'e' => ["###", "#..", "##.", "#..", "###"],
        'f' => ["###", "#..", "##.", "#..", "#.."],
        'g' => [".##", "#..", "#.#", "#.#", ".##"],
        'h' => ["#.#", "#.#", "###", "#.#", "#.#"],
        '1' => [".#.", "##.", ".#.", ".#.", "###"],
        '2' => ["##.", "..#", ".#.", "#..", "###"],
        '3' => ["##.", "..#", ".#.", "..#", "##."],
        '4' => ["#.#", "#.#", "###", "..#", "..#"],
        '5' => ["###", "#..", "##.", "..#", "##."],
        '6' => [".##", "#..", "###", "#.#", "###"],
        '7' => ["###", "..#", ".#.", ".#.", ".#."],
        '8' => ["###", "#.#", "###", "#.#", "###"],
        _ => return None,
    };
    Some(rows)
}

/// バイナリに埋め込んだビットマップ字形。白黒で同じシルエットを使い、塗り色で区別する。
#[derive(Default)]
pub struct EmbeddedGlyphs;

impl GlyphSource for EmbeddedGlyphs {
    fn name(&self) -> &str {
        "embedded"
    }

    fn piece_mask(&self, piece: Piece, size: u32) -> Option<GrayImage> {
        let size = size.max(1);
        Some(scale_bitmap(piece_bitmap(piece.role), size, size))
    }

    fn label_mask(&self, label: char, height: u32) -> Option<GrayImage> {
        let rows = label_bitmap(label)?;
        let scale = (height / 5).max(1);
        Some(scale_bitmap(&rows, 3 * scale, 5 * scale))
    }
}

/// よくあるフォントの設置場所。見つかった最初のものを使う。
pub const COMMON_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "/Library/Fonts/DejaVu Sans.ttf",
    "C:/Windows/Fonts/seguisym.ttf",
    "C:/Windows/Fonts/DejaVuSans.ttf",
];

/// 同梱フォント。ライセンスは `assets/fonts/LICENSE-DejaVu.txt`。
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const BUNDLED_FONT_NAME: &str = "DejaVu Sans (bundled)";

/// TrueType フォントから字形を作る。
pub struct FontGlyphs {
    font: FontArc,
    name: String,
}

impl FontGlyphs {
    pub fn from_path(path: &Path) -> ToolResult<Self> {
        let data = std::fs::read(path)?;
        let font = FontArc::try_from_vec(data)
            .map_err(|e| ToolError::Render(format!("{}: {e}", path.display())))?;
        Ok(Self {
            font,
            name: path.display().to_string(),
        })
    }

    pub fn bundled() -> ToolResult<Self> {
        let font = FontArc::try_from_slice(BUNDLED_FONT)
            .map_err(|e| ToolError::Render(format!("{BUNDLED_FONT_NAME}: {e}")))?;
        Ok(Self {
            font,
            name: BUNDLED_FONT_NAME.to_string(),
        })
    }

    /// `COMMON_FONT_PATHS` を順に試す。
    pub fn discover() -> Option<Self> {
        COMMON_FONT_PATHS
            .iter()
            .map(Path::new)
            .filter(|p| p.is_file())
            .find_map(|p| match Self::from_path(p) {
                Ok(glyphs) => Some(glyphs),
                Err(e) => {
                    log::warn!("skipping font {}: {e}", p.display());
                    None
                }
            })
    }

    fn rasterize(&self, ch: char, px: u32) -> Option<GrayImage> {
        let id = self.font.glyph_id(ch);
        // glyph 0 は .notdef（フォントに字形が無い）
        if id.0 == 0 {
            return None;
        }
        let glyph = id.with_scale_and_position(PxScale::from(px as f32), ab_glyph::point(0.0, 0.0));
        let outlined = self.font.outline_glyph(glyph)?;
        let bounds = outlined.px_bounds();
        let w = bounds.width().ceil() as u32;
        let h = bounds.height().ceil() as u32;
        if w == 0 || h == 0 {
            return None;
        }
        let mut mask = GrayImage::new(w, h);
        outlined.draw(|x, y, coverage| {
            if x < w && y < h {
                mask.put_pixel(x, y, Luma([(coverage.clamp(0.0, 1.0) * 255.0).round() as u8]));
            }
        });
        Some(mask)
    }
}

impl GlyphSource for FontGlyphs {
    fn name(&self) -> &str {
        &self.name
    }

    fn piece_mask(&self, piece: Piece, size: u32) -> Option<GrayImage> {
        self.rasterize(unicode_symbol(piece), size)
    }

    fn label_mask(&self, label: char, height: u32) -> Option<GrayImage> {
        self.rasterize(label, height)
    }
}

/// 既定の字形。同梱フォントが読めなければビットマップ字形にする。
pub fn default_glyphs() -> Box<dyn GlyphSource> {
    match FontGlyphs::bundled() {
        Ok(font) => Box::new(font),
        Err(e) => {
            log::warn!("{e}, using bitmap glyphs");
            Box::new(EmbeddedGlyphs)
        }
    }
}

/// 字形の選び方（CLI から指定）
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum GlyphChoice {
    /// 同梱フォント
    #[default]
    Bundled,
    /// ビットマップ字形
    Embedded,
    Font(PathBuf),
    /// システムフォントを探し、無ければ同梱フォントに落とす
    System,
    /// 字形を使わない（スプライト必須）
    Disabled,
}

impl GlyphChoice {
    pub fn resolve(&self) -> ToolResult<Option<Box<dyn GlyphSource>>> {
        let source: Box<dyn GlyphSource> = match self {
            GlyphChoice::Bundled => Box::new(FontGlyphs::bundled()?),
            GlyphChoice::Embedded => Box::new(EmbeddedGlyphs),
            GlyphChoice::Font(path) => Box::new(FontGlyphs::from_path(path)?),
            GlyphChoice::System => match FontGlyphs::discover() {
                Some(font) => Box::new(font),
                None => {
                    log::warn!("no system font found, using the bundled font");
                    default_glyphs()
                }
            },
            GlyphChoice::Disabled => return Ok(None),
        };
        log::debug!("glyph source: {}", source.name());
        Ok(Some(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: [Role; 6] = [
        Role::Pawn,
        Role::Knight,
        Role::Bishop,
        Role::Rook,
        Role::Queen,
        Role::King,
    ];

    #[test]
    fn bitmaps_are_square_and_filled_at_the_centre() {
        for role in ROLES {
            let rows = piece_bitmap(role);
            assert_eq!(rows.len(), 16, "{role:?}");
            for row in rows {
                assert_eq!(row.len(), 16, "{role:?}: {row}");
            }
            for y in 7..=8 {
                for x in 7..=8 {
                    assert_eq!(rows[y].as_bytes()[x], b'#', "{role:?} ({x},{y})");
                }
            }
        }
    }

    #[test]
    fn embedded_glyphs_cover_every_piece_and_label() {
        let glyphs = EmbeddedGlyphs;
        for role in ROLES {
            for color in [Color::White, Color::Black] {
                let mask = glyphs.piece_mask(Piece { color, role }, 40).unwrap();
                assert_eq!(mask.dimensions(), (40, 40));
                assert_eq!(mask.get_pixel(20, 20).0, [255]);
            }
        }
        for ch in "abcdefgh12345678".chars() {
            let mask = glyphs.label_mask(ch, 11).unwrap();
            assert_eq!(mask.dimensions(), (6, 10));
        }
        assert!(glyphs.label_mask('z', 11).is_none());
    }

    #[test]
    fn unicode_symbols_follow_colour() {
        let wk = Piece {
            color: Color::White,
            role: Role::King,
        };
        assert_eq!(unicode_symbol(wk), '♔');
        assert_eq!(unicode_symbol(Piece { color: Color::Black, role: Role::Pawn }), '♟');
    }

    #[test]
    fn bundled_font_has_distinct_shapes_per_colour() {
        let font = FontGlyphs::bundled().unwrap();
        for role in ROLES {
            let white = font.piece_mask(Piece { color: Color::White, role }, 48).unwrap();
            let black = font.piece_mask(Piece { color: Color::Black, role }, 48).unwrap();
            let ink = |m: &GrayImage| m.pixels().map(|p| u64::from(p.0[0])).sum::<u64>();
            // 白は輪郭のみ、黒は塗りつぶしの記号
            assert!(ink(&black) > ink(&white), "{role:?}");
            assert!(white.width() <= 48 && white.height() <= 56, "{role:?}");
        }
        for ch in "abcdefgh12345678".chars() {
            assert!(font.label_mask(ch, 11).is_some(), "{ch}");
        }
        assert_eq!(font.name(), "DejaVu Sans (bundled)");
    }

    #[test]
    fn default_choice_is_the_bundled_font() {
        assert_eq!(GlyphChoice::default(), GlyphChoice::Bundled);
        let source = GlyphChoice::default().resolve().unwrap().unwrap();
        assert_eq!(source.name(), default_glyphs().name());
        let bitmap = GlyphChoice::Embedded.resolve().unwrap().unwrap();
        assert_eq!(bitmap.name(), "embedded");
    }

    #[test]
    fn missing_font_file_is_an_error() {
        let err = GlyphChoice::Font(PathBuf::from("/nonexistent/font.ttf")).resolve();
        assert!(err.is_err());
        assert!(GlyphChoice::Disabled.resolve().unwrap().is_none());
    }
}
