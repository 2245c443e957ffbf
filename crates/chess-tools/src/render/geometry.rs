//! 盤上の座標と画像上のマス目の対応。
//!
//! 反転なし: 列 = file、行 = 7 - rank（8段目が上）。
//! 反転あり: 列 = 7 - file、行 = rank。
//! どちらの向きでも写像は自己逆写像なので、マス目 → 座標も同じ式で戻せる。

use crate::error::{ToolError, ToolResult};

pub const BOARD_SIZE: u32 = 8;

/// 出力画像の一辺の上限 (px)
pub const MAX_CANVAS_SIZE: u32 = 16384;

/// (file, rank) を描画上のマス目 (列, 行) に変換する。添字はいずれも 0..8。
pub fn square_to_cell(file: u32, rank: u32, flipped: bool) -> (u32, u32) {
    debug_assert!(file < BOARD_SIZE && rank < BOARD_SIZE);
    if flipped {
        (BOARD_SIZE - 1 - file, rank)
    } else {
        (file, BOARD_SIZE - 1 - rank)
    }
}

/// マス目 (列, 行) を (file, rank) に戻す。
pub fn cell_to_square(col: u32, row: u32, flipped: bool) -> (u32, u32) {
    if flipped {
        (BOARD_SIZE - 1 - col, row)
    } else {
        (col, BOARD_SIZE - 1 - row)
    }
}

/// 盤を 180 度回したときのマス目
pub fn rotate_cell(col: u32, row: u32) -> (u32, u32) {
    (BOARD_SIZE - 1 - col, BOARD_SIZE - 1 - row)
}

/// 盤面画像の一辺。`MAX_CANVAS_SIZE` を超える、または桁あふれする指定は拒否する。
pub fn canvas_size(square_size: u32, margin: u32) -> ToolResult<u32> {
    BOARD_SIZE
        .checked_mul(square_size)
        .and_then(|board| margin.checked_mul(2).and_then(|m| board.checked_add(m)))
        .filter(|&size| size <= MAX_CANVAS_SIZE)
        .ok_or_else(|| {
            ToolError::Render(format!(
                "canvas too large: square size {square_size} with margin {margin} exceeds {MAX_CANVAS_SIZE}px"
            ))
        })
}

/// マス目の左上ピクセル
pub fn cell_origin(col: u32, row: u32, square_size: u32, margin: u32) -> (u32, u32) {
    (margin + col * square_size, margin + row * square_size)
}

/// マス目の中心ピクセル
pub fn cell_center(col: u32, row: u32, square_size: u32, margin: u32) -> (u32, u32) {
    let (x0, y0) = cell_origin(col, row, square_size, margin);
    (x0 + square_size / 2, y0 + square_size / 2)
}

/// a1 は明るいマス
pub fn is_light_square(file: u32, rank: u32) -> bool {
    (file + rank) % 2 == 0
}
