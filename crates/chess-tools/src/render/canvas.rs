//! RGBA キャンバスへの最小限の描画プリミティブ。

use image::{GrayImage, Rgba, RgbaImage};

/// 矩形を塗りつぶす。キャンバス外ははみ出した分だけ捨てる。
pub fn fill_rect(img: &mut RgbaImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgba<u8>) {
    let (cw, ch) = img.dimensions();
    let x1 = x0.saturating_add(w).min(cw);
    let y1 = y0.saturating_add(h).min(ch);
    for y in y0.min(ch)..y1 {
        for x in x0.min(cw)..x1 {
            img.put_pixel(x, y, color);
        }
    }
}

/// キャンバスの外周に幅 `width` の枠線を引く。
pub fn outline(img: &mut RgbaImage, width: u32, color: Rgba<u8>) {
    let (w, h) = img.dimensions();
    let t = width.min(w / 2).min(h / 2);
    fill_rect(img, 0, 0, w, t, color);
    fill_rect(img, 0, h - t, w, t, color);
    fill_rect(img, 0, 0, t, h, color);
    fill_rect(img, w - t, 0, t, h, color);
}

/// カバレッジマスクを `color` で合成する。色のアルファとマスク値を掛け合わせる。
pub fn blend_mask(img: &mut RgbaImage, mask: &GrayImage, x0: i64, y0: i64, color: Rgba<u8>) {
    let (w, h) = img.dimensions();
    for (mx, my, coverage) in mask.enumerate_pixels() {
        let cov = u32::from(coverage.0[0]);
        if cov == 0 {
            continue;
        }
        let x = x0 + i64::from(mx);
        let y = y0 + i64::from(my);
        if x < 0 || y < 0 || x >= i64::from(w) || y >= i64::from(h) {
            continue;
        }
        let alpha = u32::from(color.0[3]) * cov / 255;
        let dst = img.get_pixel_mut(x as u32, y as u32);
        for c in 0..3 {
            let mixed = u32::from(color.0[c]) * alpha + u32::from(dst.0[c]) * (255 - alpha);
            dst.0[c] = (mixed / 255) as u8;
        }
        dst.0[3] = dst.0[3].max(alpha as u8);
    }
}

/// 二値ビットマップ（`#` が点灯）を最近傍で `w` x `h` に拡大したマスク。
pub fn scale_bitmap(rows: &[&str], w: u32, h: u32) -> GrayImage {
    let src_h = rows.len() as u32;
    let src_w = rows.first().map_or(0, |r| r.len() as u32);
    let mut mask = GrayImage::new(w, h);
    if src_w == 0 || src_h == 0 {
        return mask;
    }
    for y in 0..h {
        let row = rows[(y * src_h / h) as usize].as_bytes();
        for x in 0..w {
            if row[(x * src_w / w) as usize] == b'#' {
                mask.put_pixel(x, y, image::Luma([255]));
            }
        }
    }
    mask
}
