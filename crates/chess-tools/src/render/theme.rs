//! 盤面の配色。既定値は chess.com 風（緑 / 生成り）。
//!
//! TOML で部分的に上書きできる:
//!
//! ```toml
//! light = [240, 217, 181]
//! dark = [181, 136, 99]
//! shadow = [0, 0, 0, 100]
//! ```

use std::path::Path;

use image::Rgba;
use serde::Deserialize;

use crate::error::ToolResult;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Theme {
    pub light: [u8; 3],
    pub dark: [u8; 3],
    pub border: [u8; 3],
    pub coordinate: [u8; 3],
    pub background: [u8; 3],
    pub white_piece: [u8; 3],
    pub black_piece: [u8; 3],
    /// RGBA。アルファで影の濃さを決める
    pub shadow: [u8; 4],
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            light: [238, 238, 210],
            dark: [118, 150, 86],
            border: [34, 34, 34],
            coordinate: [40, 40, 40],
            background: [255, 255, 255],
            white_piece: [250, 250, 250],
            black_piece: [20, 20, 20],
            shadow: [0, 0, 0, 140],
        }
    }
}

pub fn opaque(rgb: [u8; 3]) -> Rgba<u8> {
    Rgba([rgb[0], rgb[1], rgb[2], 255])
}

impl Theme {
    pub fn from_toml_str(text: &str) -> ToolResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> ToolResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn square(&self, light: bool) -> Rgba<u8> {
        opaque(if light { self.light } else { self.dark })
    }

    pub fn piece_fill(&self, white: bool) -> Rgba<u8> {
        opaque(if white { self.white_piece } else { self.black_piece })
    }

    pub fn shadow(&self) -> Rgba<u8> {
        Rgba(self.shadow)
    }
}
