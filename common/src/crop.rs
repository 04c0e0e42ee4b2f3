//! 切り出し範囲の計算
//!
//! 正規化バウンディングボックス（中心・幅・高さ）を画像のピクセル座標に変換し、
//! パディングを付けたうえで画像範囲内にクランプする。
//! 画像のデコード・エンコードは行わない（CLI側の cropper が担当）。

use crate::error::{Error, Result};
use crate::types::BoundingBox;
use serde::{Deserialize, Serialize};

/// 切り出し時に四辺へ追加する余白（px）
pub const CROP_PADDING: u32 = 5;

/// ピクセル座標の矩形（左上基準）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// 矩形が `[0, width] x [0, height]` に収まっているか
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

/// ボックスを切り出し矩形に変換
///
/// 1. 中心・サイズに画像サイズを掛けてピクセル値にする
/// 2. 左上 = 中心 - サイズ/2 から `padding` だけ外側へ広げる
/// 3. 左上を0以上にクランプ
/// 4. 幅・高さを右端・下端を超えないようにクランプ
///
/// 結果の幅または高さが0になる場合は `Error::EmptyCrop`
pub fn crop_rect(
    bbox: &BoundingBox,
    image_width: u32,
    image_height: u32,
    padding: u32,
) -> Result<PixelRect> {
    let (x, width) = clamp_axis(bbox.cx, bbox.w, image_width, padding);
    let (y, height) = clamp_axis(bbox.cy, bbox.h, image_height, padding);

    if width == 0 || height == 0 {
        return Err(Error::EmptyCrop { width, height });
    }

    Ok(PixelRect { x, y, width, height })
}

/// 1軸分の開始位置と長さを計算
fn clamp_axis(center: f64, size: f64, extent: u32, padding: u32) -> (u32, u32) {
    let extent = extent as f64;
    let padding = padding as f64;

    let pixel_size = size * extent;
    let start = (center * extent - pixel_size / 2.0 - padding)
        .round()
        .clamp(0.0, extent);
    let length = (pixel_size + padding * 2.0)
        .round()
        .max(0.0)
        .min(extent - start);

    (start as u32, length as u32)
}
