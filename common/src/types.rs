//! 識別結果・コレクションの型定義
//!
//! CLIと対話セッションで共有される型:
//! - BoundingBox: 正規化済み中心座標ボックス
//! - Detection: 1回の識別呼び出しで得られたカード候補
//! - ScanResult: 1バッチ分の検出結果と元画像
//! - CardRecord: コレクションに登録されたカード

use crate::crop::PixelRect;
use serde::{Deserialize, Serialize};

/// 正規化バウンディングボックス（中心基準、各値は画像サイズに対する0〜1の比率）
///
/// ワイヤ形式は `[cx, cy, w, h]` の4要素配列
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl BoundingBox {
    pub fn new(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self { cx, cy, w, h }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([cx, cy, w, h]: [f64; 4]) -> Self {
        Self { cx, cy, w, h }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.cx, b.cy, b.w, b.h]
    }
}

impl std::str::FromStr for BoundingBox {
    type Err = String;

    /// `"cx,cy,w,h"` 形式をパース
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Invalid bounding box '{}': {}", s, e))?;

        match values.as_slice() {
            &[cx, cy, w, h] => Ok(Self { cx, cy, w, h }),
            _ => Err(format!(
                "Invalid bounding box '{}': expected 4 values (cx,cy,w,h), got {}",
                s,
                values.len()
            )),
        }
    }
}

/// カードの同一性キー（カード名・セット名・カード番号）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardKey {
    pub name: String,
    pub set: String,
    pub card_number: String,
}

/// 検出結果（1枚のカード候補）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub name: String,
    pub set: String,
    pub card_number: String,
    pub rarity: String,

    /// 信頼度（0.0〜1.0）
    pub confidence: f64,

    pub bounding_box: BoundingBox,

    /// 元画像のインデックス（バッチ内の投入順）
    #[serde(default)]
    pub image_index: usize,

    /// 切り出し画像（data URI）。切り出し失敗時はNone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cropped_image: Option<String>,

    /// 実際に切り出したピクセル範囲
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_rect: Option<PixelRect>,
}

impl Detection {
    pub fn key(&self) -> CardKey {
        CardKey {
            name: self.name.clone(),
            set: self.set.clone(),
            card_number: self.card_number.clone(),
        }
    }

    pub fn has_crop(&self) -> bool {
        self.cropped_image.is_some()
    }
}

/// 元画像の参照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceImage {
    pub file_name: String,
    pub path: String,

    /// 変換前の形式がHEIC/HEIFだった場合true
    #[serde(default)]
    pub converted: bool,
}

/// 1バッチ分のスキャン結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// スキャンごとに単調増加するID（結果表示のリセット判定に使用）
    pub scan_id: u64,

    /// スキャン日時（RFC 3339）
    #[serde(default)]
    pub scanned_at: String,

    pub detections: Vec<Detection>,
    pub source_images: Vec<SourceImage>,

    /// モデルが報告した検出総数
    pub total_detected: usize,
}

impl ScanResult {
    pub fn cropped_count(&self) -> usize {
        self.detections.iter().filter(|d| d.has_crop()).count()
    }
}

/// コレクション登録済みカード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub name: String,
    pub set: String,
    pub card_number: String,

    /// 最初に登録した時点のレアリティ
    #[serde(default)]
    pub rarity: String,

    /// 表示用画像（data URI）
    #[serde(default)]
    pub image: Option<String>,

    pub quantity: u32,
}

impl CardRecord {
    pub fn from_detection(detection: &Detection) -> Self {
        Self {
            name: detection.name.clone(),
            set: detection.set.clone(),
            card_number: detection.card_number.clone(),
            rarity: detection.rarity.clone(),
            image: detection.cropped_image.clone(),
            quantity: 1,
        }
    }

    pub fn key(&self) -> CardKey {
        CardKey {
            name: self.name.clone(),
            set: self.set.clone(),
            card_number: self.card_number.clone(),
        }
    }
}
