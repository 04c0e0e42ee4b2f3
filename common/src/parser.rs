//! APIレスポンスパーサー
//!
//! 識別APIのレスポンステキストからJSONを抽出し、
//! `cards_detected` スキーマに厳密に従っているか検証して Detection に変換する

use crate::error::{Error, Result};
use crate::types::{BoundingBox, Detection};
use serde::Deserialize;

/// 識別レスポンス（ワイヤ形式）
#[derive(Debug, Deserialize)]
struct RawIdentifyResponse {
    cards_detected: Vec<RawCard>,
    #[serde(default)]
    total_detected: Option<usize>,
}

/// 検出1件（ワイヤ形式）。全フィールド必須
#[derive(Debug, Deserialize)]
struct RawCard {
    name: String,
    set: String,
    card_number: String,
    rarity: String,
    confidence: f64,
    bounding_box: [f64; 4],
}

/// パース済み識別レスポンス
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifyResponse {
    /// 検出結果（image_index は未設定=0）
    pub detections: Vec<Detection>,
    /// モデルが報告した総数。未報告なら検出件数
    pub total_detected: usize,
}

/// APIレスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. エラー
///
/// # Examples
/// ```
/// use card_scan_common::extract_json;
///
/// let response = "result: {\"cards_detected\": []}";
/// let json = extract_json(response).unwrap();
/// assert_eq!(json, "{\"cards_detected\": []}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    // ```json ... ``` ブロックを探す
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + "```json".len();
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    // 生の {...} を探す
    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

/// 識別レスポンスをパース
///
/// 1件でも必須フィールドが欠けていればレスポンス全体をスキーマエラーとする
/// （部分的な成功は扱わない）
pub fn parse_identify_response(response: &str) -> Result<IdentifyResponse> {
    let json_str = extract_json(response)?;
    let raw: RawIdentifyResponse = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Schema(format!("識別レスポンスがスキーマに一致しません: {}", e)))?;

    let detections: Vec<Detection> = raw
        .cards_detected
        .into_iter()
        .map(|card| Detection {
            name: card.name.trim().to_string(),
            set: card.set.trim().to_string(),
            card_number: card.card_number.trim().to_string(),
            rarity: card.rarity.trim().to_string(),
            confidence: card.confidence.clamp(0.0, 1.0),
            bounding_box: BoundingBox::from(card.bounding_box),
            image_index: 0,
            cropped_image: None,
            crop_rect: None,
        })
        .collect();

    let total_detected = raw.total_detected.unwrap_or(detections.len());

    Ok(IdentifyResponse {
        detections,
        total_detected,
    })
}
