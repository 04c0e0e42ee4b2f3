//! プロンプト・レスポンススキーマ生成モジュール
//!
//! 識別呼び出しで送る指示文と、モデルに強制する出力スキーマ:
//! - build_identify_prompt: カード識別用プロンプト
//! - identify_response_schema: `cards_detected` 配列のJSONスキーマ

use serde_json::{json, Value};

/// カード識別プロンプト生成
///
/// # Arguments
/// * `file_name` - 解析対象のファイル名（モデルへの手がかりとして渡す）
pub fn build_identify_prompt(file_name: &str) -> String {
    format!(
        r#"You are an expert trading card grader. Identify every trading card visible in the attached photo ({file_name}).

For each card, report:
- name: the card name exactly as printed
- set: the full name of the set or expansion
- card_number: the collector number as printed (e.g. "58/102"); use "" if it cannot be read
- rarity: the rarity label (e.g. "Common", "Uncommon", "Rare", "Holo Rare")
- confidence: your confidence in the identification, from 0.0 to 1.0
- bounding_box: [center_x, center_y, width, height] of the card, each normalized to 0.0-1.0 relative to the image width/height

Also report total_detected, the number of cards you can see.
Do not invent cards that are not visible. If no card is visible, return an empty cards_detected array.
Respond with JSON only."#
    )
}

/// 識別レスポンスのJSONスキーマ（Gemini `responseSchema` 形式）
pub fn identify_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "cards_detected": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "set": { "type": "STRING" },
                        "card_number": { "type": "STRING" },
                        "rarity": { "type": "STRING" },
                        "confidence": { "type": "NUMBER" },
                        "bounding_box": {
                            "type": "ARRAY",
                            "items": { "type": "NUMBER" },
                            "minItems": 4,
                            "maxItems": 4
                        }
                    },
                    "required": ["name", "set", "card_number", "rarity", "confidence", "bounding_box"]
                }
            },
            "total_detected": { "type": "INTEGER" }
        },
        "required": ["cards_detected"]
    })
}
