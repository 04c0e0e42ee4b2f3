//! 識別結果のマージ処理
//!
//! ファイルごとの識別結果を投入順に連結し、元画像のインデックスを付与する

use crate::parser::IdentifyResponse;
use crate::types::Detection;

/// ファイルごとの識別結果を1つの検出リストにまとめる
///
/// `responses[i]` は i 番目に投入したファイルの結果。完了順ではなく投入順で
/// 連結し、各検出結果に `image_index = i` を設定する。ファイル内の順序は保持。
///
/// # Returns
/// (検出結果, 報告された総数の合計)
pub fn merge_detections(responses: Vec<IdentifyResponse>) -> (Vec<Detection>, usize) {
    let total = responses.iter().map(|r| r.total_detected).sum();

    let detections = responses
        .into_iter()
        .enumerate()
        .flat_map(|(image_index, response)| {
            response.detections.into_iter().map(move |mut d| {
                d.image_index = image_index;
                d
            })
        })
        .collect();

    (detections, total)
}
