//! 検出範囲の切り出し
//!
//! 元画像をデコードし、検出結果ごとのバウンディングボックスを
//! JPEGの data URI として切り出す。切り出しに失敗した検出結果は
//! 切り出し画像なしのまま残す（バッチ全体は失敗させない）。

use crate::error::{CardScanError, Result};
use crate::scanner::exif::{apply_orientation, read_orientation};
use base64::Engine;
use card_scan_common::{crop_rect, BoundingBox, Detection, PixelRect, CROP_PADDING};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use rayon::prelude::*;
use tracing::warn;

/// 画像をデコードし、EXIFの向きを適用
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| CardScanError::ImageLoad(e.to_string()))?;

    Ok(match read_orientation(bytes) {
        Some(orientation) => apply_orientation(image, orientation),
        None => image,
    })
}

/// 1件分の切り出し
///
/// # Returns
/// (実際に切り出した範囲, JPEGの data URI)
pub fn crop_to_data_url(
    image: &DynamicImage,
    bbox: &BoundingBox,
    quality: u8,
) -> Result<(PixelRect, String)> {
    let rect = crop_rect(bbox, image.width(), image.height(), CROP_PADDING)?;
    let jpeg = encode_jpeg(&image.crop_imm(rect.x, rect.y, rect.width, rect.height), quality)?;
    Ok((rect, to_data_url("image/jpeg", &jpeg)))
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    // JPEGはアルファ非対応のためRGBに変換
    let rgb = image.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| CardScanError::ImageLoad(format!("JPEGエンコード失敗: {}", e)))?;
    Ok(buf)
}

/// 検出結果に切り出し画像を付与
///
/// `sources[i]` は image_index = i の元画像（デコード失敗時は None）。
/// 対応する元画像がない検出結果、切り出しに失敗した検出結果はそのまま返す。
/// 出力順は入力順と同じ。
pub fn crop_detections(
    detections: Vec<Detection>,
    sources: &[Option<DynamicImage>],
    quality: u8,
) -> Vec<Detection> {
    detections
        .into_par_iter()
        .map(|detection| {
            let Some(Some(image)) = sources.get(detection.image_index) else {
                return detection;
            };

            match crop_to_data_url(image, &detection.bounding_box, quality) {
                Ok((rect, data_url)) => Detection {
                    cropped_image: Some(data_url),
                    crop_rect: Some(rect),
                    ..detection
                },
                Err(e) => {
                    warn!(
                        card = %detection.name,
                        image_index = detection.image_index,
                        "切り出しに失敗、元の検出結果を使用: {}",
                        e
                    );
                    detection
                }
            }
        })
        .collect()
}

pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Data URLからBase64データ部分を抽出
///
/// # Arguments
/// * `data_url` - "data:image/jpeg;base64,/9j/4AAQ..." 形式のData URL
pub fn extract_base64_from_data_url(data_url: &str) -> Option<&str> {
    data_url.split(',').nth(1)
}

/// Data URLをバイト列にデコード
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    let data = extract_base64_from_data_url(data_url)
        .ok_or_else(|| CardScanError::ImageLoad("Invalid data URL".into()))?;
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| CardScanError::ImageLoad(format!("Invalid data URL: {}", e)))
}
