//! スキャン結果の書き出し
//!
//! 出力先フォルダに `scan.json` と切り出し画像（crops/*.jpg）を保存する

use crate::cropper::decode_data_url;
use crate::error::Result;
use card_scan_common::{Detection, ScanResult};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SCAN_FILE_NAME: &str = "scan.json";
const CROPS_DIR: &str = "crops";

/// 書き出し結果
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub scan_file: PathBuf,
    pub crop_files: Vec<PathBuf>,
}

pub fn export_scan(scan: &ScanResult, output_dir: &Path) -> Result<ExportSummary> {
    std::fs::create_dir_all(output_dir)?;

    let scan_file = output_dir.join(SCAN_FILE_NAME);
    std::fs::write(&scan_file, serde_json::to_string_pretty(scan)?)?;

    let crops_dir = output_dir.join(CROPS_DIR);
    let mut crop_files = Vec::new();

    for (i, detection) in scan.detections.iter().enumerate() {
        let Some(data_url) = detection.cropped_image.as_deref() else {
            continue;
        };

        if crop_files.is_empty() {
            std::fs::create_dir_all(&crops_dir)?;
        }

        let path = crops_dir.join(crop_file_name(i, detection));
        std::fs::write(&path, decode_data_url(data_url)?)?;
        debug!(path = %path.display(), "切り出し画像を保存");
        crop_files.push(path);
    }

    Ok(ExportSummary {
        scan_file,
        crop_files,
    })
}

/// `03-charizard-4_102.jpg` 形式のファイル名
pub fn crop_file_name(index: usize, detection: &Detection) -> String {
    let mut name = format!("{:02}-{}", index + 1, sanitize(&detection.name));
    if !detection.card_number.is_empty() {
        name.push('-');
        name.push_str(&sanitize(&detection.card_number));
    }
    name.push_str(".jpg");
    name
}

fn sanitize(s: &str) -> String {
    let cleaned: String = s
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "card".to_string()
    } else {
        cleaned
    }
}
