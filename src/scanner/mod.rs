pub mod exif;

use crate::error::{CardScanError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 入力画像の形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    /// HEIC/HEIF（識別前にJPEGへ変換が必要）
    Heif,
}

impl ImageFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "webp" => Some(ImageFormat::Webp),
            "heic" | "heif" => Some(ImageFormat::Heif),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Heif => "image/heic",
        }
    }

    pub fn needs_conversion(&self) -> bool {
        matches!(self, ImageFormat::Heif)
    }
}

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub format: ImageFormat,
}

impl ImageInfo {
    pub fn from_path(path: &Path) -> Option<Self> {
        let format = path
            .extension()
            .and_then(|ext| ImageFormat::from_extension(&ext.to_string_lossy()))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Some(Self {
            path: path.to_path_buf(),
            file_name,
            format,
        })
    }
}

/// 入力パス（ファイルまたはフォルダ）から画像一覧を作成
///
/// - ファイル: 指定順のまま追加（対応外の拡張子はエラー）
/// - フォルダ: 直下の画像をファイル名順で追加
pub fn collect_images(paths: &[PathBuf]) -> Result<Vec<ImageInfo>> {
    let mut images = Vec::new();

    for path in paths {
        if !path.exists() {
            return Err(CardScanError::FileNotFound(path.display().to_string()));
        }

        if path.is_dir() {
            images.extend(scan_folder(path)?);
            continue;
        }

        let info = ImageInfo::from_path(path).ok_or_else(|| {
            CardScanError::ImageLoad(format!("対応していない形式です: {}", path.display()))
        })?;
        images.push(info);
    }

    if images.is_empty() {
        let joined = paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(CardScanError::NoImagesFound(joined));
    }

    Ok(images)
}

pub fn scan_folder(folder: &Path) -> Result<Vec<ImageInfo>> {
    if !folder.exists() {
        return Err(CardScanError::FileNotFound(folder.display().to_string()));
    }

    let mut images: Vec<ImageInfo> = WalkDir::new(folder)
        .max_depth(1) // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| ImageInfo::from_path(e.path()))
        .collect();

    // ファイル名でソート
    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ImageFormat::from_extension("jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("JPEG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("HEIC"), Some(ImageFormat::Heif));
        assert_eq!(ImageFormat::from_extension("heif"), Some(ImageFormat::Heif));
        assert_eq!(ImageFormat::from_extension("txt"), None);
        assert_eq!(ImageFormat::from_extension("gif"), None);
    }

    #[test]
    fn test_only_heif_needs_conversion() {
        assert!(ImageFormat::Heif.needs_conversion());
        assert!(!ImageFormat::Jpeg.needs_conversion());
        assert!(!ImageFormat::Webp.needs_conversion());
    }

    #[test]
    fn test_scan_folder_with_images() {
        let dir = tempfile::tempdir().unwrap();

        File::create(dir.path().join("b.jpg")).unwrap().write_all(b"dummy").unwrap();
        File::create(dir.path().join("a.HEIC")).unwrap().write_all(b"dummy").unwrap();
        File::create(dir.path().join("c.png")).unwrap().write_all(b"dummy").unwrap();
        File::create(dir.path().join("readme.txt")).unwrap().write_all(b"text").unwrap();

        let result = scan_folder(dir.path()).unwrap();
        let names: Vec<&str> = result.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.HEIC", "b.jpg", "c.png"]);
        assert_eq!(result[0].format, ImageFormat::Heif);
    }

    #[test]
    fn test_collect_images_keeps_argument_order() {
        let dir = tempfile::tempdir().unwrap();
        let z = dir.path().join("z.jpg");
        let a = dir.path().join("a.jpg");
        File::create(&z).unwrap();
        File::create(&a).unwrap();

        let result = collect_images(&[z, a]).unwrap();
        assert_eq!(result[0].file_name, "z.jpg");
        assert_eq!(result[1].file_name, "a.jpg");
    }

    #[test]
    fn test_collect_images_rejects_unsupported_file() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        File::create(&txt).unwrap();

        assert!(matches!(collect_images(&[txt]), Err(CardScanError::ImageLoad(_))));
    }

    #[test]
    fn test_collect_images_missing_path() {
        let result = collect_images(&[PathBuf::from("/nonexistent/card.jpg")]);
        assert!(matches!(result, Err(CardScanError::FileNotFound(_))));
    }
}
