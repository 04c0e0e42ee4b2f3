//! 画像形式の正規化
//!
//! HEIC/HEIF は識別APIにもデコーダにも渡せないため、外部コマンドでJPEGに変換する。
//! 変換ツールがない場合は `MissingCapability`（リトライしない）。

use crate::error::{CardScanError, Result};
use crate::scanner::{ImageFormat, ImageInfo};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::process::Command;
use tracing::{debug, warn};

/// 識別・切り出しに渡せる状態になった画像
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub info: ImageInfo,
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    /// HEIC/HEIFから変換した場合true
    pub converted: bool,
}

/// HEIC/HEIF → JPEG 変換
#[allow(async_fn_in_trait)]
pub trait FormatConverter {
    async fn convert_to_jpeg(&self, image: &ImageInfo) -> Result<Vec<u8>>;
}

/// 外部コマンドによる変換（heif-convert → magick の順に試す）
#[derive(Debug, Clone)]
pub struct CommandConverter {
    /// `<program> <input> <output>` 形式で呼び出せるコマンド
    tools: Vec<String>,
    work_dir: PathBuf,
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

impl Default for CommandConverter {
    fn default() -> Self {
        Self::new(["heif-convert", "magick"])
    }
}

impl CommandConverter {
    pub fn new<I, S>(programs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tools: programs.into_iter().map(Into::into).collect(),
            work_dir: std::env::temp_dir().join("card-scan"),
        }
    }

    /// 一時ファイルの出力先を変更
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    fn temp_output(&self, image: &ImageInfo) -> PathBuf {
        let stem = image
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".into());
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.work_dir
            .join(format!("{}-{}-{}.jpg", std::process::id(), n, stem))
    }

    fn tool_names(&self) -> String {
        self.tools.join(", ")
    }
}

impl FormatConverter for CommandConverter {
    async fn convert_to_jpeg(&self, image: &ImageInfo) -> Result<Vec<u8>> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let output = self.temp_output(image);

        for tool in &self.tools {
            debug!(tool = %tool, file = %image.file_name, "HEIC変換を実行");

            let result = Command::new(tool)
                .arg(&image.path)
                .arg(&output)
                .output()
                .await;

            let out = match result {
                Ok(out) => out,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(tool = %tool, "変換ツールが見つかりません");
                    continue;
                }
                Err(e) => return Err(CardScanError::Io(e)),
            };

            if !out.status.success() {
                remove_outputs(&output).await;
                let stderr = String::from_utf8_lossy(&out.stderr);
                return Err(CardScanError::ImageLoad(format!(
                    "{} の変換に失敗 ({} code {:?}): {}",
                    image.file_name,
                    tool,
                    out.status.code(),
                    stderr.trim()
                )));
            }

            return read_first_output(&output).await;
        }

        warn!(file = %image.file_name, "HEIC/HEIF変換ツールが利用できません");
        Err(CardScanError::MissingCapability {
            file: image.file_name.clone(),
            reason: format!("{} のいずれも見つかりません", self.tool_names()),
        })
    }
}

/// 変換結果を読み込んで一時ファイルを削除
///
/// 複数画像を含むHEICでは `name-1.jpg`, `name-2.jpg`... と出力されるため先頭を使う
async fn read_first_output(output: &Path) -> Result<Vec<u8>> {
    let candidates = [output.to_path_buf(), numbered_output(output, 1)];

    let mut found = None;
    for candidate in &candidates {
        if let Ok(bytes) = tokio::fs::read(candidate).await {
            found = Some(bytes);
            break;
        }
    }
    remove_outputs(output).await;

    found.ok_or_else(|| {
        CardScanError::ImageLoad(format!("変換結果が見つかりません: {}", output.display()))
    })
}

/// 出力ファイルと連番付きの出力（`-1.jpg`, `-2.jpg`...）をすべて削除
async fn remove_outputs(output: &Path) {
    let _ = tokio::fs::remove_file(output).await;

    // 連番は1から途切れなく出力される
    for n in 1.. {
        if tokio::fs::remove_file(numbered_output(output, n)).await.is_err() {
            break;
        }
    }
}

fn numbered_output(output: &Path, n: usize) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    output.with_file_name(format!("{}-{}.jpg", stem, n))
}

/// 画像を読み込み、必要ならJPEGへ変換
pub async fn prepare_image<C: FormatConverter>(
    info: &ImageInfo,
    converter: &C,
) -> Result<PreparedImage> {
    if info.format.needs_conversion() {
        let bytes = converter.convert_to_jpeg(info).await?;
        return Ok(PreparedImage {
            info: info.clone(),
            bytes,
            mime_type: ImageFormat::Jpeg.mime_type(),
            converted: true,
        });
    }

    let bytes = tokio::fs::read(&info.path).await.map_err(|e| {
        CardScanError::ImageLoad(format!("{}: {}", info.path.display(), e))
    })?;

    Ok(PreparedImage {
        info: info.clone(),
        bytes,
        mime_type: info.format.mime_type(),
        converted: false,
    })
}
