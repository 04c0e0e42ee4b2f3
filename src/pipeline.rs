//! スキャン処理（アップロード〜識別〜切り出し）
//!
//! `Idle → Preparing → Identifying → Cropping → Done`、失敗時は `Failed(message)`。
//!
//! - Preparing: 各ファイルを読み込み、HEIC/HEIFはJPEGに変換（変換不可はバッチ失敗）
//! - Identifying: ファイルごとの識別を並行実行し、全件完了を待つ（1件でも失敗すればバッチ失敗）
//! - Cropping: 検出結果ごとに切り出し（失敗した検出結果は切り出しなしで残す）

use crate::convert::{prepare_image, FormatConverter, PreparedImage};
use crate::cropper::{crop_detections, decode_image};
use crate::error::{CardScanError, Result};
use crate::identify::CardIdentifier;
use crate::scanner::ImageInfo;
use card_scan_common::{merge_detections, Detection, ScanPhase, ScanResult, SourceImage};
use futures::future::try_join_all;
use rayon::prelude::*;
use tracing::{debug, info, warn};

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// フェーズ遷移を記録し、オブザーバへ通知する
struct PhaseTracker<F: FnMut(&ScanPhase)> {
    current: ScanPhase,
    on_phase: F,
}

impl<F: FnMut(&ScanPhase)> PhaseTracker<F> {
    fn new(on_phase: F) -> Self {
        Self {
            current: ScanPhase::Idle,
            on_phase,
        }
    }

    fn advance(&mut self, next: ScanPhase) {
        debug_assert!(
            self.current.can_transition_to(&next),
            "invalid transition {:?} -> {:?}",
            self.current,
            next
        );
        debug!(from = ?self.current, to = ?next, "スキャンフェーズ遷移");
        self.current = next;
        (self.on_phase)(&self.current);
    }
}

pub struct ScanPipeline<I, C> {
    identifier: I,
    converter: C,
    jpeg_quality: u8,
}

impl<I: CardIdentifier, C: FormatConverter> ScanPipeline<I, C> {
    pub fn new(identifier: I, converter: C) -> Self {
        Self {
            identifier,
            converter,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// 1バッチ分のスキャンを実行
    ///
    /// 失敗時は途中結果を破棄してエラーのみ返す。
    /// `on_phase` には遷移後のフェーズが渡される（終端は Done または Failed）。
    pub async fn run<F>(&self, images: &[ImageInfo], on_phase: F) -> Result<ScanResult>
    where
        F: FnMut(&ScanPhase),
    {
        let mut tracker = PhaseTracker::new(on_phase);

        match self.run_phases(images, &mut tracker).await {
            Ok(result) => {
                tracker.advance(ScanPhase::Done);
                info!(
                    images = result.source_images.len(),
                    detections = result.detections.len(),
                    cropped = result.cropped_count(),
                    "スキャン完了"
                );
                Ok(result)
            }
            Err(e) => {
                warn!("スキャン失敗: {}", e);
                tracker.advance(ScanPhase::Failed(e.user_message()));
                Err(e)
            }
        }
    }

    async fn run_phases<F>(
        &self,
        images: &[ImageInfo],
        tracker: &mut PhaseTracker<F>,
    ) -> Result<ScanResult>
    where
        F: FnMut(&ScanPhase),
    {
        tracker.advance(ScanPhase::Preparing);
        if images.is_empty() {
            return Err(CardScanError::NoImagesFound("入力画像がありません".into()));
        }
        let prepared = try_join_all(images.iter().map(|img| prepare_image(img, &self.converter))).await?;

        tracker.advance(ScanPhase::Identifying);
        // 完了順ではなく投入順で結果が並ぶ
        let responses = try_join_all(prepared.iter().map(|p| self.identifier.identify(p))).await?;
        let (detections, total_detected) = merge_detections(responses);
        debug!(detections = detections.len(), total_detected, "識別結果をマージ");

        tracker.advance(ScanPhase::Cropping);
        let source_images = prepared.iter().map(source_image).collect();
        let detections = crop_in_background(prepared, detections, self.jpeg_quality).await?;

        Ok(ScanResult {
            scan_id: 0,
            scanned_at: chrono::Local::now().to_rfc3339(),
            detections,
            source_images,
            total_detected,
        })
    }
}

fn source_image(prepared: &PreparedImage) -> SourceImage {
    SourceImage {
        file_name: prepared.info.file_name.clone(),
        path: prepared.info.path.display().to_string(),
        converted: prepared.converted,
    }
}

/// デコードと切り出しはCPU負荷が高いためブロッキングスレッドで実行
async fn crop_in_background(
    prepared: Vec<PreparedImage>,
    detections: Vec<Detection>,
    quality: u8,
) -> Result<Vec<Detection>> {
    tokio::task::spawn_blocking(move || {
        let sources: Vec<_> = prepared
            .par_iter()
            .map(|p| match decode_image(&p.bytes) {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!(file = %p.info.file_name, "画像をデコードできません: {}", e);
                    None
                }
            })
            .collect();

        crop_detections(detections, &sources, quality)
    })
    .await
    .map_err(|e| CardScanError::Internal(format!("切り出しタスクが異常終了: {}", e)))
}
