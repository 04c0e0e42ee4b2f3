//! スキャン処理の結合テスト
//!
//! 識別APIをモックに差し替え、実画像（PNG）で準備〜識別〜切り出しを通す

use card_scan::convert::{FormatConverter, PreparedImage};
use card_scan::error::{CardScanError, Result};
use card_scan::identify::CardIdentifier;
use card_scan::pipeline::ScanPipeline;
use card_scan::scanner::{self, ImageInfo};
use card_scan_common::{
    AppState, BoundingBox, Command, CommandOutcome, Detection, IdentifyResponse, ScanPhase,
};
use image::{DynamicImage, RgbImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::tempdir;

/// ファイルごとの応答
#[derive(Clone)]
enum Reply {
    Cards(Vec<(&'static str, BoundingBox)>),
    Fail,
}

/// ファイル名ごとに遅延と応答を決めるモック
struct MockIdentifier {
    replies: HashMap<String, (Duration, Reply)>,
    /// 完了した順に記録
    completed: Mutex<Vec<String>>,
}

impl MockIdentifier {
    fn new(replies: Vec<(&str, u64, Reply)>) -> Self {
        Self {
            replies: replies
                .into_iter()
                .map(|(name, delay, reply)| (name.to_string(), (Duration::from_millis(delay), reply)))
                .collect(),
            completed: Mutex::new(Vec::new()),
        }
    }

    fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }
}

impl CardIdentifier for MockIdentifier {
    async fn identify(&self, image: &PreparedImage) -> Result<IdentifyResponse> {
        let (delay, reply) = self
            .replies
            .get(&image.info.file_name)
            .cloned()
            .unwrap_or((Duration::ZERO, Reply::Cards(Vec::new())));

        tokio::time::sleep(delay).await;
        self.completed.lock().unwrap().push(image.info.file_name.clone());

        match reply {
            Reply::Cards(cards) => Ok(IdentifyResponse {
                total_detected: cards.len(),
                detections: cards.into_iter().map(|(name, bbox)| card(name, bbox)).collect(),
            }),
            Reply::Fail => Err(CardScanError::ApiParse("schema mismatch".into())),
        }
    }
}

/// HEIC/HEIFを所定のPNGに「変換」するモック
struct StubConverter {
    output: Option<Vec<u8>>,
}

impl FormatConverter for StubConverter {
    async fn convert_to_jpeg(&self, image: &ImageInfo) -> Result<Vec<u8>> {
        self.output.clone().ok_or_else(|| CardScanError::MissingCapability {
            file: image.file_name.clone(),
            reason: "no converter".into(),
        })
    }
}

fn no_converter() -> StubConverter {
    StubConverter { output: None }
}

fn card(name: &str, bbox: BoundingBox) -> Detection {
    Detection {
        name: name.to_string(),
        set: "Base Set".to_string(),
        card_number: "4/102".to_string(),
        rarity: "Rare Holo".to_string(),
        confidence: 0.9,
        bounding_box: bbox,
        image_index: 0,
        cropped_image: None,
        crop_rect: None,
    }
}

fn center() -> BoundingBox {
    BoundingBox::new(0.5, 0.5, 0.2, 0.3)
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, png_bytes(width, height)).unwrap();
    path
}

fn images(paths: &[PathBuf]) -> Vec<ImageInfo> {
    scanner::collect_images(paths).unwrap()
}

#[tokio::test]
async fn test_detections_keep_submission_order_and_index() {
    let dir = tempdir().unwrap();
    let a = write_png(dir.path(), "a.png", 200, 200);
    let b = write_png(dir.path(), "b.png", 200, 200);

    // 1枚目の方が遅く返る
    let identifier = MockIdentifier::new(vec![
        ("a.png", 80, Reply::Cards(vec![("A1", center()), ("A2", center())])),
        ("b.png", 0, Reply::Cards(vec![("B1", center())])),
    ]);
    let pipeline = ScanPipeline::new(identifier, no_converter());

    let result = pipeline.run(&images(&[a, b]), |_| {}).await.unwrap();

    let tagged: Vec<(&str, usize)> = result
        .detections
        .iter()
        .map(|d| (d.name.as_str(), d.image_index))
        .collect();
    assert_eq!(tagged, vec![("A1", 0), ("A2", 0), ("B1", 1)]);
    assert_eq!(result.total_detected, 3);
    assert_eq!(result.source_images.len(), 2);
    assert_eq!(result.source_images[0].file_name, "a.png");
}

#[tokio::test]
async fn test_completion_order_differs_from_result_order() {
    let dir = tempdir().unwrap();
    let a = write_png(dir.path(), "a.png", 50, 50);
    let b = write_png(dir.path(), "b.png", 50, 50);

    let identifier = MockIdentifier::new(vec![
        ("a.png", 80, Reply::Cards(vec![("A1", center())])),
        ("b.png", 0, Reply::Cards(vec![("B1", center())])),
    ]);

    // 完了順を確認するため、識別器を参照で渡す
    let dir_images = images(&[a, b]);
    let pipeline = ScanPipeline::new(&identifier, no_converter());
    let result = pipeline.run(&dir_images, |_| {}).await.unwrap();

    assert_eq!(identifier.completed(), vec!["b.png", "a.png"]);
    assert_eq!(result.detections[0].name, "A1");
    assert_eq!(result.detections[1].name, "B1");
}

#[tokio::test]
async fn test_one_failed_identification_fails_batch() {
    let dir = tempdir().unwrap();
    let a = write_png(dir.path(), "a.png", 50, 50);
    let b = write_png(dir.path(), "b.png", 50, 50);

    let identifier = MockIdentifier::new(vec![
        ("a.png", 0, Reply::Cards(vec![("A1", center())])),
        ("b.png", 10, Reply::Fail),
    ]);
    let pipeline = ScanPipeline::new(identifier, no_converter());

    let mut phases = Vec::new();
    let err = pipeline
        .run(&images(&[a, b]), |p| phases.push(p.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, CardScanError::ApiParse(_)));
    assert_eq!(
        phases,
        vec![
            ScanPhase::Preparing,
            ScanPhase::Identifying,
            ScanPhase::Failed(err.user_message()),
        ]
    );
}

#[tokio::test]
async fn test_phase_sequence_on_success() {
    let dir = tempdir().unwrap();
    let a = write_png(dir.path(), "a.png", 50, 50);

    let pipeline = ScanPipeline::new(MockIdentifier::new(vec![]), no_converter());
    let mut phases = Vec::new();
    let result = pipeline
        .run(&images(&[a]), |p| phases.push(p.clone()))
        .await
        .unwrap();

    assert!(result.detections.is_empty());
    assert_eq!(result.total_detected, 0);
    assert_eq!(
        phases,
        vec![
            ScanPhase::Preparing,
            ScanPhase::Identifying,
            ScanPhase::Cropping,
            ScanPhase::Done,
        ]
    );
}

#[tokio::test]
async fn test_crop_failure_keeps_detection() {
    let dir = tempdir().unwrap();
    let a = write_png(dir.path(), "a.png", 1000, 1000);

    let identifier = MockIdentifier::new(vec![(
        "a.png",
        0,
        Reply::Cards(vec![
            ("Inside", center()),
            // 画像の外側（切り出し範囲が空）
            ("Outside", BoundingBox::new(1.5, 1.5, 0.1, 0.1)),
        ]),
    )]);
    let pipeline = ScanPipeline::new(identifier, no_converter());
    let result = pipeline.run(&images(&[a]), |_| {}).await.unwrap();

    assert_eq!(result.detections.len(), 2);
    assert_eq!(result.cropped_count(), 1);

    let inside = &result.detections[0];
    let rect = inside.crop_rect.unwrap();
    assert_eq!((rect.x, rect.y, rect.width, rect.height), (395, 345, 210, 310));
    assert!(inside
        .cropped_image
        .as_deref()
        .is_some_and(|url| url.starts_with("data:image/jpeg;base64,")));

    let outside = &result.detections[1];
    assert!(!outside.has_crop());
    assert_eq!(outside.name, "Outside");
}

#[tokio::test]
async fn test_undecodable_image_keeps_detections_without_crop() {
    let dir = tempdir().unwrap();
    let broken = dir.path().join("broken.jpg");
    std::fs::write(&broken, b"not really a jpeg").unwrap();

    let identifier = MockIdentifier::new(vec![(
        "broken.jpg",
        0,
        Reply::Cards(vec![("Card", center())]),
    )]);
    let pipeline = ScanPipeline::new(identifier, no_converter());
    let result = pipeline.run(&images(&[broken]), |_| {}).await.unwrap();

    assert_eq!(result.detections.len(), 1);
    assert_eq!(result.cropped_count(), 0);
}

#[tokio::test]
async fn test_heic_without_converter_fails_before_identification() {
    let dir = tempdir().unwrap();
    let a = write_png(dir.path(), "a.png", 50, 50);
    let heic = dir.path().join("IMG_0001.HEIC");
    std::fs::write(&heic, b"heic").unwrap();

    let identifier = MockIdentifier::new(vec![]);
    let pipeline = ScanPipeline::new(&identifier, no_converter());

    let mut phases = Vec::new();
    let err = pipeline
        .run(&images(&[a, heic]), |p| phases.push(p.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, CardScanError::MissingCapability { ref file, .. } if file == "IMG_0001.HEIC"));
    assert!(err.user_message().contains("IMG_0001.HEIC"));
    assert_eq!(phases[0], ScanPhase::Preparing);
    assert!(matches!(phases[1], ScanPhase::Failed(_)));
    assert!(identifier.completed().is_empty());
}

#[tokio::test]
async fn test_converted_heic_is_cropped() {
    let dir = tempdir().unwrap();
    let heic = dir.path().join("IMG_0002.heic");
    std::fs::write(&heic, b"heic").unwrap();

    let identifier = MockIdentifier::new(vec![(
        "IMG_0002.heic",
        0,
        Reply::Cards(vec![("Card", center())]),
    )]);
    let converter = StubConverter { output: Some(png_bytes(100, 100)) };
    let pipeline = ScanPipeline::new(identifier, converter);
    let result = pipeline.run(&images(&[heic]), |_| {}).await.unwrap();

    assert!(result.source_images[0].converted);
    assert_eq!(result.cropped_count(), 1);
}

#[tokio::test]
async fn test_scan_result_flows_into_collection() {
    let dir = tempdir().unwrap();
    let a = write_png(dir.path(), "a.png", 400, 400);
    let b = write_png(dir.path(), "b.png", 400, 400);

    let identifier = MockIdentifier::new(vec![
        ("a.png", 0, Reply::Cards(vec![("Charizard", center())])),
        ("b.png", 0, Reply::Cards(vec![("Charizard", center()), ("Pikachu", center())])),
    ]);
    let pipeline = ScanPipeline::new(identifier, no_converter());
    let scan = pipeline.run(&images(&[a, b]), |_| {}).await.unwrap();

    let mut app = AppState::new();
    assert!(matches!(
        app.apply(Command::StartScan(scan)).unwrap(),
        CommandOutcome::ScanLoaded { detections: 3, .. }
    ));
    assert_eq!(app.apply(Command::AddAllRemaining).unwrap(), CommandOutcome::AddedAll(3));

    // 同じカードは数量に合算される
    assert_eq!(app.collection().len(), 2);
    assert_eq!(app.collection().total_quantity(), 3);
}
