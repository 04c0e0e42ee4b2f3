//! 対話セッション
//!
//! スキャナビュー（スキャン → 結果一覧 → コレクションへ追加）と
//! コレクションビュー（検索・レアリティ絞り込み）を行き来する。
//! 状態はすべてメモリ上の `AppState` にあり、終了すると破棄される。

use crate::convert::FormatConverter;
use crate::error::{CardScanError, Result};
use crate::identify::CardIdentifier;
use crate::pipeline::ScanPipeline;
use crate::progress;
use crate::scanner;
use card_scan_common::{
    AddOutcome, AppState, CardRecord, Collection, CollectionFilter, Command, CommandOutcome,
    Detection, RarityFilter, ResultView, ScanResult, View,
};
use dialoguer::{Input, Select};
use std::path::PathBuf;
use tracing::debug;

/// スキャナビューの操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScannerAction {
    Scan,
    AddOne,
    AddAll,
    Inspect,
    Reset,
    ShowCollection,
    Quit,
}

/// コレクションビューの操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectionAction {
    Search,
    Rarity,
    ClearFilter,
    ShowScanner,
    Quit,
}

pub struct Session<I, C> {
    pipeline: ScanPipeline<I, C>,
    app: AppState,
    filter: CollectionFilter,
}

impl<I: CardIdentifier, C: FormatConverter> Session<I, C> {
    pub fn new(pipeline: ScanPipeline<I, C>) -> Self {
        Self {
            pipeline,
            app: AppState::new(),
            filter: CollectionFilter::default(),
        }
    }

    pub async fn run(&mut self, initial_paths: Vec<PathBuf>) -> Result<()> {
        println!("🃏 card-scan - 対話セッション（終了するとコレクションは破棄されます）\n");

        if !initial_paths.is_empty() {
            self.scan(&initial_paths).await?;
        }

        loop {
            let quit = match self.app.view() {
                View::Scanner => self.scanner_view().await?,
                View::Collection => self.collection_view()?,
            };
            if quit {
                break;
            }
        }

        let collection = self.app.collection();
        println!(
            "\nセッション終了: {}種類 / {}枚",
            collection.len(),
            collection.total_quantity()
        );
        Ok(())
    }

    /// スキャナビュー。終了が選ばれたらtrue
    async fn scanner_view(&mut self) -> Result<bool> {
        match self.app.scan() {
            Some(scan) => print_scan(scan, self.app.results()),
            None => println!("\nスキャン結果はありません"),
        }

        let has_scan = self.app.scan().is_some();
        let mut actions = vec![(ScannerAction::Scan, "画像をスキャン")];
        if has_scan {
            actions.extend([
                (ScannerAction::AddOne, "1件をコレクションに追加"),
                (ScannerAction::AddAll, "残りをすべて追加"),
                (ScannerAction::Inspect, "検出結果の詳細を表示"),
                (ScannerAction::Reset, "スキャン結果をクリア"),
            ]);
        }
        actions.extend([
            (ScannerAction::ShowCollection, "コレクションを表示"),
            (ScannerAction::Quit, "終了"),
        ]);

        match select_action("操作", &actions)? {
            ScannerAction::Scan => {
                let paths = prompt_paths()?;
                if !paths.is_empty() {
                    self.scan(&paths).await?;
                }
            }
            ScannerAction::AddOne => {
                let len = self.app.scan().map_or(0, |s| s.detections.len());
                if let Some(index) = prompt_index("追加する番号", len)? {
                    self.apply(Command::AddCard(index));
                }
            }
            ScannerAction::AddAll => self.apply(Command::AddAllRemaining),
            ScannerAction::Inspect => {
                let len = self.app.scan().map_or(0, |s| s.detections.len());
                let index = prompt_index("詳細を表示する番号（空欄で解除）", len)?;
                self.apply(Command::Inspect(index));
            }
            ScannerAction::Reset => self.apply(Command::ResetScan),
            ScannerAction::ShowCollection => self.apply(Command::ShowView(View::Collection)),
            ScannerAction::Quit => return Ok(true),
        }
        Ok(false)
    }

    /// コレクションビュー。終了が選ばれたらtrue
    fn collection_view(&mut self) -> Result<bool> {
        print_collection(self.app.collection(), &self.filter);

        let actions = [
            (CollectionAction::Search, "カード名・セット名で検索"),
            (CollectionAction::Rarity, "レアリティで絞り込み"),
            (CollectionAction::ClearFilter, "絞り込みを解除"),
            (CollectionAction::ShowScanner, "スキャナに戻る"),
            (CollectionAction::Quit, "終了"),
        ];

        match select_action("操作", &actions)? {
            CollectionAction::Search => {
                self.filter.query = Input::new()
                    .with_prompt("検索語（空欄で解除）")
                    .allow_empty(true)
                    .interact_text()
                    .map_err(|e| CardScanError::Prompt(e.to_string()))?;
            }
            CollectionAction::Rarity => {
                self.filter.rarity = prompt_rarity(&self.app.collection().rarities())?;
            }
            CollectionAction::ClearFilter => self.filter = CollectionFilter::default(),
            CollectionAction::ShowScanner => self.apply(Command::ShowView(View::Scanner)),
            CollectionAction::Quit => return Ok(true),
        }
        Ok(false)
    }

    /// スキャンを実行して結果を差し替える。失敗時はメッセージのみ表示
    async fn scan(&mut self, paths: &[PathBuf]) -> Result<()> {
        let images = match scanner::collect_images(paths) {
            Ok(images) => images,
            Err(e) => {
                println!("✖ {}", e.user_message());
                return Ok(());
            }
        };
        println!("✔ {}枚の画像を検出", images.len());

        let pb = progress::spinner();
        let result = self
            .pipeline
            .run(&images, |phase| progress::report(&pb, phase))
            .await;

        match result {
            Ok(scan) => self.apply(Command::StartScan(scan)),
            Err(e) => {
                println!("✖ {}", e.user_message());
                // 前回の結果は残さない
                self.app.apply(Command::ResetScan)?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, command: Command) {
        debug!(?command, "コマンド実行");
        match self.app.apply(command) {
            Ok(outcome) => {
                if let Some(message) = describe_outcome(&outcome, &self.app) {
                    println!("{}", message);
                }
            }
            Err(e) => println!("✖ {}", e),
        }
    }
}

fn select_action<A: Copy>(prompt: &str, actions: &[(A, &str)]) -> Result<A> {
    let labels: Vec<&str> = actions.iter().map(|(_, label)| *label).collect();
    let selected = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact()
        .map_err(|e| CardScanError::Prompt(e.to_string()))?;
    Ok(actions[selected].0)
}

fn prompt_paths() -> Result<Vec<PathBuf>> {
    let input: String = Input::new()
        .with_prompt("画像ファイルまたはフォルダ（空白区切り、空欄でキャンセル）")
        .allow_empty(true)
        .interact_text()
        .map_err(|e| CardScanError::Prompt(e.to_string()))?;
    Ok(parse_paths(&input))
}

/// 1始まりの番号を入力させ、0始まりのインデックスを返す
fn prompt_index(prompt: &str, len: usize) -> Result<Option<usize>> {
    let input: String = Input::new()
        .with_prompt(format!("{} (1-{})", prompt, len))
        .allow_empty(true)
        .interact_text()
        .map_err(|e| CardScanError::Prompt(e.to_string()))?;
    Ok(parse_index(&input))
}

fn prompt_rarity(rarities: &[String]) -> Result<RarityFilter> {
    let mut labels = vec!["すべてのレアリティ".to_string()];
    labels.extend(rarities.iter().cloned());

    let selected = Select::new()
        .with_prompt("レアリティ")
        .items(&labels)
        .default(0)
        .interact()
        .map_err(|e| CardScanError::Prompt(e.to_string()))?;

    Ok(match selected {
        0 => RarityFilter::All,
        i => RarityFilter::Exact(rarities[i - 1].clone()),
    })
}

fn parse_paths(input: &str) -> Vec<PathBuf> {
    input.split_whitespace().map(PathBuf::from).collect()
}

fn parse_index(input: &str) -> Option<usize> {
    input.trim().parse::<usize>().ok()?.checked_sub(1)
}

fn describe_outcome(outcome: &CommandOutcome, app: &AppState) -> Option<String> {
    match outcome {
        CommandOutcome::ScanLoaded { detections, .. } => {
            Some(format!("✔ {}件のカードを検出しました", detections))
        }
        CommandOutcome::ScanCleared => Some("スキャン結果をクリアしました".to_string()),
        CommandOutcome::Added(AddOutcome::Inserted) => Some("✔ コレクションに追加しました".to_string()),
        CommandOutcome::Added(AddOutcome::Incremented(n)) => {
            Some(format!("✔ 登録済みのカードです（{}枚目）", n))
        }
        CommandOutcome::AlreadyAdded => Some("このカードは追加済みです".to_string()),
        CommandOutcome::AddedAll(n) => Some(format!("✔ {}件を追加しました", n)),
        CommandOutcome::Inspected(Some(i)) => app
            .scan()
            .and_then(|s| s.detections.get(*i))
            .map(|d| format_inspector(*i, d, app.scan())),
        CommandOutcome::Inspected(None) | CommandOutcome::ViewChanged(_) => None,
    }
}

fn print_scan(scan: &ScanResult, view: &ResultView) {
    println!(
        "\n── スキャン結果 #{}（{}件 / 報告総数 {}件 / 画像 {}枚）",
        scan.scan_id,
        scan.detections.len(),
        scan.total_detected,
        scan.source_images.len()
    );
    if scan.detections.is_empty() {
        println!("  カードは検出されませんでした");
    }
    for (i, d) in scan.detections.iter().enumerate() {
        println!("{}", format_detection_line(i, d, view.is_added(i)));
    }
}

fn print_collection(collection: &Collection, filter: &CollectionFilter) {
    let records = collection.filter(filter);
    println!(
        "\n── コレクション（{} / {}種類、計{}枚）{}",
        records.len(),
        collection.len(),
        collection.total_quantity(),
        format_filter(filter)
    );
    if records.is_empty() {
        println!("  該当するカードはありません");
    }
    for record in records {
        println!("{}", format_record_line(record));
    }
}

pub fn format_detection_line(index: usize, d: &Detection, added: bool) -> String {
    let status = if added {
        "追加済"
    } else if d.has_crop() {
        "      "
    } else {
        "画像なし"
    };
    format!(
        "  {:>2}. [{}] {} ({} #{}) {} - 信頼度 {:.0}% [画像{}]",
        index + 1,
        status,
        d.name,
        d.set,
        d.card_number,
        d.rarity,
        d.confidence * 100.0,
        d.image_index + 1
    )
}

pub fn format_record_line(r: &CardRecord) -> String {
    format!(
        "  ×{:<3} {} ({} #{}) {}",
        r.quantity, r.name, r.set, r.card_number, r.rarity
    )
}

fn format_filter(filter: &CollectionFilter) -> String {
    let mut parts = Vec::new();
    if !filter.query.trim().is_empty() {
        parts.push(format!("検索: \"{}\"", filter.query.trim()));
    }
    if let RarityFilter::Exact(rarity) = &filter.rarity {
        parts.push(format!("レアリティ: {}", rarity));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" [{}]", parts.join(", "))
    }
}

fn format_inspector(index: usize, d: &Detection, scan: Option<&ScanResult>) -> String {
    let source = scan
        .and_then(|s| s.source_images.get(d.image_index))
        .map(|s| s.file_name.as_str())
        .unwrap_or("不明");
    let bbox = d.bounding_box;
    let rect = d
        .crop_rect
        .map(|r| format!("{}x{} @ ({}, {})", r.width, r.height, r.x, r.y))
        .unwrap_or_else(|| "なし".to_string());

    format!(
        "── #{} {}\n  セット: {}\n  番号: {}\n  レアリティ: {}\n  信頼度: {:.2}\n  元画像: {}\n  ボックス: cx={:.3} cy={:.3} w={:.3} h={:.3}\n  切り出し: {}",
        index + 1,
        d.name,
        d.set,
        d.card_number,
        d.rarity,
        d.confidence,
        source,
        bbox.cx,
        bbox.cy,
        bbox.w,
        bbox.h,
        rect
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use card_scan_common::{BoundingBox, PixelRect, SourceImage};

    fn detection() -> Detection {
        Detection {
            name: "Charizard".to_string(),
            set: "Base Set".to_string(),
            card_number: "4/102".to_string(),
            rarity: "Holo Rare".to_string(),
            confidence: 0.934,
            bounding_box: BoundingBox::new(0.5, 0.5, 0.2, 0.3),
            image_index: 1,
            cropped_image: Some("data:image/jpeg;base64,AA==".to_string()),
            crop_rect: Some(PixelRect { x: 395, y: 345, width: 210, height: 310 }),
        }
    }

    #[test]
    fn test_parse_index_is_one_based() {
        assert_eq!(parse_index("1"), Some(0));
        assert_eq!(parse_index(" 3 "), Some(2));
        assert_eq!(parse_index("0"), None);
        assert_eq!(parse_index(""), None);
        assert_eq!(parse_index("abc"), None);
    }

    #[test]
    fn test_parse_paths() {
        assert_eq!(
            parse_paths(" a.jpg  photos/ "),
            vec![PathBuf::from("a.jpg"), PathBuf::from("photos/")]
        );
        assert!(parse_paths("   ").is_empty());
    }

    #[test]
    fn test_format_detection_line() {
        let line = format_detection_line(0, &detection(), false);
        assert!(line.contains(" 1."));
        assert!(line.contains("Charizard (Base Set #4/102) Holo Rare"));
        assert!(line.contains("信頼度 93%"));
        assert!(line.contains("[画像2]"));

        assert!(format_detection_line(0, &detection(), true).contains("追加済"));

        let mut no_crop = detection();
        no_crop.cropped_image = None;
        assert!(format_detection_line(0, &no_crop, false).contains("画像なし"));
    }

    #[test]
    fn test_format_record_line() {
        let mut record = CardRecord::from_detection(&detection());
        record.quantity = 3;
        assert_eq!(format_record_line(&record), "  ×3   Charizard (Base Set #4/102) Holo Rare");
    }

    #[test]
    fn test_format_filter() {
        assert_eq!(format_filter(&CollectionFilter::default()), "");
        let filter = CollectionFilter {
            query: " char ".into(),
            rarity: RarityFilter::Exact("Holo Rare".into()),
        };
        assert_eq!(format_filter(&filter), " [検索: \"char\", レアリティ: Holo Rare]");
    }

    #[test]
    fn test_format_inspector() {
        let scan = ScanResult {
            source_images: vec![
                SourceImage { file_name: "a.jpg".into(), ..Default::default() },
                SourceImage { file_name: "b.heic".into(), converted: true, ..Default::default() },
            ],
            detections: vec![detection()],
            ..Default::default()
        };
        let text = format_inspector(0, &scan.detections[0], Some(&scan));
        assert!(text.contains("元画像: b.heic"));
        assert!(text.contains("切り出し: 210x310 @ (395, 345)"));
    }

    #[test]
    fn test_describe_add_outcomes() {
        let app = AppState::new();
        assert_eq!(
            describe_outcome(&CommandOutcome::Added(AddOutcome::Incremented(2)), &app).as_deref(),
            Some("✔ 登録済みのカードです（2枚目）")
        );
        assert!(describe_outcome(&CommandOutcome::ViewChanged(View::Collection), &app).is_none());
    }
}
