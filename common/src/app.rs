//! アプリケーション状態
//!
//! 現在のスキャン結果とコレクションを所有する。
//! 状態の変更は `Command` を `AppState::apply` に渡す形でのみ行う。

use crate::collection::{AddOutcome, Collection};
use crate::error::{Error, Result};
use crate::presentation::ResultView;
use crate::types::ScanResult;

/// 表示中のビュー
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Scanner,
    Collection,
}

/// 状態変更コマンド
#[derive(Debug, Clone)]
pub enum Command {
    /// 新しいスキャン結果を表示（前回の結果は破棄）
    StartScan(ScanResult),
    /// スキャン結果を破棄
    ResetScan,
    /// 検出結果1件をコレクションに追加
    AddCard(usize),
    /// 未追加かつ切り出し済みの検出結果をすべて追加
    AddAllRemaining,
    /// インスペクタ選択
    Inspect(Option<usize>),
    ShowView(View),
}

/// コマンド実行結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    ScanLoaded { scan_id: u64, detections: usize },
    ScanCleared,
    Added(AddOutcome),
    AlreadyAdded,
    AddedAll(usize),
    Inspected(Option<usize>),
    ViewChanged(View),
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    view: View,
    scan: Option<ScanResult>,
    results: ResultView,
    collection: Collection,
    last_scan_id: u64,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn scan(&self) -> Option<&ScanResult> {
        self.scan.as_ref()
    }

    pub fn results(&self) -> &ResultView {
        &self.results
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn apply(&mut self, command: Command) -> Result<CommandOutcome> {
        match command {
            Command::StartScan(mut scan) => {
                // 内容が同じでも再スキャンは別の結果として扱う
                self.last_scan_id += 1;
                scan.scan_id = self.last_scan_id;
                self.results.sync(&scan);

                let outcome = CommandOutcome::ScanLoaded {
                    scan_id: scan.scan_id,
                    detections: scan.detections.len(),
                };
                self.scan = Some(scan);
                self.view = View::Scanner;
                Ok(outcome)
            }

            Command::ResetScan => {
                self.scan = None;
                self.results.clear();
                Ok(CommandOutcome::ScanCleared)
            }

            Command::AddCard(index) => {
                let scan = self.scan.as_ref().ok_or_else(no_scan)?;
                let detection = scan.detections.get(index).ok_or_else(|| {
                    Error::Command(format!(
                        "検出結果 #{} は存在しません（{}件）",
                        index + 1,
                        scan.detections.len()
                    ))
                })?;

                if !self.results.mark_added(index) {
                    return Ok(CommandOutcome::AlreadyAdded);
                }
                Ok(CommandOutcome::Added(self.collection.add(detection)))
            }

            Command::AddAllRemaining => {
                let scan = self.scan.as_ref().ok_or_else(no_scan)?;
                let remaining = self.results.remaining(scan);

                for &index in &remaining {
                    self.results.mark_added(index);
                    self.collection.add(&scan.detections[index]);
                }
                Ok(CommandOutcome::AddedAll(remaining.len()))
            }

            Command::Inspect(index) => {
                if let Some(i) = index {
                    let len = self.scan.as_ref().map_or(0, |s| s.detections.len());
                    if i >= len {
                        return Err(Error::Command(format!("検出結果 #{} は存在しません", i + 1)));
                    }
                }
                self.results.inspect(index);
                Ok(CommandOutcome::Inspected(index))
            }

            Command::ShowView(view) => {
                self.view = view;
                Ok(CommandOutcome::ViewChanged(view))
            }
        }
    }
}

fn no_scan() -> Error {
    Error::Command("スキャン結果がありません".into())
}
