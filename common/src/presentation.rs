//! 検出結果の表示状態
//!
//! どの検出結果（位置で識別）をコレクションへ追加済みか、
//! インスペクタで選択中の検出結果はどれか、を保持する。
//! 新しいスキャン結果（scan_id が変わったもの）を受け取ると状態をリセットする。

use crate::types::ScanResult;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultView {
    scan_id: Option<u64>,
    added: BTreeSet<usize>,
    inspected: Option<usize>,
}

impl ResultView {
    pub fn new() -> Self {
        Self::default()
    }

    /// 表示中のスキャン結果と同期。別のスキャンなら追加済み・選択状態を破棄
    pub fn sync(&mut self, scan: &ScanResult) {
        if self.scan_id != Some(scan.scan_id) {
            *self = Self {
                scan_id: Some(scan.scan_id),
                ..Self::default()
            };
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn scan_id(&self) -> Option<u64> {
        self.scan_id
    }

    pub fn is_added(&self, index: usize) -> bool {
        self.added.contains(&index)
    }

    /// 追加済みにする。既に追加済みならfalse
    pub fn mark_added(&mut self, index: usize) -> bool {
        self.added.insert(index)
    }

    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    /// 「残りをすべて追加」の対象
    ///
    /// 切り出し画像がないもの、追加済みのものは除外
    pub fn remaining(&self, scan: &ScanResult) -> Vec<usize> {
        scan.detections
            .iter()
            .enumerate()
            .filter(|(i, d)| d.has_crop() && !self.is_added(*i))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn inspected(&self) -> Option<usize> {
        self.inspected
    }

    /// インスペクタ選択（同時に1件まで、Noneで解除）
    pub fn inspect(&mut self, index: Option<usize>) {
        self.inspected = index;
    }
}
