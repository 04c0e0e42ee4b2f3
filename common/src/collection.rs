//! コレクション管理
//!
//! (カード名, セット名, カード番号) をキーにしたマップで同一性を保証する。
//! 同じキーを追加した場合は新規レコードを作らず枚数を加算する。

use crate::types::{CardKey, CardRecord, Detection};
use std::collections::{BTreeSet, HashMap};

/// 追加結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// 新規レコードとして追加
    Inserted,
    /// 既存レコードの枚数を加算（加算後の枚数）
    Incremented(u32),
}

/// コレクション（登録順を保持）
#[derive(Debug, Clone, Default)]
pub struct Collection {
    records: Vec<CardRecord>,
    index: HashMap<CardKey, usize>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 検出結果をコレクションに追加
    ///
    /// 既存キーなら枚数+1（他フィールドは最初の登録時のまま）
    pub fn add(&mut self, detection: &Detection) -> AddOutcome {
        let key = detection.key();

        if let Some(&pos) = self.index.get(&key) {
            let record = &mut self.records[pos];
            record.quantity += 1;
            return AddOutcome::Incremented(record.quantity);
        }

        self.index.insert(key, self.records.len());
        self.records.push(CardRecord::from_detection(detection));
        AddOutcome::Inserted
    }

    pub fn get(&self, key: &CardKey) -> Option<&CardRecord> {
        self.index.get(key).map(|&pos| &self.records[pos])
    }

    pub fn records(&self) -> &[CardRecord] {
        &self.records
    }

    /// レコード数（種類数）
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 枚数の合計
    pub fn total_quantity(&self) -> u32 {
        self.records.iter().map(|r| r.quantity).sum()
    }

    /// 登録済みレアリティ一覧（重複除去・ソート済み、空文字は除外）
    pub fn rarities(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.rarity.as_str())
            .filter(|r| !r.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// フィルタ条件に一致するレコードを登録順に返す
    pub fn filter(&self, filter: &CollectionFilter) -> Vec<&CardRecord> {
        self.records.iter().filter(|r| filter.matches(r)).collect()
    }
}

/// レアリティ条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RarityFilter {
    /// 絞り込みなし
    #[default]
    All,
    /// 完全一致
    Exact(String),
}

impl RarityFilter {
    fn matches(&self, rarity: &str) -> bool {
        match self {
            RarityFilter::All => true,
            RarityFilter::Exact(expected) => expected == rarity,
        }
    }
}

/// コレクション表示用のフィルタ
///
/// - query: カード名またはセット名の部分一致（大文字小文字を区別しない）
/// - rarity: レアリティ完全一致
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionFilter {
    pub query: String,
    pub rarity: RarityFilter,
}

impl CollectionFilter {
    pub fn matches(&self, record: &CardRecord) -> bool {
        self.matches_query(record) && self.rarity.matches(&record.rarity)
    }

    fn matches_query(&self, record: &CardRecord) -> bool {
        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        record.name.to_lowercase().contains(&query) || record.set.to_lowercase().contains(&query)
    }
}
