//! スキャン処理の状態遷移
//!
//! `Idle → Preparing → Identifying → Cropping → Done`
//! どの段階からも `Failed(message)` に遷移できる。

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScanPhase {
    #[default]
    Idle,
    /// 入力ファイルの読み込み・形式変換
    Preparing,
    /// 識別API呼び出し中
    Identifying,
    /// 検出範囲の切り出し中
    Cropping,
    Done,
    Failed(String),
}

impl ScanPhase {
    /// 次の正常系フェーズ。終端なら None
    pub fn next(&self) -> Option<ScanPhase> {
        match self {
            ScanPhase::Idle => Some(ScanPhase::Preparing),
            ScanPhase::Preparing => Some(ScanPhase::Identifying),
            ScanPhase::Identifying => Some(ScanPhase::Cropping),
            ScanPhase::Cropping => Some(ScanPhase::Done),
            ScanPhase::Done | ScanPhase::Failed(_) => None,
        }
    }

    /// `self` から `to` への遷移が許されるか
    pub fn can_transition_to(&self, to: &ScanPhase) -> bool {
        match to {
            ScanPhase::Failed(_) => !self.is_terminal() && *self != ScanPhase::Idle,
            _ => self.next().as_ref() == Some(to),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanPhase::Done | ScanPhase::Failed(_))
    }

    /// 進捗表示用 (現在ステップ, 全ステップ数)
    pub fn step(&self) -> Option<(usize, usize)> {
        match self {
            ScanPhase::Preparing => Some((1, 3)),
            ScanPhase::Identifying => Some((2, 3)),
            ScanPhase::Cropping => Some((3, 3)),
            _ => None,
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanPhase::Idle => write!(f, "待機中"),
            ScanPhase::Preparing => write!(f, "画像を準備中..."),
            ScanPhase::Identifying => write!(f, "カードを識別中..."),
            ScanPhase::Cropping => write!(f, "カードを切り出し中..."),
            ScanPhase::Done => write!(f, "完了"),
            ScanPhase::Failed(message) => write!(f, "失敗: {}", message),
        }
    }
}
