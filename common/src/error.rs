//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    /// レスポンスが期待するスキーマを満たさない
    #[error("Schema error: {0}")]
    Schema(String),

    /// 切り出し範囲が画像内に存在しない
    #[error("Empty crop region: {width}x{height}")]
    EmptyCrop { width: u32, height: u32 },

    #[error("Invalid command: {0}")]
    Command(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
