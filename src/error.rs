use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardScanError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`card-scan config --set-api-key YOUR_KEY` で設定するか GEMINI_API_KEY を指定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    /// 形式変換ツールがない（HEIC/HEIFの変換不可）
    #[error("形式変換ができません ({file}): {reason}")]
    MissingCapability { file: String, reason: String },

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("入力エラー: {0}")]
    Prompt(String),

    #[error(transparent)]
    Common(#[from] card_scan_common::Error),

    #[error("内部エラー: {0}")]
    Internal(String),
}

impl CardScanError {
    /// 画面に表示する1行のエラーメッセージ
    ///
    /// 識別APIの通信・スキーマ失敗は「カードの識別に失敗しました」に統一する
    pub fn user_message(&self) -> String {
        match self {
            CardScanError::ApiCall(_) | CardScanError::ApiParse(_) => {
                "カードの識別に失敗しました。もう一度お試しください".to_string()
            }
            CardScanError::MissingCapability { file, .. } => {
                format!("{} を変換できません。HEIC/HEIF変換ツール（heif-convert または magick）をインストールしてください", file)
            }
            CardScanError::MissingApiKey
            | CardScanError::FileNotFound(_)
            | CardScanError::NoImagesFound(_)
            | CardScanError::ImageLoad(_)
            | CardScanError::Config(_)
            | CardScanError::JsonParse(_)
            | CardScanError::Io(_) => self.to_string(),
            _ => "予期しないエラーが発生しました".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CardScanError>;
