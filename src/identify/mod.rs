mod gemini;

pub use gemini::GeminiClient;

use crate::convert::PreparedImage;
use crate::error::Result;
use card_scan_common::IdentifyResponse;

/// カード識別（外部ビジョンモデル）
///
/// 1画像につき1回の呼び出し。リトライはしない。
/// 通信失敗・スキーマ不一致はどちらもエラーとして返す。
#[allow(async_fn_in_trait)]
pub trait CardIdentifier {
    async fn identify(&self, image: &PreparedImage) -> Result<IdentifyResponse>;
}

impl<T: CardIdentifier> CardIdentifier for &T {
    async fn identify(&self, image: &PreparedImage) -> Result<IdentifyResponse> {
        (**self).identify(image).await
    }
}
