//! Gemini API連携
//!
//! 画像1枚 + 指示文 + レスポンススキーマを `generateContent` に送り、
//! `cards_detected` 形式のJSONを受け取る

use super::CardIdentifier;
use crate::config::Config;
use crate::convert::PreparedImage;
use crate::error::{CardScanError, Result};
use base64::Engine;
use card_scan_common::{
    build_identify_prompt, identify_response_schema, parse_identify_response, IdentifyResponse,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Gemini APIリクエスト
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
}

/// Gemini APIレスポンス
#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiResponse {
    /// 最初の候補のテキスト部分を連結して返す
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.get_api_key()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| CardScanError::Config(format!("HTTPクライアント初期化エラー: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            endpoint: endpoint_url(&config.api_base, &config.model),
        })
    }

    /// Gemini API呼び出し
    async fn call_gemini_api(&self, request: &GeminiRequest) -> Result<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| CardScanError::ApiCall(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CardScanError::ApiCall(format!("API error: {} {}", status, body)));
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| CardScanError::ApiParse(e.to_string()))?;

        payload
            .text()
            .ok_or_else(|| CardScanError::ApiParse("Empty response".into()))
    }
}

impl CardIdentifier for GeminiClient {
    async fn identify(&self, image: &PreparedImage) -> Result<IdentifyResponse> {
        let request = build_request(image);

        debug!(
            file = %image.info.file_name,
            bytes = image.bytes.len(),
            mime = image.mime_type,
            "識別リクエスト送信"
        );

        let text = self.call_gemini_api(&request).await?;

        debug!(file = %image.info.file_name, chars = text.len(), "識別レスポンス受信");

        parse_identify_response(&text).map_err(|e| CardScanError::ApiParse(e.to_string()))
    }
}

fn endpoint_url(api_base: &str, model: &str) -> String {
    format!(
        "{}/models/{}:generateContent",
        api_base.trim_end_matches('/'),
        model
    )
}

fn build_request(image: &PreparedImage) -> GeminiRequest {
    let data = base64::engine::general_purpose::STANDARD.encode(&image.bytes);

    GeminiRequest {
        contents: vec![Content {
            parts: vec![
                Part::Text {
                    text: build_identify_prompt(&image.info.file_name),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: image.mime_type.to_string(),
                        data,
                    },
                },
            ],
        }],
        generation_config: GenerationConfig {
            temperature: 0.1,
            response_mime_type: "application/json".to_string(),
            response_schema: identify_response_schema(),
        },
    }
}
