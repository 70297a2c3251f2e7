use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::{error, warn};
use reqwest::Client;
use serde_json::{json, Value};

use super::{is_safe_url, ImageAnalyzer, ImageSource};
use crate::shared::error::CrmError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const MODEL: &str = "gemini-1.5-flash";

pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Turns an image source into an inline-data part, fetching remote URLs
    /// after the SSRF check and re-encoding them to base64.
    async fn image_part(&self, image: &ImageSource) -> Result<Value, CrmError> {
        match image {
            ImageSource::Inline { data, mime_type } => Ok(json!({
                "inline_data": { "mime_type": mime_type, "data": data }
            })),
            ImageSource::Url(url) => {
                if !is_safe_url(url) {
                    warn!("skipping unsafe image url: {}", url);
                    return Err(CrmError::Validation(format!(
                        "Güvenlik nedeniyle bu URL işlenemedi: {}",
                        url
                    )));
                }
                let response = self.client.get(url).send().await?;
                let mime_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("image/jpeg")
                    .to_string();
                let bytes = response.bytes().await?;
                Ok(json!({
                    "inline_data": { "mime_type": mime_type, "data": BASE64.encode(&bytes) }
                }))
            }
        }
    }
}

#[async_trait]
impl ImageAnalyzer for GeminiClient {
    async fn analyze(&self, images: &[ImageSource], prompt: &str) -> Result<String, CrmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CrmError::Configuration("GEMINI_API_KEY"))?;

        let mut parts = vec![json!({ "text": prompt })];
        for image in images {
            parts.push(self.image_part(image).await?);
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, MODEL, api_key
        );
        let response = self
            .client
            .post(&url)
            .json(&json!({ "contents": [{ "parts": parts }] }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("gemini call failed ({}): {}", status, body);
            return Err(CrmError::Remote(format!("model call failed ({})", status)));
        }

        let result: Value = response.json().await?;
        let text = result["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .to_string();
        Ok(text)
    }
}
