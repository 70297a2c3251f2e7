//! WhatsApp Business channel integration.
//!
//! Outbound client for the Graph API plus the inbound webhook that lets
//! field staff submit photo reports and status queries over chat.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use log::{error, info, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::WhatsAppConfig;
use crate::llm::{ImageAnalyzer, ImageSource, WHATSAPP_PHOTO_PROMPT};
use crate::shared::error::CrmError;
use crate::shared::models::{JobStatus, Profile};
use crate::shared::state::AppState;
use crate::shared::utils::phone_suffix;
use crate::{jobs, reports, staff};

const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com/v17.0";

/// Outbound messaging client. Credential absence degrades sends to logged
/// no-ops so environments without messaging configured keep working.
#[derive(Clone)]
pub struct WhatsAppClient {
    client: Client,
    api_token: Option<String>,
    phone_id: Option<String>,
    base_url: String,
}

impl WhatsAppClient {
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self {
            client: Client::new(),
            api_token: config.api_token.clone(),
            phone_id: config.phone_id.clone(),
            base_url: DEFAULT_GRAPH_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn send_text(&self, to: &str, body: &str) -> Result<(), CrmError> {
        let (token, phone_id) = match (&self.api_token, &self.phone_id) {
            (Some(t), Some(p)) => (t, p),
            _ => {
                warn!("WhatsApp credentials missing, message not sent: {}", body);
                return Ok(());
            }
        };

        let url = format!("{}/{}/messages", self.base_url, phone_id);
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": body }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("WhatsApp API error: {}", error_text);
            return Err(CrmError::Remote(format!(
                "WhatsApp API error: {}",
                error_text
            )));
        }

        Ok(())
    }

    /// Resolves an inbound media id to its download URL. Failures are logged
    /// and collapse to `None`; the webhook treats that as "nothing to do".
    pub async fn media_url(&self, media_id: &str) -> Option<String> {
        let token = match &self.api_token {
            Some(t) => t,
            None => {
                error!("WhatsApp token missing, cannot resolve media {}", media_id);
                return None;
            }
        };

        let url = format!("{}/{}", self.base_url, media_id);
        let response = match self.client.get(&url).bearer_auth(token).send().await {
            Ok(r) => r,
            Err(e) => {
                error!("error getting media url: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            error!("media url lookup failed: {}", response.status());
            return None;
        }
        let data: Value = response.json().await.ok()?;
        data["url"].as_str().map(str::to_string)
    }

    pub async fn download_media(&self, url: &str) -> Option<Vec<u8>> {
        let token = self.api_token.as_deref()?;
        let response = match self.client.get(url).bearer_auth(token).send().await {
            Ok(r) => r,
            Err(e) => {
                error!("error downloading media: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            error!("media download failed: {}", response.status());
            return None;
        }
        response.bytes().await.ok().map(|b| b.to_vec())
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub hub_mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub hub_verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub hub_challenge: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub text: Option<TextBody>,
    pub image: Option<MediaRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct MediaRef {
    pub id: String,
}

/// The declared type and the carried payload must agree; anything else is
/// routed as unsupported instead of being accessed blindly.
pub enum InboundContent<'a> {
    Image(&'a MediaRef),
    Text(&'a str),
    Unsupported,
}

impl InboundMessage {
    pub fn content(&self) -> InboundContent<'_> {
        match self.kind {
            MessageKind::Image => self
                .image
                .as_ref()
                .map(InboundContent::Image)
                .unwrap_or(InboundContent::Unsupported),
            MessageKind::Text => self
                .text
                .as_ref()
                .map(|t| InboundContent::Text(t.body.as_str()))
                .unwrap_or(InboundContent::Unsupported),
            MessageKind::Unsupported => InboundContent::Unsupported,
        }
    }
}

impl WebhookPayload {
    /// The platform delivers one message per event in practice; only the
    /// first message of the first change of the first entry is processed.
    fn into_first_message(self) -> Option<InboundMessage> {
        self.entry
            .into_iter()
            .next()?
            .changes
            .into_iter()
            .next()?
            .value
            .messages
            .into_iter()
            .next()
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/webhooks/whatsapp",
        get(verify_webhook).post(receive_webhook),
    )
}

/// Onboarding handshake: the platform will not deliver events until the
/// configured verify token is echoed back with the challenge.
pub async fn verify_webhook(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Result<String, StatusCode> {
    let expected = state.config.whatsapp.verify_token.as_deref();

    if let (Some(mode), Some(token), Some(challenge), Some(expected)) = (
        params.hub_mode.as_deref(),
        params.hub_verify_token.as_deref(),
        params.hub_challenge.as_deref(),
        expected,
    ) {
        if mode == "subscribe" && token == expected {
            info!("WhatsApp webhook verified successfully");
            return Ok(challenge.to_string());
        }
    }

    error!("WhatsApp webhook verification failed");
    Err(StatusCode::FORBIDDEN)
}

/// Inbound event entry point. Short-circuits (no message, unknown sender,
/// unsupported type) acknowledge with 200 so the platform does not retry and
/// duplicate side effects; only unhandled errors surface as 500.
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WebhookPayload>,
) -> Result<&'static str, StatusCode> {
    match process_inbound(&state, payload).await {
        Ok(()) => Ok("OK"),
        Err(e) => {
            error!("webhook error: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn process_inbound(state: &Arc<AppState>, payload: WebhookPayload) -> Result<(), CrmError> {
    let message = match payload.into_first_message() {
        Some(m) => m,
        None => {
            info!("no message found in payload");
            return Ok(());
        }
    };

    let suffix = phone_suffix(&message.from);
    let profile = {
        let mut conn = state.conn.get()?;
        staff::find_by_phone_suffix(&mut conn, &suffix)?
    };
    let profile = match profile {
        Some(p) => p,
        None => {
            // Policy: do not engage unregistered numbers.
            info!("unknown sender: {}", message.from);
            return Ok(());
        }
    };

    info!("sender identified: {}", profile.display_name());

    match message.content() {
        InboundContent::Image(media) => {
            handle_image_message(state, &profile, &message.from, &media.id).await
        }
        InboundContent::Text(body) => {
            handle_text_message(state, &profile, &message.from, body).await
        }
        InboundContent::Unsupported => {
            info!("unsupported message type from {}", message.from);
            Ok(())
        }
    }
}

async fn handle_image_message(
    state: &Arc<AppState>,
    profile: &Profile,
    from: &str,
    media_id: &str,
) -> Result<(), CrmError> {
    let media_url = match state.whatsapp.media_url(media_id).await {
        Some(u) => u,
        None => return Ok(()),
    };
    let bytes = match state.whatsapp.download_media(&media_url).await {
        Some(b) => b,
        None => return Ok(()),
    };

    let file_name = format!("whatsapp/{}/{}.jpg", profile.id, Utc::now().timestamp_millis());
    if let Err(e) = state
        .storage
        .upload(&file_name, bytes.clone(), "image/jpeg")
        .await
    {
        error!("upload error: {}", e);
        state
            .whatsapp
            .send_text(from, "Fotoğraf yüklenirken hata oluştu.")
            .await?;
        return Ok(());
    }
    let public_url = state.storage.public_url(&file_name);

    let inline = ImageSource::Inline {
        data: BASE64.encode(&bytes),
        mime_type: "image/jpeg".to_string(),
    };
    let analysis = state
        .analyzer
        .analyze(&[inline], WHATSAPP_PHOTO_PROMPT)
        .await?;

    let active_job = {
        let mut conn = state.conn.get()?;
        jobs::latest_in_progress_for(&mut conn, profile.id)?
    };

    match active_job {
        Some(job) => {
            {
                let mut conn = state.conn.get()?;
                reports::insert_whatsapp_report(
                    &mut conn,
                    job.id,
                    profile.id,
                    &analysis,
                    public_url,
                )?;
            }
            state
                .whatsapp
                .send_text(from, &attached_reply(&job.title, &analysis))
                .await?;
        }
        None => {
            // The photo stays in storage but nothing references it here.
            state
                .whatsapp
                .send_text(from, &unlinked_reply(&analysis))
                .await?;
        }
    }

    Ok(())
}

async fn handle_text_message(
    state: &Arc<AppState>,
    profile: &Profile,
    from: &str,
    body: &str,
) -> Result<(), CrmError> {
    let text = body.to_lowercase();

    if text.contains("durum") || text.contains("görev") {
        let open_jobs = {
            let mut conn = state.conn.get()?;
            jobs::open_jobs_for(&mut conn, profile.id)?
        };
        state
            .whatsapp
            .send_text(from, &task_list_reply(&open_jobs))
            .await?;
    } else {
        let first_name = profile.first_name.as_deref().unwrap_or("");
        state
            .whatsapp
            .send_text(
                from,
                &format!(
                    "Merhaba {}, fotoğraf göndererek rapor oluşturabilir veya \"durum\" yazarak görevlerinizi öğrenebilirsiniz.",
                    first_name
                ),
            )
            .await?;
    }

    Ok(())
}

fn attached_reply(job_title: &str, analysis: &str) -> String {
    format!(
        "✅ Fotoğraf alındı ve \"{}\" işine rapor olarak eklendi.\n\nAI Analizi: {}",
        job_title, analysis
    )
}

fn unlinked_reply(analysis: &str) -> String {
    format!(
        "⚠️ Aktif bir işiniz bulunamadı. Fotoğraf kaydedildi ancak bir işe bağlanamadı.\n\nAI Analizi: {}",
        analysis
    )
}

fn task_list_reply(open_jobs: &[crate::shared::models::Job]) -> String {
    if open_jobs.is_empty() {
        return "Şu an üzerinizde aktif bir görev görünmüyor.".to_string();
    }
    let list = open_jobs
        .iter()
        .map(|j| {
            let label = JobStatus::parse(&j.status)
                .map(|s| s.label_tr())
                .unwrap_or("Planlandı");
            format!("- {} ({})", j.title, label)
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("📋 Mevcut Görevleriniz:\n{}", list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::Job;
    use uuid::Uuid;

    fn job(title: &str, status: &str) -> Job {
        Job {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            assigned_to: Some(Uuid::new_v4()),
            planned_start_date: None,
            planned_end_date: None,
            status: status.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn payload_extracts_first_message_only() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "entry": [{ "changes": [{ "value": { "messages": [
                { "from": "905551234567", "type": "text", "text": { "body": "durum" } },
                { "from": "905559999999", "type": "text", "text": { "body": "ikinci" } }
            ] } }] }]
        }))
        .unwrap();
        let message = payload.into_first_message().unwrap();
        assert_eq!(message.from, "905551234567");
        assert!(matches!(message.content(), InboundContent::Text("durum")));
    }

    #[test]
    fn status_update_payload_has_no_message() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "entry": [{ "changes": [{ "value": { "statuses": [{ "id": "x" }] } }] }]
        }))
        .unwrap();
        assert!(payload.into_first_message().is_none());

        let empty: WebhookPayload = serde_json::from_value(json!({})).unwrap();
        assert!(empty.into_first_message().is_none());
    }

    #[test]
    fn unknown_message_types_route_as_unsupported() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "entry": [{ "changes": [{ "value": { "messages": [
                { "from": "905551234567", "type": "sticker", "sticker": { "id": "s1" } }
            ] } }] }]
        }))
        .unwrap();
        let message = payload.into_first_message().unwrap();
        assert!(matches!(message.content(), InboundContent::Unsupported));
    }

    #[test]
    fn image_message_missing_media_is_unsupported() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "entry": [{ "changes": [{ "value": { "messages": [
                { "from": "905551234567", "type": "image" }
            ] } }] }]
        }))
        .unwrap();
        let message = payload.into_first_message().unwrap();
        assert!(matches!(message.content(), InboundContent::Unsupported));
    }

    #[test]
    fn image_message_carries_media_id() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "entry": [{ "changes": [{ "value": { "messages": [
                { "from": "905551234567", "type": "image", "image": { "id": "media-1" } }
            ] } }] }]
        }))
        .unwrap();
        let message = payload.into_first_message().unwrap();
        match message.content() {
            InboundContent::Image(media) => assert_eq!(media.id, "media-1"),
            _ => panic!("expected image"),
        }
    }

    #[test]
    fn task_list_reply_formats_bullets() {
        let jobs = vec![job("Klima montajı", "in_progress"), job("Kablo çekimi", "planned")];
        let reply = task_list_reply(&jobs);
        assert!(reply.starts_with("📋 Mevcut Görevleriniz:"));
        assert!(reply.contains("- Klima montajı (Devam Ediyor)"));
        assert!(reply.contains("- Kablo çekimi (Planlandı)"));
    }

    #[test]
    fn empty_task_list_says_no_active_tasks() {
        assert_eq!(
            task_list_reply(&[]),
            "Şu an üzerinizde aktif bir görev görünmüyor."
        );
    }

    #[test]
    fn attached_reply_names_the_job() {
        let reply = attached_reply("Klima montajı", "analiz metni");
        assert!(reply.contains("\"Klima montajı\""));
        assert!(reply.contains("analiz metni"));
    }
}
