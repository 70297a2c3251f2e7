//! Job report lifecycle: start/daily reports, the transactional end-of-job
//! submission, and the on-demand photo analysis action.

use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::llm::{ImageAnalyzer, ImageSource, JOB_END_PROMPT, JOB_START_PROMPT};
use crate::shared::error::CrmError;
use crate::shared::models::schema::{inventory_items, inventory_movements, job_reports, jobs, profiles};
use crate::shared::models::{
    JobReport, JobStatus, MaterialLine, NewInventoryMovement, NewJobReport, ReportType,
};
use crate::shared::state::AppState;

/// Inserts the daily report created from an inbound WhatsApp photo, with the
/// AI analysis folded into the description.
pub fn insert_whatsapp_report(
    conn: &mut PgConnection,
    job_id: Uuid,
    staff_id: Uuid,
    analysis: &str,
    media_url: String,
) -> Result<Uuid, CrmError> {
    let row = NewJobReport {
        id: Uuid::new_v4(),
        job_id,
        staff_id,
        report_type: ReportType::Daily.as_str().to_string(),
        description: Some(format!("[WhatsApp Otomatik Rapor]\nAI Analizi: {}", analysis)),
        media_urls: vec![media_url],
        materials_returned: serde_json::Value::Array(vec![]),
        created_at: Utc::now(),
    };
    diesel::insert_into(job_reports::table)
        .values(&row)
        .execute(conn)?;
    Ok(row.id)
}

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub staff_id: Uuid,
    pub report_type: String,
    pub description: Option<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EndReportRequest {
    pub staff_id: Uuid,
    pub description: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub materials_returned: Vec<MaterialLine>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ReportListEntry {
    #[serde(flatten)]
    pub report: JobReport,
    pub job_title: String,
    pub staff_name: Option<String>,
}

/// Start and daily reports. End reports go through `submit_end_report`
/// because they also move stock and close the job.
pub async fn create_report(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<CreateReportRequest>,
) -> Result<Json<SuccessResponse>, CrmError> {
    let report_type = ReportType::parse(&req.report_type)
        .filter(|t| *t != ReportType::End)
        .ok_or_else(|| CrmError::Validation("Geçersiz rapor türü.".to_string()))?;

    let row = NewJobReport {
        id: Uuid::new_v4(),
        job_id,
        staff_id: req.staff_id,
        report_type: report_type.as_str().to_string(),
        description: req.description,
        media_urls: req.media_urls,
        materials_returned: serde_json::Value::Array(vec![]),
        created_at: Utc::now(),
    };
    let mut conn = state.conn.get()?;
    diesel::insert_into(job_reports::table)
        .values(&row)
        .execute(&mut conn)?;
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(row.id),
    }))
}

/// End-of-job submission as one transaction: the report row, one "in"
/// movement per returned-material line (each also restocking the item), and
/// the job's transition to completed. A failure anywhere rolls back all of
/// it, so the partial-application gap of sequential writes cannot occur.
pub fn apply_end_report(
    conn: &mut PgConnection,
    job_id: Uuid,
    req: &EndReportRequest,
) -> Result<Uuid, CrmError> {
    conn.transaction::<Uuid, CrmError, _>(|conn| {
        let materials = serde_json::to_value(&req.materials_returned)
            .map_err(|e| CrmError::Validation(e.to_string()))?;
        let row = NewJobReport {
            id: Uuid::new_v4(),
            job_id,
            staff_id: req.staff_id,
            report_type: ReportType::End.as_str().to_string(),
            description: Some(req.description.clone()),
            media_urls: req.media_urls.clone(),
            materials_returned: materials,
            created_at: Utc::now(),
        };
        diesel::insert_into(job_reports::table)
            .values(&row)
            .execute(conn)?;

        for line in &req.materials_returned {
            let movement = NewInventoryMovement {
                id: Uuid::new_v4(),
                item_id: line.item_id,
                job_id: Some(job_id),
                movement_type: "in".to_string(),
                quantity: line.quantity.clone(),
                description: Some("İş bitiş - İade edilen malzeme".to_string()),
                created_at: Utc::now(),
            };
            diesel::insert_into(inventory_movements::table)
                .values(&movement)
                .execute(conn)?;
            diesel::update(inventory_items::table.find(line.item_id))
                .set(
                    inventory_items::current_stock
                        .eq(inventory_items::current_stock + line.quantity.clone()),
                )
                .execute(conn)?;
        }

        let updated = diesel::update(jobs::table.find(job_id))
            .set(jobs::status.eq(JobStatus::Completed.as_str()))
            .execute(conn)?;
        if updated == 0 {
            return Err(CrmError::NotFound("İş".to_string()));
        }

        Ok(row.id)
    })
}

pub async fn submit_end_report(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<EndReportRequest>,
) -> Result<Json<SuccessResponse>, CrmError> {
    let mut conn = state.conn.get()?;
    let report_id = apply_end_report(&mut conn, job_id, &req)?;

    info!(
        "end report {} for job {} ({} returned lines)",
        report_id,
        job_id,
        req.materials_returned.len()
    );
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(report_id),
    }))
}

pub async fn list_reports(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ReportListEntry>>, CrmError> {
    let mut conn = state.conn.get()?;
    let rows = job_reports::table
        .inner_join(jobs::table)
        .inner_join(profiles::table)
        .order(job_reports::created_at.desc())
        .limit(50)
        .select((
            JobReport::as_select(),
            jobs::title,
            (profiles::first_name, profiles::last_name).nullable(),
        ))
        .load::<(JobReport, String, Option<(Option<String>, Option<String>)>)>(&mut conn)?;

    Ok(Json(
        rows.into_iter()
            .map(|(report, job_title, staff)| ReportListEntry {
                report,
                job_title,
                staff_name: staff.map(|(first, last)| {
                    format!("{} {}", first.unwrap_or_default(), last.unwrap_or_default())
                        .trim()
                        .to_string()
                }),
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub image_urls: Vec<String>,
    /// Which end of the job the photos document: "start" or "end".
    pub report_type: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub analysis: String,
}

/// On-demand photo analysis used when composing a report by hand.
pub async fn analyze_job_images(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, CrmError> {
    if req.image_urls.is_empty() {
        return Err(CrmError::Validation(
            "Analiz için en az bir görsel gereklidir.".to_string(),
        ));
    }
    let prompt = match req.report_type.as_str() {
        "start" => JOB_START_PROMPT,
        "end" => JOB_END_PROMPT,
        _ => return Err(CrmError::Validation("Geçersiz rapor türü.".to_string())),
    };

    let images: Vec<ImageSource> = req
        .image_urls
        .iter()
        .map(|raw| ImageSource::from_raw(raw))
        .collect();
    let analysis = state.analyzer.analyze(&images, prompt).await?;

    Ok(Json(AnalyzeResponse {
        success: true,
        analysis,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reports", get(list_reports))
        .route("/reports/analyze", post(analyze_job_images))
        .route("/jobs/:id/reports", post(create_report))
        .route("/jobs/:id/reports/end", post(submit_end_report))
}
