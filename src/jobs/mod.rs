use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::CrmError;
use crate::shared::models::schema::{jobs, profiles, projects};
use crate::shared::models::{Job, JobStatus, NewJob};
use crate::shared::state::AppState;

/// Newest `in_progress` job for a staff member. The webhook's auto-attach
/// assumes at most one active job per assignee; when that assumption breaks,
/// the most recently created one wins.
pub fn latest_in_progress_for(
    conn: &mut PgConnection,
    staff_id: Uuid,
) -> Result<Option<Job>, CrmError> {
    let result = jobs::table
        .filter(jobs::assigned_to.eq(staff_id))
        .filter(jobs::status.eq(JobStatus::InProgress.as_str()))
        .order(jobs::created_at.desc())
        .select(Job::as_select())
        .first::<Job>(conn)
        .optional()?;
    Ok(result)
}

/// Planned and in-progress jobs for a staff member, for status replies and
/// the daily notifier.
pub fn open_jobs_for(conn: &mut PgConnection, staff_id: Uuid) -> Result<Vec<Job>, CrmError> {
    let result = jobs::table
        .filter(jobs::assigned_to.eq(staff_id))
        .filter(jobs::status.eq_any([
            JobStatus::Planned.as_str(),
            JobStatus::InProgress.as_str(),
        ]))
        .select(Job::as_select())
        .load::<Job>(conn)?;
    Ok(result)
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub planned_start_date: Option<DateTime<Utc>>,
    pub planned_end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, AsChangeset)]
#[diesel(table_name = jobs)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub planned_start_date: Option<DateTime<Utc>>,
    pub planned_end_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobListEntry {
    #[serde(flatten)]
    pub job: Job,
    pub project_name: String,
    pub assignee_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub id: Option<Uuid>,
}

pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateJobRequest>,
) -> Result<Json<SuccessResponse>, CrmError> {
    if req.title.trim().is_empty() {
        return Err(CrmError::Validation("İş başlığı gereklidir.".to_string()));
    }
    let row = NewJob {
        id: Uuid::new_v4(),
        project_id: req.project_id,
        title: req.title,
        description: req.description,
        assigned_to: req.assigned_to,
        planned_start_date: req.planned_start_date,
        planned_end_date: req.planned_end_date,
        status: JobStatus::Planned.as_str().to_string(),
        created_at: Utc::now(),
    };
    let mut conn = state.conn.get()?;
    diesel::insert_into(jobs::table)
        .values(&row)
        .execute(&mut conn)?;
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(row.id),
    }))
}

pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<JobListEntry>>, CrmError> {
    let mut conn = state.conn.get()?;
    let rows = jobs::table
        .inner_join(projects::table)
        .left_join(profiles::table)
        .order(jobs::created_at.desc())
        .select((
            Job::as_select(),
            projects::name,
            (profiles::first_name, profiles::last_name).nullable(),
        ))
        .load::<(Job, String, Option<(Option<String>, Option<String>)>)>(&mut conn)?;

    Ok(Json(
        rows.into_iter()
            .map(|(job, project_name, assignee)| JobListEntry {
                job,
                project_name,
                assignee_name: assignee.map(|(first, last)| {
                    format!(
                        "{} {}",
                        first.unwrap_or_default(),
                        last.unwrap_or_default()
                    )
                    .trim()
                    .to_string()
                }),
            })
            .collect(),
    ))
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Job>, CrmError> {
    let mut conn = state.conn.get()?;
    let job = jobs::table
        .find(job_id)
        .select(Job::as_select())
        .first::<Job>(&mut conn)
        .optional()?
        .ok_or_else(|| CrmError::NotFound("İş".to_string()))?;
    Ok(Json(job))
}

pub async fn update_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<UpdateJobRequest>,
) -> Result<Json<SuccessResponse>, CrmError> {
    if let Some(status) = req.status.as_deref() {
        if JobStatus::parse(status).is_none() {
            return Err(CrmError::Validation("Geçersiz iş durumu.".to_string()));
        }
    }
    let mut conn = state.conn.get()?;
    let updated = diesel::update(jobs::table.find(job_id))
        .set(&req)
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(CrmError::NotFound("İş".to_string()));
    }
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(job_id),
    }))
}

pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, CrmError> {
    let mut conn = state.conn.get()?;
    let deleted = diesel::delete(jobs::table.find(job_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(CrmError::NotFound("İş".to_string()));
    }
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(job_id),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route(
            "/jobs/:id",
            get(get_job).put(update_job).delete(delete_job),
        )
}
