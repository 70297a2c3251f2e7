use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::CrmError;
use crate::shared::models::schema::{customers, projects};
use crate::shared::models::{NewProject, Project};
use crate::shared::state::AppState;

const PROJECT_STATUSES: [&str; 3] = ["active", "passive", "completed"];

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub customer_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, AsChangeset)]
#[diesel(table_name = projects)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectWithCustomer {
    #[serde(flatten)]
    pub project: Project,
    pub customer_name: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub id: Option<Uuid>,
}

pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Json<SuccessResponse>, CrmError> {
    let status = req.status.unwrap_or_else(|| "active".to_string());
    if !PROJECT_STATUSES.contains(&status.as_str()) {
        return Err(CrmError::Validation("Geçersiz proje durumu.".to_string()));
    }
    let row = NewProject {
        id: Uuid::new_v4(),
        customer_id: req.customer_id,
        name: req.name,
        address: req.address,
        description: req.description,
        status,
        created_at: Utc::now(),
    };
    let mut conn = state.conn.get()?;
    diesel::insert_into(projects::table)
        .values(&row)
        .execute(&mut conn)?;
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(row.id),
    }))
}

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProjectWithCustomer>>, CrmError> {
    let mut conn = state.conn.get()?;
    let rows = projects::table
        .inner_join(customers::table)
        .order(projects::created_at.desc())
        .select((Project::as_select(), customers::company_name))
        .load::<(Project, String)>(&mut conn)?;
    Ok(Json(
        rows.into_iter()
            .map(|(project, customer_name)| ProjectWithCustomer {
                project,
                customer_name,
            })
            .collect(),
    ))
}

pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<SuccessResponse>, CrmError> {
    if let Some(status) = req.status.as_deref() {
        if !PROJECT_STATUSES.contains(&status) {
            return Err(CrmError::Validation("Geçersiz proje durumu.".to_string()));
        }
    }
    let mut conn = state.conn.get()?;
    let updated = diesel::update(projects::table.find(project_id))
        .set(&req)
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(CrmError::NotFound("Proje".to_string()));
    }
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(project_id),
    }))
}

pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, CrmError> {
    let mut conn = state.conn.get()?;
    let deleted = diesel::delete(projects::table.find(project_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(CrmError::NotFound("Proje".to_string()));
    }
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(project_id),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/:id",
            axum::routing::put(update_project).delete(delete_project),
        )
}
