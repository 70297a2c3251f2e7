//! Staff directory. Profiles pair with hosted-auth credentials managed
//! outside this service; only the profile rows live here.

use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::{get, put};
use axum::Router;
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::CrmError;
use crate::shared::models::schema::profiles;
use crate::shared::models::{NewProfile, Profile};
use crate::shared::state::AppState;
use crate::shared::utils::phone_suffix;

/// Finds the profile whose stored phone ends in the given digit suffix.
///
/// Stored numbers carry formatting (`+90 555 123 45 67`) while inbound ones
/// arrive bare (`905551234567`), so both sides are normalized through
/// `phone_suffix` before comparing. Multiple matches are assumed unique in
/// practice; the first row wins.
pub fn find_by_phone_suffix(
    conn: &mut PgConnection,
    suffix: &str,
) -> Result<Option<Profile>, CrmError> {
    if suffix.is_empty() {
        return Ok(None);
    }
    let candidates = profiles::table
        .filter(profiles::phone.is_not_null())
        .order(profiles::created_at.asc())
        .select(Profile::as_select())
        .load::<Profile>(conn)?;
    Ok(candidates
        .into_iter()
        .find(|p| p.phone.as_deref().is_some_and(|stored| matches_suffix(stored, suffix))))
}

fn matches_suffix(stored: &str, suffix: &str) -> bool {
    phone_suffix(stored) == suffix
}

/// Active staff members with a phone number, for the daily notifier.
pub fn notifiable_staff(conn: &mut PgConnection) -> Result<Vec<Profile>, CrmError> {
    let result = profiles::table
        .filter(profiles::role.eq("staff"))
        .filter(profiles::is_active.eq(true))
        .filter(profiles::phone.is_not_null())
        .select(Profile::as_select())
        .load::<Profile>(conn)?;
    Ok(result)
}

#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: String,
}

#[derive(Debug, Deserialize, AsChangeset)]
#[diesel(table_name = profiles)]
pub struct UpdateStaffRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub id: Option<Uuid>,
}

fn require_service_key(state: &AppState) -> Result<(), CrmError> {
    if state.config.storage.service_key.is_none() {
        return Err(CrmError::Configuration("SUPABASE_SERVICE_ROLE_KEY"));
    }
    Ok(())
}

pub async fn create_staff(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStaffRequest>,
) -> Result<Json<SuccessResponse>, CrmError> {
    require_service_key(&state)?;
    if req.role != "admin" && req.role != "staff" {
        return Err(CrmError::Validation("Geçersiz rol.".to_string()));
    }

    let row = NewProfile {
        id: Uuid::new_v4(),
        first_name: Some(req.first_name.clone()),
        last_name: Some(req.last_name),
        phone: req.phone,
        role: req.role,
        is_active: true,
        created_at: Utc::now(),
    };

    let mut conn = state.conn.get()?;
    diesel::insert_into(profiles::table)
        .values(&row)
        .execute(&mut conn)?;

    info!("created staff profile {} ({})", req.first_name, row.id);
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(row.id),
    }))
}

pub async fn list_staff(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Profile>>, CrmError> {
    let mut conn = state.conn.get()?;
    let rows = profiles::table
        .order(profiles::created_at.desc())
        .select(Profile::as_select())
        .load::<Profile>(&mut conn)?;
    Ok(Json(rows))
}

pub async fn update_staff(
    State(state): State<Arc<AppState>>,
    Path(staff_id): Path<Uuid>,
    Json(req): Json<UpdateStaffRequest>,
) -> Result<Json<SuccessResponse>, CrmError> {
    require_service_key(&state)?;
    let mut conn = state.conn.get()?;
    let updated = diesel::update(profiles::table.find(staff_id))
        .set(&req)
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(CrmError::NotFound("Personel".to_string()));
    }
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(staff_id),
    }))
}

/// Soft-disable. Profiles are never hard-deleted here because jobs and
/// reports reference them.
pub async fn deactivate_staff(
    State(state): State<Arc<AppState>>,
    Path(staff_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, CrmError> {
    require_service_key(&state)?;
    let mut conn = state.conn.get()?;
    let updated = diesel::update(profiles::table.find(staff_id))
        .set(profiles::is_active.eq(false))
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(CrmError::NotFound("Personel".to_string()));
    }
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(staff_id),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/staff", get(list_staff).post(create_staff))
        .route("/staff/:id", put(update_staff))
        .route("/staff/:id/deactivate", put(deactivate_staff))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_stored_phone_matches_bare_inbound_number() {
        let inbound = phone_suffix("905551234567");
        assert!(matches_suffix("+90 555 123 45 67", &inbound));
        assert!(matches_suffix("905551234567", &inbound));
        assert!(matches_suffix("0555 123 45 67", &inbound));
    }

    #[test]
    fn different_numbers_do_not_match() {
        let inbound = phone_suffix("905551234567");
        assert!(!matches_suffix("+90 555 999 88 77", &inbound));
        assert!(!matches_suffix("", &inbound));
    }
}
