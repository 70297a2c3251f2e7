//! Read-only dashboard aggregation: independent count/select queries issued
//! concurrently, with the two summaries derived in-process.

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::CrmError;
use crate::shared::models::schema::{inventory_items, jobs, profiles};
use crate::shared::state::AppState;
use crate::shared::utils::DbPool;

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_jobs: i64,
    pub completed_jobs: i64,
    pub pending_jobs: i64,
    pub critical_stock_count: usize,
}

#[derive(Debug, Serialize)]
pub struct RecentJob {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub assignee_name: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PieSlice {
    pub name: &'static str,
    pub value: i64,
    pub color: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub stats: DashboardStats,
    pub recent_jobs: Vec<RecentJob>,
    pub pie_chart_data: Vec<PieSlice>,
}

/// Maps raw job statuses onto the five fixed chart buckets, dropping any
/// bucket with a zero count.
pub fn status_distribution(statuses: &[String]) -> Vec<PieSlice> {
    const BUCKETS: [(&str, &str, &str); 5] = [
        ("pending", "Bekleyen", "#F59E0B"),
        ("planned", "Planlandı", "#3B82F6"),
        ("in_progress", "Devam Ediyor", "#8B5CF6"),
        ("completed", "Tamamlandı", "#10B981"),
        ("cancelled", "İptal", "#EF4444"),
    ];
    BUCKETS
        .iter()
        .map(|(status, name, color)| PieSlice {
            name,
            value: statuses.iter().filter(|s| s == status).count() as i64,
            color,
        })
        .filter(|slice| slice.value > 0)
        .collect()
}

/// Critical-stock derivation over (current, critical) pairs.
pub fn critical_count(levels: &[(BigDecimal, BigDecimal)]) -> usize {
    levels
        .iter()
        .filter(|(current, critical)| current <= critical)
        .count()
}

pub async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardResponse>, CrmError> {
    if state.config.storage.service_key.is_none() {
        return Err(CrmError::Configuration("SUPABASE_SERVICE_ROLE_KEY"));
    }

    fn query<T, F>(pool: &DbPool, f: F) -> tokio::task::JoinHandle<Result<T, CrmError>>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, CrmError> + Send + 'static,
    {
        let pool = pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
    }

    let total = query(&state.conn, |conn| {
        Ok(jobs::table.count().get_result::<i64>(conn)?)
    });
    let completed = query(&state.conn, |conn| {
        Ok(jobs::table
            .filter(jobs::status.eq("completed"))
            .count()
            .get_result::<i64>(conn)?)
    });
    let pending = query(&state.conn, |conn| {
        Ok(jobs::table
            .filter(jobs::status.eq_any(["pending", "planned", "in_progress"]))
            .count()
            .get_result::<i64>(conn)?)
    });
    let stock_levels = query(&state.conn, |conn| {
        Ok(inventory_items::table
            .select((
                inventory_items::current_stock,
                inventory_items::critical_stock_level,
            ))
            .load::<(BigDecimal, BigDecimal)>(conn)?)
    });
    let recent = query(&state.conn, |conn| {
        Ok(jobs::table
            .left_join(profiles::table)
            .order(jobs::created_at.desc())
            .limit(5)
            .select((
                jobs::id,
                jobs::title,
                jobs::status,
                jobs::created_at,
                (profiles::first_name, profiles::last_name).nullable(),
            ))
            .load::<(
                Uuid,
                String,
                String,
                DateTime<Utc>,
                Option<(Option<String>, Option<String>)>,
            )>(conn)?)
    });
    let statuses = query(&state.conn, |conn| {
        Ok(jobs::table.select(jobs::status).load::<String>(conn)?)
    });

    let (total, completed, pending, stock_levels, recent, statuses) =
        tokio::try_join!(total, completed, pending, stock_levels, recent, statuses)
            .map_err(|e| CrmError::Remote(format!("dashboard query task failed: {}", e)))?;
    let (total, completed, pending, stock_levels, recent, statuses) = (
        total?, completed?, pending?, stock_levels?, recent?, statuses?,
    );

    let recent_jobs = recent
        .into_iter()
        .map(|(id, title, status, created_at, assignee)| RecentJob {
            id,
            title,
            status,
            created_at,
            assignee_name: assignee.map(|(first, last)| {
                format!("{} {}", first.unwrap_or_default(), last.unwrap_or_default())
                    .trim()
                    .to_string()
            }),
        })
        .collect();

    Ok(Json(DashboardResponse {
        success: true,
        stats: DashboardStats {
            total_jobs: total,
            completed_jobs: completed,
            pending_jobs: pending,
            critical_stock_count: critical_count(&stock_levels),
        },
        recent_jobs,
        pie_chart_data: status_distribution(&statuses),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/dashboard/stats", get(dashboard_stats))
}
