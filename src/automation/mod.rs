//! Scheduled daily-task notifier. Invoked by an external time-based trigger
//! (one HTTP call per run); there is no in-process scheduler.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::shared::models::{Job, JobStatus};
use crate::shared::state::AppState;
use crate::{jobs, staff};

#[derive(Debug, Deserialize)]
pub struct CronParams {
    pub secret: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendOutcome {
    pub staff: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CronResponse {
    pub success: bool,
    pub results: Vec<SendOutcome>,
}

/// Message body for one staff member's open tasks. Re-running the notifier
/// over unchanged data produces the same content; re-sends are expected.
pub fn daily_task_message(first_name: &str, open_jobs: &[Job]) -> String {
    let task_list = open_jobs
        .iter()
        .map(|job| {
            let status = JobStatus::parse(&job.status)
                .map(|s| s.label_tr())
                .unwrap_or("Planlandı");
            let date = job
                .planned_start_date
                .map(|d| d.format("%d.%m.%Y").to_string())
                .unwrap_or_else(|| "-".to_string());
            format!("🔹 *{}*\n   Durum: {}\n   Tarih: {}", job.title, status, date)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Merhaba {}, yarınki/mevcut görevleriniz:\n\n{}\n\nİyi çalışmalar! 👋",
        first_name, task_list
    )
}

/// Shared-secret check, then one WhatsApp summary per active staff member
/// with open tasks. A missing configured secret matches nothing, which
/// effectively disables the endpoint.
pub async fn daily_tasks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CronParams>,
) -> Result<Json<CronResponse>, StatusCode> {
    let authorized = matches!(
        (&state.config.cron_secret, &params.secret),
        (Some(expected), Some(given)) if expected == given
    );
    if !authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let staff_list = {
        let mut conn = state
            .conn
            .get()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        staff::notifiable_staff(&mut conn).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    };

    let mut results = Vec::new();
    for member in staff_list {
        let phone = match member.phone.as_deref() {
            Some(p) => p,
            None => continue,
        };
        let first_name = member.first_name.clone().unwrap_or_default();

        let open_jobs = {
            let mut conn = state
                .conn
                .get()
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            jobs::open_jobs_for(&mut conn, member.id)
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        };
        if open_jobs.is_empty() {
            continue;
        }

        let message = daily_task_message(&first_name, &open_jobs);
        match state.whatsapp.send_text(phone, &message).await {
            Ok(()) => results.push(SendOutcome {
                staff: first_name,
                status: "sent",
            }),
            Err(e) => {
                error!("failed to notify {}: {}", first_name, e);
                results.push(SendOutcome {
                    staff: first_name,
                    status: "failed",
                });
            }
        }
    }

    Ok(Json(CronResponse {
        success: true,
        results,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/cron/daily-tasks", get(daily_tasks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn job(title: &str, status: &str, start: Option<chrono::DateTime<Utc>>) -> Job {
        Job {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            assigned_to: Some(Uuid::new_v4()),
            planned_start_date: start,
            planned_end_date: None,
            status: status.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn message_lists_every_open_task() {
        let start = Utc.with_ymd_and_hms(2026, 8, 27, 9, 0, 0).unwrap();
        let open = vec![
            job("Klima montajı", "in_progress", Some(start)),
            job("Kablo çekimi", "planned", None),
        ];
        let message = daily_task_message("Mehmet", &open);
        assert!(message.starts_with("Merhaba Mehmet"));
        assert!(message.contains("🔹 *Klima montajı*"));
        assert!(message.contains("Durum: Devam Ediyor"));
        assert!(message.contains("Tarih: 27.08.2026"));
        assert!(message.contains("🔹 *Kablo çekimi*"));
        assert!(message.contains("Tarih: -"));
    }

    #[test]
    fn same_data_produces_identical_content() {
        let start = Utc.with_ymd_and_hms(2026, 8, 27, 9, 0, 0).unwrap();
        let open = vec![job("Klima montajı", "planned", Some(start))];
        assert_eq!(
            daily_task_message("Ali", &open),
            daily_task_message("Ali", &open)
        );
    }
}
