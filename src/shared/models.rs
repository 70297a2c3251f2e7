use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use self::schema::{
    customers, inventory_items, inventory_movements, job_reports, jobs, profiles, projects,
};

/// Job status lifecycle. Stored as text; the column vocabulary is a wire
/// contract with the hosted database and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "planned" => Some(Self::Planned),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Display label used in WhatsApp replies.
    pub fn label_tr(&self) -> &'static str {
        match self {
            Self::InProgress => "Devam Ediyor",
            Self::Completed => "Tamamlandı",
            Self::Cancelled => "İptal",
            Self::Planned => "Planlandı",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Start,
    End,
    Daily,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Daily => "daily",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{} {}", first, last).trim().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = customers)]
pub struct Customer {
    pub id: Uuid,
    pub company_name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = projects)]
pub struct Project {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = jobs)]
pub struct Job {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub planned_start_date: Option<DateTime<Utc>>,
    pub planned_end_date: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = job_reports)]
pub struct JobReport {
    pub id: Uuid,
    pub job_id: Uuid,
    pub staff_id: Uuid,
    pub report_type: String,
    pub description: Option<String>,
    pub media_urls: Vec<String>,
    pub materials_returned: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = inventory_items)]
pub struct InventoryItem {
    pub id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub unit: Option<String>,
    pub unit_price: Option<BigDecimal>,
    pub current_stock: BigDecimal,
    pub critical_stock_level: BigDecimal,
    pub created_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Stock is critical when it has fallen to or below the warning level.
    pub fn is_critical(&self) -> bool {
        self.current_stock <= self.critical_stock_level
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = inventory_movements)]
pub struct InventoryMovement {
    pub id: Uuid,
    pub item_id: Uuid,
    pub job_id: Option<Uuid>,
    pub movement_type: String,
    pub quantity: BigDecimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One returned-material line inside an end-of-job report, serialized into
/// the report's `materials_returned` jsonb column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialLine {
    pub item_id: Uuid,
    pub quantity: BigDecimal,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = customers)]
pub struct NewCustomer {
    pub id: Uuid,
    pub company_name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = projects)]
pub struct NewProject {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = jobs)]
pub struct NewJob {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub planned_start_date: Option<DateTime<Utc>>,
    pub planned_end_date: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = job_reports)]
pub struct NewJobReport {
    pub id: Uuid,
    pub job_id: Uuid,
    pub staff_id: Uuid,
    pub report_type: String,
    pub description: Option<String>,
    pub media_urls: Vec<String>,
    pub materials_returned: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = inventory_items)]
pub struct NewInventoryItem {
    pub id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub unit: Option<String>,
    pub unit_price: Option<BigDecimal>,
    pub current_stock: BigDecimal,
    pub critical_stock_level: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = inventory_movements)]
pub struct NewInventoryMovement {
    pub id: Uuid,
    pub item_id: Uuid,
    pub job_id: Option<Uuid>,
    pub movement_type: String,
    pub quantity: BigDecimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub mod schema {
    diesel::table! {
        profiles (id) {
            id -> Uuid,
            first_name -> Nullable<Text>,
            last_name -> Nullable<Text>,
            phone -> Nullable<Text>,
            role -> Text,
            is_active -> Bool,
            avatar_url -> Nullable<Text>,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        customers (id) {
            id -> Uuid,
            company_name -> Text,
            contact_person -> Nullable<Text>,
            phone -> Nullable<Text>,
            address -> Nullable<Text>,
            notes -> Nullable<Text>,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        projects (id) {
            id -> Uuid,
            customer_id -> Uuid,
            name -> Text,
            address -> Nullable<Text>,
            description -> Nullable<Text>,
            status -> Text,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        jobs (id) {
            id -> Uuid,
            project_id -> Uuid,
            title -> Text,
            description -> Nullable<Text>,
            assigned_to -> Nullable<Uuid>,
            planned_start_date -> Nullable<Timestamptz>,
            planned_end_date -> Nullable<Timestamptz>,
            status -> Text,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        job_reports (id) {
            id -> Uuid,
            job_id -> Uuid,
            staff_id -> Uuid,
            report_type -> Text,
            description -> Nullable<Text>,
            media_urls -> Array<Text>,
            materials_returned -> Jsonb,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        inventory_items (id) {
            id -> Uuid,
            name -> Text,
            sku -> Nullable<Text>,
            unit -> Nullable<Text>,
            unit_price -> Nullable<Numeric>,
            current_stock -> Numeric,
            critical_stock_level -> Numeric,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        inventory_movements (id) {
            id -> Uuid,
            item_id -> Uuid,
            job_id -> Nullable<Uuid>,
            movement_type -> Text,
            quantity -> Numeric,
            description -> Nullable<Text>,
            created_at -> Timestamptz,
        }
    }

    diesel::joinable!(projects -> customers (customer_id));
    diesel::joinable!(jobs -> projects (project_id));
    diesel::joinable!(jobs -> profiles (assigned_to));
    diesel::joinable!(job_reports -> jobs (job_id));
    diesel::joinable!(job_reports -> profiles (staff_id));
    diesel::joinable!(inventory_movements -> inventory_items (item_id));
    diesel::joinable!(inventory_movements -> jobs (job_id));

    diesel::allow_tables_to_appear_in_same_query!(
        profiles,
        customers,
        projects,
        jobs,
        job_reports,
        inventory_items,
        inventory_movements,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::FromPrimitive;

    fn item(stock: f64, critical: f64) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4(),
            name: "Kablo".to_string(),
            sku: None,
            unit: Some("Metre".to_string()),
            unit_price: None,
            current_stock: BigDecimal::from_f64(stock).unwrap(),
            critical_stock_level: BigDecimal::from_f64(critical).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn critical_when_stock_at_or_below_threshold() {
        assert!(item(5.0, 10.0).is_critical());
        assert!(item(10.0, 10.0).is_critical());
        assert!(!item(10.5, 10.0).is_critical());
    }

    #[test]
    fn fractional_units_compare_correctly() {
        assert!(item(2.5, 2.5).is_critical());
        assert!(!item(2.51, 2.5).is_critical());
    }

    #[test]
    fn job_status_round_trips_through_text() {
        for status in [
            JobStatus::Planned,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("archived"), None);
    }

    #[test]
    fn display_name_handles_missing_parts() {
        let mut p = Profile {
            id: Uuid::new_v4(),
            first_name: Some("Ayşe".to_string()),
            last_name: None,
            phone: None,
            role: "staff".to_string(),
            is_active: true,
            avatar_url: None,
            created_at: Utc::now(),
        };
        assert_eq!(p.display_name(), "Ayşe");
        p.last_name = Some("Yılmaz".to_string());
        assert_eq!(p.display_name(), "Ayşe Yılmaz");
    }
}
