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
use crate::shared::models::schema::customers;
use crate::shared::models::{Customer, NewCustomer};
use crate::shared::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub company_name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, AsChangeset)]
#[diesel(table_name = customers)]
pub struct UpdateCustomerRequest {
    pub company_name: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub id: Option<Uuid>,
}

pub async fn create_customer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<Json<SuccessResponse>, CrmError> {
    if req.company_name.trim().is_empty() {
        return Err(CrmError::Validation("Firma adı gereklidir.".to_string()));
    }
    let row = NewCustomer {
        id: Uuid::new_v4(),
        company_name: req.company_name,
        contact_person: req.contact_person,
        phone: req.phone,
        address: req.address,
        notes: req.notes,
        created_at: Utc::now(),
    };
    let mut conn = state.conn.get()?;
    diesel::insert_into(customers::table)
        .values(&row)
        .execute(&mut conn)?;
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(row.id),
    }))
}

pub async fn list_customers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Customer>>, CrmError> {
    let mut conn = state.conn.get()?;
    let rows = customers::table
        .order(customers::created_at.desc())
        .select(Customer::as_select())
        .load::<Customer>(&mut conn)?;
    Ok(Json(rows))
}

pub async fn update_customer(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
    Json(req): Json<UpdateCustomerRequest>,
) -> Result<Json<SuccessResponse>, CrmError> {
    let mut conn = state.conn.get()?;
    let updated = diesel::update(customers::table.find(customer_id))
        .set(&req)
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(CrmError::NotFound("Müşteri".to_string()));
    }
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(customer_id),
    }))
}

pub async fn delete_customer(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, CrmError> {
    let mut conn = state.conn.get()?;
    let deleted = diesel::delete(customers::table.find(customer_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(CrmError::NotFound("Müşteri".to_string()));
    }
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(customer_id),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route(
            "/customers/:id",
            axum::routing::put(update_customer).delete(delete_customer),
        )
}
