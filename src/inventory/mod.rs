use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::CrmError;
use crate::shared::models::schema::inventory_items;
use crate::shared::models::{InventoryItem, NewInventoryItem};
use crate::shared::state::AppState;

pub mod import;

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub sku: Option<String>,
    pub unit: Option<String>,
    pub unit_price: Option<BigDecimal>,
    pub current_stock: Option<BigDecimal>,
    pub critical_stock_level: Option<BigDecimal>,
}

#[derive(Debug, Deserialize, AsChangeset)]
#[diesel(table_name = inventory_items)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub unit: Option<String>,
    pub unit_price: Option<BigDecimal>,
    pub current_stock: Option<BigDecimal>,
    pub critical_stock_level: Option<BigDecimal>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub id: Option<Uuid>,
}

pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateItemRequest>,
) -> Result<Json<SuccessResponse>, CrmError> {
    if req.name.trim().is_empty() {
        return Err(CrmError::Validation("Ürün adı gereklidir.".to_string()));
    }
    let row = NewInventoryItem {
        id: Uuid::new_v4(),
        name: req.name,
        sku: req.sku,
        unit: req.unit,
        unit_price: req.unit_price,
        current_stock: req.current_stock.unwrap_or_else(BigDecimal::zero),
        critical_stock_level: req.critical_stock_level.unwrap_or_else(BigDecimal::zero),
        created_at: Utc::now(),
    };
    let mut conn = state.conn.get()?;
    diesel::insert_into(inventory_items::table)
        .values(&row)
        .execute(&mut conn)?;
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(row.id),
    }))
}

pub async fn list_items(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<InventoryItem>>, CrmError> {
    let mut conn = state.conn.get()?;
    let rows = inventory_items::table
        .order(inventory_items::name.asc())
        .select(InventoryItem::as_select())
        .load::<InventoryItem>(&mut conn)?;
    Ok(Json(rows))
}

/// Items at or below their critical threshold. The comparison happens here
/// rather than in SQL, mirroring how the dashboard derives the same count.
pub async fn list_critical_items(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<InventoryItem>>, CrmError> {
    let mut conn = state.conn.get()?;
    let rows = inventory_items::table
        .select(InventoryItem::as_select())
        .load::<InventoryItem>(&mut conn)?;
    Ok(Json(rows.into_iter().filter(|i| i.is_critical()).collect()))
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<SuccessResponse>, CrmError> {
    let mut conn = state.conn.get()?;
    let updated = diesel::update(inventory_items::table.find(item_id))
        .set(&req)
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(CrmError::NotFound("Ürün".to_string()));
    }
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(item_id),
    }))
}

pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, CrmError> {
    let mut conn = state.conn.get()?;
    let deleted = diesel::delete(inventory_items::table.find(item_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(CrmError::NotFound("Ürün".to_string()));
    }
    Ok(Json(SuccessResponse {
        success: true,
        id: Some(item_id),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/inventory", get(list_items).post(create_item))
        .route("/inventory/critical", get(list_critical_items))
        .route(
            "/inventory/:id",
            axum::routing::put(update_item).delete(delete_item),
        )
        .route("/inventory/import", axum::routing::post(import::import_items))
}
