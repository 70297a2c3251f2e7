//! Bulk inventory import from an uploaded XLSX workbook. Accepts the
//! Turkish template headers as well as plain column names.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Json;
use bigdecimal::{BigDecimal, FromPrimitive, Zero};
use calamine::{Data, Reader, Xlsx};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use serde::Serialize;
use std::io::Cursor;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::CrmError;
use crate::shared::models::schema::inventory_items;
use crate::shared::models::NewInventoryItem;
use crate::shared::state::AppState;

/// One parsed spreadsheet row, before validation.
#[derive(Debug, Clone, Default)]
pub struct ImportRow {
    pub name: String,
    pub sku: Option<String>,
    pub unit: Option<String>,
    pub current_stock: f64,
    pub critical_stock_level: f64,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub count: usize,
}

fn header_field(header: &str) -> Option<&'static str> {
    match header.trim().to_lowercase().as_str() {
        "ürün adı" | "name" => Some("name"),
        "sku" => Some("sku"),
        "birim" | "unit" => Some("unit"),
        "stok" | "stock" | "current_stock" => Some("current_stock"),
        "kritik stok" | "min_stock" | "critical_stock_level" => Some("critical_stock_level"),
        _ => None,
    }
}

fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Float(f)) => f.to_string(),
        Some(Data::Int(i)) => i.to_string(),
        _ => String::new(),
    }
}

fn cell_number(cell: Option<&Data>) -> f64 {
    match cell {
        Some(Data::Float(f)) => *f,
        Some(Data::Int(i)) => *i as f64,
        Some(Data::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

pub fn parse_workbook(bytes: &[u8]) -> Result<Vec<ImportRow>, CrmError> {
    let mut workbook = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| CrmError::Validation(format!("Dosya okunamadı: {}", e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CrmError::Validation("Dosyada sayfa bulunamadı.".to_string()))?
        .map_err(|e| CrmError::Validation(format!("Dosya okunamadı: {}", e)))?;

    let mut rows = range.rows();
    let headers: Vec<Option<&'static str>> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| header_field(&cell_text(Some(cell))))
            .collect(),
        None => return Ok(vec![]),
    };

    let mut parsed = Vec::new();
    for row in rows {
        let mut item = ImportRow::default();
        for (idx, field) in headers.iter().enumerate() {
            let cell = row.get(idx);
            match field {
                Some("name") => item.name = cell_text(cell),
                Some("sku") => {
                    let value = cell_text(cell);
                    item.sku = (!value.is_empty()).then_some(value);
                }
                Some("unit") => {
                    let value = cell_text(cell);
                    item.unit = (!value.is_empty()).then_some(value);
                }
                Some("current_stock") => item.current_stock = cell_number(cell),
                Some("critical_stock_level") => item.critical_stock_level = cell_number(cell),
                _ => {}
            }
        }
        parsed.push(item);
    }
    Ok(parsed)
}

/// Drops rows without a usable product name. Numeric fields have already
/// defaulted to 0 during parsing.
pub fn validate_rows(rows: Vec<ImportRow>) -> Vec<ImportRow> {
    rows.into_iter()
        .filter(|row| !row.name.trim().is_empty())
        .collect()
}

pub async fn import_items(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ImportResponse>, CrmError> {
    if state.config.storage.service_key.is_none() {
        return Err(CrmError::Configuration("SUPABASE_SERVICE_ROLE_KEY"));
    }

    let rows = validate_rows(parse_workbook(&body)?);
    if rows.is_empty() {
        return Err(CrmError::Validation(
            "Yüklenecek geçerli veri bulunamadı.".to_string(),
        ));
    }

    let new_items: Vec<NewInventoryItem> = rows
        .iter()
        .map(|row| NewInventoryItem {
            id: Uuid::new_v4(),
            name: row.name.clone(),
            sku: row.sku.clone(),
            unit: Some(row.unit.clone().unwrap_or_else(|| "Adet".to_string())),
            unit_price: None,
            current_stock: BigDecimal::from_f64(row.current_stock)
                .unwrap_or_else(BigDecimal::zero),
            critical_stock_level: BigDecimal::from_f64(row.critical_stock_level)
                .unwrap_or_else(BigDecimal::zero),
            created_at: Utc::now(),
        })
        .collect();

    let mut conn = state.conn.get()?;
    diesel::insert_into(inventory_items::table)
        .values(&new_items)
        .execute(&mut conn)?;

    info!("imported {} inventory items", new_items.len());
    Ok(Json(ImportResponse {
        success: true,
        count: new_items.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, stock: f64) -> ImportRow {
        ImportRow {
            name: name.to_string(),
            current_stock: stock,
            ..Default::default()
        }
    }

    #[test]
    fn blank_and_whitespace_names_are_dropped() {
        let rows = vec![row("Kablo", 100.0), row("", 5.0), row("   ", 3.0), row("Sigorta", 10.0)];
        let valid = validate_rows(rows);
        assert_eq!(valid.len(), 2);
        assert_eq!(valid[0].name, "Kablo");
        assert_eq!(valid[1].name, "Sigorta");
    }

    #[test]
    fn turkish_and_english_headers_both_map() {
        assert_eq!(header_field("Ürün Adı"), Some("name"));
        assert_eq!(header_field("name"), Some("name"));
        assert_eq!(header_field("Stok"), Some("current_stock"));
        assert_eq!(header_field("Kritik Stok"), Some("critical_stock_level"));
        assert_eq!(header_field("Birim"), Some("unit"));
        assert_eq!(header_field("Fiyat Notu"), None);
    }

    #[test]
    fn non_numeric_cells_default_to_zero() {
        assert_eq!(cell_number(Some(&Data::String("yok".to_string()))), 0.0);
        assert_eq!(cell_number(None), 0.0);
        assert_eq!(cell_number(Some(&Data::String("12.5".to_string()))), 12.5);
        assert_eq!(cell_number(Some(&Data::Float(7.0))), 7.0);
        assert_eq!(cell_number(Some(&Data::Int(3))), 3.0);
    }
}
