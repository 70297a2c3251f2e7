//! Combines the per-module routers into the service's full route table.

use axum::Router;
use std::sync::Arc;

use crate::shared::state::AppState;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::channels::whatsapp::router())
        .merge(crate::automation::router())
        .merge(crate::dashboard::router())
        .merge(crate::customers::router())
        .merge(crate::projects::router())
        .merge(crate::jobs::router())
        .merge(crate::staff::router())
        .merge(crate::inventory::router())
        .merge(crate::reports::router())
}
