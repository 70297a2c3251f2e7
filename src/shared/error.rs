use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use log::error;
use serde::Serialize;
use thiserror::Error;

/// Error taxonomy shared by every handler and adapter.
///
/// Errors are caught at the outermost handler of each request; nothing is
/// retried automatically. `NotFound` is usually handled as a silent no-op
/// inside the webhook paths instead of propagating here.
#[derive(Debug, Error)]
pub enum CrmError {
    #[error("missing configuration: {0}")]
    Configuration(&'static str),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("remote call failed: {0}")]
    Remote(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

impl From<reqwest::Error> for CrmError {
    fn from(err: reqwest::Error) -> Self {
        CrmError::Remote(err.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

impl CrmError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CrmError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CrmError::Validation(_) => StatusCode::BAD_REQUEST,
            CrmError::Remote(_) => StatusCode::BAD_GATEWAY,
            CrmError::NotFound(_) => StatusCode::NOT_FOUND,
            CrmError::Database(diesel::result::Error::NotFound) => StatusCode::NOT_FOUND,
            CrmError::Database(_) | CrmError::Pool(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing message. Internals stay in the server log only.
    fn public_message(&self) -> String {
        match self {
            CrmError::Configuration(key) => format!("{} eksik.", key),
            CrmError::Validation(msg) => msg.clone(),
            CrmError::NotFound(what) => format!("{} bulunamadı.", what),
            CrmError::Remote(_) => "Dış servis çağrısı başarısız oldu.".to_string(),
            CrmError::Database(diesel::result::Error::NotFound) => "Kayıt bulunamadı.".to_string(),
            CrmError::Database(_) | CrmError::Pool(_) => "Bir hata oluştu.".to_string(),
        }
    }
}

impl IntoResponse for CrmError {
    fn into_response(self) -> Response {
        error!("request failed: {}", self);
        let body = ErrorResponse {
            error: self.public_message(),
            details: None,
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_names_the_missing_setting() {
        let err = CrmError::Configuration("SUPABASE_SERVICE_ROLE_KEY");
        assert_eq!(err.public_message(), "SUPABASE_SERVICE_ROLE_KEY eksik.");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn remote_error_hides_internals_from_the_response() {
        let err = CrmError::Remote("connection reset by peer at 10.0.0.3".to_string());
        assert!(!err.public_message().contains("10.0.0.3"));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn missing_row_maps_to_not_found() {
        let err = CrmError::Database(diesel::result::Error::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
