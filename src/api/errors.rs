use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use crate::errors::ZeronError;

impl IntoResponse for ZeronError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ZeronError::Config(_) | ZeronError::InvalidTarget(_) | ZeronError::InvalidScope(_) => StatusCode::BAD_REQUEST,
            ZeronError::NotFound(_) => StatusCode::NOT_FOUND,
            ZeronError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}
