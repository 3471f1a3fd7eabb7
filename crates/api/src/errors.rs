use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use crudkit_core::CrudError;

pub fn crud_error_to_response(err: CrudError) -> axum::response::Response {
    match err {
        CrudError::ConcurrencyConflict { .. } => json_error(StatusCode::CONFLICT, "conflict", err.to_string()),
        CrudError::AlreadyExists { .. } => json_error(StatusCode::CONFLICT, "already_exists", err.to_string()),
        CrudError::Vetoed { .. } => json_error(StatusCode::FORBIDDEN, "vetoed", err.to_string()),
        CrudError::InvalidSort(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_sort", msg),
        CrudError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        CrudError::Merge(e) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "merge_error", e.to_string()),
        CrudError::Store(msg) => {
            tracing::error!(error = %msg, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
        CrudError::Serialization(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "serialization_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn not_found(entity_type: &str, id: impl std::fmt::Display) -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, "not_found", format!("{entity_type} {id} not found"))
}
