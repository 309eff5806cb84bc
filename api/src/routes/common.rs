use axum::{Json, http::StatusCode};
use serde::Serialize;
use services::AppError;
use tracing::error;
use validator::ValidationErrors;

use crate::response::ApiResponse;

/// Maps a domain error to its HTTP status and the standard error envelope.
/// Every rejection keeps the human-actionable message from the error itself.
pub fn error_response<T>(err: AppError) -> (StatusCode, Json<ApiResponse<T>>)
where
    T: Serialize + Default,
{
    let status = match &err {
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Forbidden(_) => StatusCode::FORBIDDEN,
        AppError::Unavailable(db_err) => {
            error!(error = %db_err, "persistence failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(ApiResponse::error(err.to_string())))
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(m) => format!("{field}: {m}"),
                None => format!("{field} is invalid"),
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}
