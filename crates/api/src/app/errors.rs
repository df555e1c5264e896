use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use wms_core::DomainError;
use wms_infra::ledger_store::StoreError;
use wms_infra::projections::ProjectionError;

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

/// Domain failures map to 4xx; infrastructure failures are logged and become 500.
pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::Domain(e) => domain_error_to_response(e),
        other => {
            tracing::error!(error = %other, "store operation failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", other.to_string())
        }
    }
}

pub fn projection_error_to_response(err: ProjectionError) -> Response {
    match err {
        ProjectionError::Store(e) => store_error_to_response(e),
        ProjectionError::Aggregation(e) => {
            tracing::error!(error = %e, "balance aggregation failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "aggregation_error", e.to_string())
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path/query identifier, mapping failures to a 400 response.
pub fn parse_id<T>(raw: &str) -> Result<T, Response>
where
    T: std::str::FromStr<Err = DomainError>,
{
    raw.trim().parse().map_err(domain_error_to_response)
}
