//! Admin routes for balance cache maintenance.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Query},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use wms_auth::Permission;

use crate::app::{dto, errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/balances/rebuild", post(rebuild_balances))
        .route("/balances/reconcile", get(reconcile_balances))
}

/// POST /admin/balances/rebuild - recompute cached balances from the ledger.
///
/// Body `{ "warehouse_id": "..." }` limits the rebuild to one warehouse; an
/// empty body rebuilds everything. A malformed body is a 400.
pub async fn rebuild_balances(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(res) = authz::require(&principal, &Permission::BALANCES_REBUILD) {
        return res;
    }

    let warehouse_id = match dto::RebuildRequest::from_body(&headers, &body)
        .and_then(|req| req.warehouse_id())
    {
        Ok(v) => v,
        Err(res) => return res,
    };

    tracing::info!(user_id = %principal.user_id(), ?warehouse_id, "balance rebuild requested");

    match services.balances().rebuild(warehouse_id).await {
        Ok(outcome) => {
            let scope = match outcome.warehouse_id {
                Some(id) => format!("warehouse {id}"),
                None => "all warehouses".to_string(),
            };
            let mut message = format!("Rebuilt {} balance rows for {scope}", outcome.updated_count);
            if outcome.needs_review > 0 {
                message.push_str(&format!("; {} negative balances need review", outcome.needs_review));
            }

            Json(dto::RebuildResponse {
                success: true,
                updated_count: outcome.updated_count,
                message,
            })
            .into_response()
        }
        Err(e) => errors::projection_error_to_response(e),
    }
}

/// GET /admin/balances/reconcile - compare the cache against the ledger without writing.
pub async fn reconcile_balances(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::BalanceQuery>,
) -> Response {
    if let Err(res) = authz::require(&principal, &Permission::BALANCES_REBUILD) {
        return res;
    }
    let scope = match query.scope() {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.balances().reconcile(&scope).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => errors::projection_error_to_response(e),
    }
}
