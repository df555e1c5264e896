use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use wms_auth::Permission;

use crate::app::dto::{self, BalanceSource};
use crate::app::{errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/balances", get(get_balances))
}

/// GET /inventory/balances - per (SKU, batch, warehouse) balances plus summary.
///
/// `source=ledger` (default) folds the ledger on every request; `source=cache`
/// reads the last rebuilt snapshot.
pub async fn get_balances(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::BalanceQuery>,
) -> Response {
    if let Err(res) = authz::require(&principal, &Permission::INVENTORY_READ) {
        return res;
    }
    let (scope, source) = match (query.scope(), query.source()) {
        (Ok(scope), Ok(source)) => (scope, source),
        (Err(res), _) | (_, Err(res)) => return res,
    };

    let result = match source {
        BalanceSource::Ledger => services.balances().from_ledger(&scope).await,
        BalanceSource::Cache => services.balances().from_cache(&scope).await,
    };

    match result {
        Ok(balances) => Json(dto::BalancesResponse::new(source, balances)).into_response(),
        Err(e) => errors::projection_error_to_response(e),
    }
}
