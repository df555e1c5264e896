use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};

use wms_auth::Permission;
use wms_core::TransactionId;
use wms_inventory::TransactionMetadataPatch;

use crate::app::{dto, errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_transactions).post(record_transaction))
        .route("/:id", patch(patch_transaction).get(get_transaction))
}

/// POST /transactions - append one RECEIVE/SHIP movement to the ledger.
pub async fn record_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::RecordTransactionRequest>,
) -> Response {
    if let Err(res) = authz::require(&principal, &Permission::TRANSACTIONS_RECORD) {
        return res;
    }
    let new = match body.into_new_transaction(principal.user_id()) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.ledger().append_transaction(new).await {
        Ok(tx) => {
            tracing::info!(
                transaction_id = %tx.id,
                sequence = tx.sequence,
                kind = %tx.transaction_type,
                "transaction recorded"
            );
            (StatusCode::CREATED, Json(tx)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// GET /transactions - filtered, paginated, most recent first.
pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::TransactionListQuery>,
) -> Response {
    if let Err(res) = authz::require(&principal, &Permission::INVENTORY_READ) {
        return res;
    }
    let (filter, pagination) = match query.into_filter() {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.ledger().query_transactions(&filter, pagination).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(res) = authz::require(&principal, &Permission::INVENTORY_READ) {
        return res;
    }
    let id: TransactionId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.ledger().get_transaction(id).await {
        Ok(Some(tx)) => Json(tx).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "transaction not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// PATCH /transactions/:id - tracking number / notes only; quantities are immutable.
pub async fn patch_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::PatchTransactionRequest>,
) -> Response {
    if let Err(res) = authz::require(&principal, &Permission::TRANSACTIONS_RECORD) {
        return res;
    }
    let id: TransactionId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    let patch = TransactionMetadataPatch::from(body);
    if patch.is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "nothing to update (expected tracking_number and/or notes)",
        );
    }

    match services.ledger().patch_transaction(id, patch).await {
        Ok(tx) => Json(tx).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
