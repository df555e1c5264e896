use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use wms_auth::Permission;
use wms_core::SkuId;

use crate::app::{dto, errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_skus).post(create_sku))
        .route("/:id", get(get_sku))
}

pub async fn create_sku(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateSkuRequest>,
) -> Response {
    if let Err(res) = authz::require(&principal, &Permission::SKUS_WRITE) {
        return res;
    }

    match services.ledger().create_sku(body.into()).await {
        Ok(sku) => {
            tracing::info!(sku_id = %sku.id, code = %sku.code, "sku created");
            (StatusCode::CREATED, Json(sku)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_skus(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(res) = authz::require(&principal, &Permission::INVENTORY_READ) {
        return res;
    }

    match services.ledger().list_skus().await {
        Ok(items) => Json(serde_json::json!({ "items": items })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_sku(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(res) = authz::require(&principal, &Permission::INVENTORY_READ) {
        return res;
    }
    let id: SkuId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.ledger().get_sku(id).await {
        Ok(Some(sku)) => Json(sku).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "sku not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}
