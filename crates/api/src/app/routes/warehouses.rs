use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use wms_auth::Permission;
use wms_core::WarehouseId;

use crate::app::{dto, errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_warehouses).post(create_warehouse))
        .route("/:id", get(get_warehouse))
}

pub async fn create_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateWarehouseRequest>,
) -> Response {
    if let Err(res) = authz::require(&principal, &Permission::WAREHOUSES_WRITE) {
        return res;
    }

    match services.ledger().create_warehouse(body.into()).await {
        Ok(warehouse) => {
            tracing::info!(warehouse_id = %warehouse.id, code = %warehouse.code, "warehouse created");
            (StatusCode::CREATED, Json(warehouse)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_warehouses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(res) = authz::require(&principal, &Permission::INVENTORY_READ) {
        return res;
    }

    match services.ledger().list_warehouses().await {
        Ok(items) => Json(serde_json::json!({ "items": items })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(res) = authz::require(&principal, &Permission::INVENTORY_READ) {
        return res;
    }
    let id: WarehouseId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.ledger().get_warehouse(id).await {
        Ok(Some(warehouse)) => Json(warehouse).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "warehouse not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}
