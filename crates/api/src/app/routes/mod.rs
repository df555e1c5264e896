use axum::{routing::get, Router};

pub mod admin;
pub mod inventory;
pub mod skus;
pub mod system;
pub mod transactions;
pub mod warehouses;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/warehouses", warehouses::router())
        .nest("/skus", skus::router())
        .nest("/transactions", transactions::router())
        .nest("/inventory", inventory::router())
        .nest("/admin", admin::router())
}
