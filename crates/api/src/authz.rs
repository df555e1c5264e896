//! API-side authorization guard.
//!
//! Handlers call [`require`] before touching any store, keeping the stores
//! and the domain auth-agnostic.

use axum::http::StatusCode;
use axum::response::Response;

use wms_auth::{authorize, Permission};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Check `permission` for the caller; a denial becomes a 403 response.
pub fn require(principal: &PrincipalContext, permission: &Permission) -> Result<(), Response> {
    authorize(&principal.principal(), permission).map_err(|e| {
        tracing::debug!(user_id = %principal.user_id(), permission = permission.as_str(), "forbidden");
        errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })
}
