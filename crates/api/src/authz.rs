//! Permission guard applied by handlers before calling a service.

use axum::http::StatusCode;
use axum::response::Response;

use kitroom_auth::{Permission, authorize};

use crate::app::errors::json_error;
use crate::context::AuthContext;

/// `Err` carries a ready 403 response.
pub fn require(ctx: &AuthContext, permission: Permission) -> Result<(), Response> {
    authorize(ctx.role(), permission).map_err(|e| {
        tracing::debug!(user_id = %ctx.user_id(), %permission, "permission denied");
        json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })
}
