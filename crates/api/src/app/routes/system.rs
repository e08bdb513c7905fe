use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::context::AuthContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(ctx): Extension<AuthContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "userId": ctx.user_id().to_string(),
        "name": ctx.name(),
        "email": ctx.email(),
        "role": ctx.role().as_str(),
        "permissions": ctx.role().permissions().iter().map(|p| p.as_str()).collect::<Vec<_>>(),
    }))
}
