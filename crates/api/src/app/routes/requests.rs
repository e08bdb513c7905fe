use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use serde_json::json;

use kitroom_auth::Permission;
use kitroom_core::{RequestId, UserId};
use kitroom_requests::{RequestFilter, RequestStatus, RequestSubmission};

use crate::app::dto;
use crate::app::errors::{self, parse_id};
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_requests).post(submit_request))
        .route("/:id", put(update_status).delete(delete_request).get(get_request))
}

/// Requesters always submit as themselves; admins may submit on behalf of
/// someone else. Absent identity fields are taken from the token.
fn with_identity(ctx: &AuthContext, mut body: RequestSubmission) -> RequestSubmission {
    let fill = |field: &mut Option<String>, value: String| {
        if !ctx.role().is_admin() || field.as_deref().is_none_or(|v| v.trim().is_empty()) {
            *field = Some(value);
        }
    };
    fill(&mut body.user_id, ctx.user_id().to_string());
    fill(&mut body.user_name, ctx.name().to_string());
    fill(&mut body.user_email, ctx.email().to_string());
    body
}

pub async fn submit_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<RequestSubmission>,
) -> axum::response::Response {
    if let Err(res) = require(&ctx, Permission::SubmitRequests) {
        return res;
    }

    match services.lifecycle.submit(with_identity(&ctx, body)).await {
        Ok(request) => (StatusCode::CREATED, Json(json!({ "request": request }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Admins see everything; anyone else only their own requests.
pub async fn list_requests(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<dto::ListRequestsQuery>,
) -> axum::response::Response {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => match raw.parse::<RequestStatus>() {
            Ok(s) => Some(s),
            Err(e) => return errors::service_error_to_response(e.into()),
        },
    };

    let user_id = if ctx.can(Permission::ReadAllRequests) {
        match query.user_id.as_deref() {
            None | Some("") => None,
            Some(raw) => match parse_id::<UserId>(raw) {
                Ok(id) => Some(id),
                Err(res) => return res,
            },
        }
    } else {
        Some(ctx.user_id())
    };

    let filter = RequestFilter {
        status,
        user_id,
        item_id: None,
    };

    match services.lifecycle.list(&filter).await {
        Ok(requests) => Json(json!({ "requests": requests })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: RequestId = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.lifecycle.get(id).await {
        // Someone else's request is reported as missing, not forbidden.
        Ok(request)
            if request.user_id != ctx.user_id() && !ctx.can(Permission::ReadAllRequests) =>
        {
            errors::json_error(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("request {id} not found"),
            )
        }
        Ok(request) => Json(json!({ "request": request })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::StatusUpdateRequest>,
) -> axum::response::Response {
    if let Err(res) = require(&ctx, Permission::ReviewRequests) {
        return res;
    }
    let id: RequestId = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.lifecycle.set_status(id, &body.status).await {
        Ok(outcome) => {
            tracing::info!(
                request_id = %id,
                reviewer = %ctx.user_id(),
                from = %outcome.previous_status,
                to = %outcome.request.status,
                "request status updated"
            );
            Json(dto::TransitionResponse::from(outcome)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = require(&ctx, Permission::ReviewRequests) {
        return res;
    }
    let id: RequestId = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.lifecycle.delete(id).await {
        Ok(request) => Json(json!({ "deleted": request.id.to_string() })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
