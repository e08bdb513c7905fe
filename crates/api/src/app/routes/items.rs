use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;

use kitroom_auth::Permission;
use kitroom_core::ItemId;
use kitroom_inventory::{ItemPatch, ItemQuery, NewItem};

use crate::app::dto;
use crate::app::errors::{self, parse_id};
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/import", post(import_items))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
        .route("/:id/active", put(set_active))
        .route("/:id/history", get(item_history))
}

/// Requesters only ever see active items.
pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<dto::ListItemsQuery>,
) -> axum::response::Response {
    let mut filter = ItemQuery {
        active_only: !ctx.can(Permission::ReadAllItems) || query.active_only.unwrap_or(false),
        ..ItemQuery::default()
    };
    if let Some(sport) = query.sport.filter(|s| !s.trim().is_empty()) {
        filter = filter.with_sport(sport);
    }

    match services.inventory.list(&filter).await {
        Ok(items) => Json(json!({ "items": items })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ItemId = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.inventory.get(id).await {
        Ok(item) if !item.is_active && !ctx.can(Permission::ReadAllItems) => {
            errors::json_error(StatusCode::NOT_FOUND, "not_found", format!("item {id} not found"))
        }
        Ok(item) => Json(json!({ "item": item })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<NewItem>,
) -> axum::response::Response {
    if let Err(res) = require(&ctx, Permission::ManageItems) {
        return res;
    }

    match services.inventory.create(body).await {
        Ok(item) => (StatusCode::CREATED, Json(json!({ "item": item }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn import_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<dto::ImportItemsRequest>,
) -> axum::response::Response {
    if let Err(res) = require(&ctx, Permission::ManageItems) {
        return res;
    }

    match services.inventory.import(body.items).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(patch): Json<ItemPatch>,
) -> axum::response::Response {
    if let Err(res) = require(&ctx, Permission::ManageItems) {
        return res;
    }
    let id: ItemId = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.inventory.update(id, patch).await {
        Ok(item) => Json(json!({ "item": item })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn set_active(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetActiveRequest>,
) -> axum::response::Response {
    if let Err(res) = require(&ctx, Permission::ManageItems) {
        return res;
    }
    let id: ItemId = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.inventory.set_active(id, body.is_active).await {
        Ok(item) => Json(json!({ "item": item })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = require(&ctx, Permission::ManageItems) {
        return res;
    }
    let id: ItemId = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.inventory.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Unknown items still answer, with a placeholder name and no requests.
pub async fn item_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = require(&ctx, Permission::ReadAllItems) {
        return res;
    }
    let id: ItemId = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.lifecycle.item_history(id).await {
        Ok(history) => Json(history).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
