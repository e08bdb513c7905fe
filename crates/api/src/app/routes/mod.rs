use axum::{Router, routing::get};

pub mod items;
pub mod requests;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/requests", requests::router())
        .nest("/items", items::router())
}
