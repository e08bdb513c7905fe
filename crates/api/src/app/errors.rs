use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use kitroom_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        ServiceError::InvalidStatus(raw) => json_error(
            StatusCode::BAD_REQUEST,
            "invalid_status",
            format!(
                "invalid status '{raw}'; expected one of: pending, approved, declined, issued, submitted"
            ),
        ),
        ServiceError::DuplicateKey(code) => json_error(
            StatusCode::BAD_REQUEST,
            "duplicate_key",
            format!("item code already exists: {code}"),
        ),
        ServiceError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
        }
        ServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::StorageUnavailable(msg) => {
            tracing::warn!(error = %msg, "storage unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable", msg)
        }
        ServiceError::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path/query identifier, mapping failure to a 400.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: std::str::FromStr<Err = kitroom_core::DomainError>,
{
    raw.parse().map_err(|e: kitroom_core::DomainError| {
        json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitroom_core::ItemId;

    #[test]
    fn service_errors_map_to_documented_statuses() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::InvalidStatus("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::DuplicateKey("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::StorageUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (ServiceError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(service_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn malformed_ids_are_bad_requests() {
        let res = parse_id::<ItemId>("not-an-id").unwrap_err();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(parse_id::<ItemId>(&ItemId::new().to_string()).is_ok());
    }
}
