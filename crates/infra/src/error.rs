use thiserror::Error;

use kitroom_core::DomainError;

use crate::store::StoreError;

/// Error returned by the application services.
///
/// Everything except `StorageUnavailable` and `Storage` is detected before
/// any write happens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid status '{0}'")]
    InvalidStatus(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("item code already exists: {0}")]
    DuplicateKey(String),

    /// Concurrent writers kept winning.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Timeout or lost connection to the store.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::InvalidStatus(raw) => ServiceError::InvalidStatus(raw),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateKey { item_code } => ServiceError::DuplicateKey(item_code),
            StoreError::Unavailable(msg) | StoreError::Indeterminate(msg) => {
                ServiceError::StorageUnavailable(msg)
            }
            StoreError::Backend(msg) | StoreError::Corrupt(msg) => ServiceError::Storage(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_surface_as_validation() {
        let err: ServiceError = DomainError::invalid_id("ItemId: bad").into();
        assert_eq!(err, ServiceError::Validation("ItemId: bad".to_string()));
    }

    #[test]
    fn store_duplicates_keep_the_code() {
        let err: ServiceError = StoreError::DuplicateKey {
            item_code: "BB-001".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "item code already exists: BB-001");
    }

    #[test]
    fn timeouts_are_unavailable_not_generic_failures() {
        let err: ServiceError =
            StoreError::Indeterminate("get_request timed out".to_string()).into();
        assert!(matches!(err, ServiceError::StorageUnavailable(_)));
    }
}
