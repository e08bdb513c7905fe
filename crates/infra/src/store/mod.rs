//! Repository interfaces for items and requests.
//!
//! The services depend on these traits only; [`in_memory`] backs tests and
//! local runs, [`postgres`] backs deployments.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use kitroom_core::{ItemId, RequestId};
use kitroom_inventory::{Item, ItemPatch, ItemQuery};
use kitroom_requests::{Request, RequestFilter, RequestStatus};

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryItemStore, InMemoryRequestStore};
pub use postgres::{PostgresItemStore, PostgresRequestStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("item code already exists: {item_code}")]
    DuplicateKey { item_code: String },

    /// The call never reached the store: closed pool or no free connection.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The call was sent but no answer came back. A write may have landed.
    #[error("store outcome unknown: {0}")]
    Indeterminate(String),

    #[error("store backend error: {0}")]
    Backend(String),

    /// A stored row could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// `true` when a write may have been applied despite the error.
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, StoreError::Indeterminate(_))
    }
}

/// Result of a conditional status write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusWrite {
    Applied(Request),
    /// The stored status no longer equals the expected one.
    Stale,
    Missing,
}

#[async_trait::async_trait]
pub trait ItemStore: Send + Sync {
    /// Fails with `DuplicateKey` if the code is taken.
    async fn insert(&self, item: Item) -> Result<Item, StoreError>;

    /// All-or-nothing: any duplicate code (in the batch or already stored)
    /// rejects the whole batch.
    async fn insert_many(&self, items: Vec<Item>) -> Result<Vec<Item>, StoreError>;

    async fn get(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    async fn find_by_code(&self, item_code: &str) -> Result<Option<Item>, StoreError>;

    async fn update(
        &self,
        id: ItemId,
        patch: &ItemPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError>;

    async fn set_active(
        &self,
        id: ItemId,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError>;

    /// Atomically add `delta` to `item_quantity`. `None` if the item is gone.
    async fn adjust_quantity(&self, id: ItemId, delta: i64) -> Result<Option<Item>, StoreError>;

    async fn delete(&self, id: ItemId) -> Result<bool, StoreError>;

    async fn list(&self, query: &ItemQuery) -> Result<Vec<Item>, StoreError>;
}

#[async_trait::async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert(&self, request: Request) -> Result<Request, StoreError>;

    async fn get(&self, id: RequestId) -> Result<Option<Request>, StoreError>;

    /// Newest `request_date` first.
    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, StoreError>;

    /// Write `next` only if the stored status still equals `expected`.
    async fn compare_and_set_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        next: RequestStatus,
        now: DateTime<Utc>,
    ) -> Result<StatusWrite, StoreError>;

    /// Returns the removed record.
    async fn delete(&self, id: RequestId) -> Result<Option<Request>, StoreError>;
}

#[async_trait::async_trait]
impl<S> ItemStore for Arc<S>
where
    S: ItemStore + ?Sized,
{
    async fn insert(&self, item: Item) -> Result<Item, StoreError> {
        (**self).insert(item).await
    }

    async fn insert_many(&self, items: Vec<Item>) -> Result<Vec<Item>, StoreError> {
        (**self).insert_many(items).await
    }

    async fn get(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        (**self).get(id).await
    }

    async fn find_by_code(&self, item_code: &str) -> Result<Option<Item>, StoreError> {
        (**self).find_by_code(item_code).await
    }

    async fn update(
        &self,
        id: ItemId,
        patch: &ItemPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError> {
        (**self).update(id, patch, now).await
    }

    async fn set_active(
        &self,
        id: ItemId,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError> {
        (**self).set_active(id, is_active, now).await
    }

    async fn adjust_quantity(&self, id: ItemId, delta: i64) -> Result<Option<Item>, StoreError> {
        (**self).adjust_quantity(id, delta).await
    }

    async fn delete(&self, id: ItemId) -> Result<bool, StoreError> {
        (**self).delete(id).await
    }

    async fn list(&self, query: &ItemQuery) -> Result<Vec<Item>, StoreError> {
        (**self).list(query).await
    }
}

#[async_trait::async_trait]
impl<S> RequestStore for Arc<S>
where
    S: RequestStore + ?Sized,
{
    async fn insert(&self, request: Request) -> Result<Request, StoreError> {
        (**self).insert(request).await
    }

    async fn get(&self, id: RequestId) -> Result<Option<Request>, StoreError> {
        (**self).get(id).await
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, StoreError> {
        (**self).list(filter).await
    }

    async fn compare_and_set_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        next: RequestStatus,
        now: DateTime<Utc>,
    ) -> Result<StatusWrite, StoreError> {
        (**self).compare_and_set_status(id, expected, next, now).await
    }

    async fn delete(&self, id: RequestId) -> Result<Option<Request>, StoreError> {
        (**self).delete(id).await
    }
}

/// Bound a store call. Expiry becomes `StoreError::Indeterminate`: the
/// wrapped call may still have completed on the store side.
pub async fn timed<T, F>(limit: Duration, operation: &'static str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Indeterminate(format!(
            "{operation} timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timed_maps_expiry_to_indeterminate() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, StoreError>(())
        };
        let err = timed(Duration::from_millis(50), "get_item", slow)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Indeterminate("get_item timed out after 50ms".to_string())
        );
        assert!(err.outcome_unknown());
        assert!(!StoreError::Unavailable("pool closed".to_string()).outcome_unknown());
    }

    #[tokio::test]
    async fn timed_passes_results_through() {
        let ok = timed(Duration::from_secs(1), "noop", async { Ok::<_, StoreError>(7) }).await;
        assert_eq!(ok, Ok(7));

        let err = timed(Duration::from_secs(1), "noop", async {
            Err::<(), _>(StoreError::Backend("boom".to_string()))
        })
        .await;
        assert_eq!(err, Err(StoreError::Backend("boom".to_string())));
    }
}
