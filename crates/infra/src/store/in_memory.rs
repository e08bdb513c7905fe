use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use kitroom_core::{Entity, ItemId, RequestId};
use kitroom_inventory::{Item, ItemPatch, ItemQuery};
use kitroom_requests::{Request, RequestFilter, RequestStatus};

use super::{ItemStore, RequestStore, StatusWrite, StoreError};

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

/// Records keyed by their own identifier.
type Table<E> = HashMap<<E as Entity>::Id, E>;

fn put<E: Entity + Clone>(table: &mut Table<E>, record: &E) {
    table.insert(*record.id(), record.clone());
}

/// In-memory item store.
///
/// Each call holds the lock for its whole read-check-write, so uniqueness
/// checks and quantity deltas are linearizable per call.
#[derive(Debug, Default)]
pub struct InMemoryItemStore {
    items: RwLock<Table<Item>>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn code_taken(items: &Table<Item>, code: &str, except: Option<ItemId>) -> bool {
        items
            .values()
            .any(|i| i.item_code == code && Some(i.id) != except)
    }
}

#[async_trait::async_trait]
impl ItemStore for InMemoryItemStore {
    async fn insert(&self, item: Item) -> Result<Item, StoreError> {
        let mut items = self.items.write().map_err(|_| poisoned())?;
        if Self::code_taken(&items, &item.item_code, None) {
            return Err(StoreError::DuplicateKey {
                item_code: item.item_code,
            });
        }
        put(&mut *items, &item);
        Ok(item)
    }

    async fn insert_many(&self, batch: Vec<Item>) -> Result<Vec<Item>, StoreError> {
        let mut items = self.items.write().map_err(|_| poisoned())?;

        let mut seen = HashSet::with_capacity(batch.len());
        for item in &batch {
            if !seen.insert(item.item_code.as_str())
                || Self::code_taken(&items, &item.item_code, None)
            {
                return Err(StoreError::DuplicateKey {
                    item_code: item.item_code.clone(),
                });
            }
        }

        for item in &batch {
            put(&mut *items, item);
        }
        Ok(batch)
    }

    async fn get(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let items = self.items.read().map_err(|_| poisoned())?;
        Ok(items.get(&id).cloned())
    }

    async fn find_by_code(&self, item_code: &str) -> Result<Option<Item>, StoreError> {
        let items = self.items.read().map_err(|_| poisoned())?;
        Ok(items.values().find(|i| i.item_code == item_code).cloned())
    }

    async fn update(
        &self,
        id: ItemId,
        patch: &ItemPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError> {
        let mut items = self.items.write().map_err(|_| poisoned())?;
        if let Some(code) = &patch.item_code {
            if Self::code_taken(&items, code, Some(id)) {
                return Err(StoreError::DuplicateKey {
                    item_code: code.clone(),
                });
            }
        }
        Ok(items.get_mut(&id).map(|item| {
            patch.apply_to(item, now);
            item.clone()
        }))
    }

    async fn set_active(
        &self,
        id: ItemId,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError> {
        let mut items = self.items.write().map_err(|_| poisoned())?;
        Ok(items.get_mut(&id).map(|item| {
            item.is_active = is_active;
            item.updated_at = now;
            item.clone()
        }))
    }

    async fn adjust_quantity(&self, id: ItemId, delta: i64) -> Result<Option<Item>, StoreError> {
        let mut items = self.items.write().map_err(|_| poisoned())?;
        Ok(items.get_mut(&id).map(|item| {
            item.item_quantity += delta;
            item.clone()
        }))
    }

    async fn delete(&self, id: ItemId) -> Result<bool, StoreError> {
        let mut items = self.items.write().map_err(|_| poisoned())?;
        Ok(items.remove(&id).is_some())
    }

    async fn list(&self, query: &ItemQuery) -> Result<Vec<Item>, StoreError> {
        let items = self.items.read().map_err(|_| poisoned())?;
        Ok(query.apply(items.values().cloned()))
    }
}

/// In-memory request store.
#[derive(Debug, Default)]
pub struct InMemoryRequestStore {
    requests: RwLock<Table<Request>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn insert(&self, request: Request) -> Result<Request, StoreError> {
        let mut requests = self.requests.write().map_err(|_| poisoned())?;
        put(&mut *requests, &request);
        Ok(request)
    }

    async fn get(&self, id: RequestId) -> Result<Option<Request>, StoreError> {
        let requests = self.requests.read().map_err(|_| poisoned())?;
        Ok(requests.get(&id).cloned())
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, StoreError> {
        let requests = self.requests.read().map_err(|_| poisoned())?;
        let mut out: Vec<Request> = requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.request_date
                .cmp(&a.request_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(out)
    }

    async fn compare_and_set_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        next: RequestStatus,
        now: DateTime<Utc>,
    ) -> Result<StatusWrite, StoreError> {
        let mut requests = self.requests.write().map_err(|_| poisoned())?;
        let Some(request) = requests.get_mut(&id) else {
            return Ok(StatusWrite::Missing);
        };
        if request.status != expected {
            return Ok(StatusWrite::Stale);
        }
        request.status = next;
        request.updated_at = now;
        Ok(StatusWrite::Applied(request.clone()))
    }

    async fn delete(&self, id: RequestId) -> Result<Option<Request>, StoreError> {
        let mut requests = self.requests.write().map_err(|_| poisoned())?;
        Ok(requests.remove(&id))
    }
}
