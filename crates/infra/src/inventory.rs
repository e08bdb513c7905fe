//! Item catalog service.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use kitroom_core::{DomainError, ItemId};
use kitroom_inventory::{Item, ItemPatch, ItemQuery, NewItem};

use crate::error::ServiceError;
use crate::lifecycle::LifecyclePolicy;
use crate::store::{ItemStore, StoreError, timed};

/// Outcome of a bulk import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    /// One `Row N: ...` message per rejected row.
    pub skipped: Vec<String>,
}

/// Spreadsheet row number of the `index`-th data row (row 1 is the header).
fn row_number(index: usize) -> usize {
    index + 2
}

#[derive(Debug, Clone)]
pub struct InventoryService<S> {
    items: S,
    store_timeout: std::time::Duration,
}

impl<S> InventoryService<S>
where
    S: ItemStore,
{
    pub fn new(items: S, policy: LifecyclePolicy) -> Self {
        Self {
            items,
            store_timeout: policy.store_timeout,
        }
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, StoreError>>,
    {
        timed(self.store_timeout, operation, fut).await
    }

    #[instrument(skip(self, input), fields(item_code = %input.item_code.trim()), err)]
    pub async fn create(&self, input: NewItem) -> Result<Item, ServiceError> {
        let item = input.into_item(ItemId::new(), Utc::now())?;
        let stored = self.bounded("insert_item", self.items.insert(item)).await?;
        info!(
            item_id = %stored.id,
            item_code = %stored.item_code,
            quantity = stored.item_quantity,
            "item created"
        );
        Ok(stored)
    }

    /// Bulk insert. Invalid rows are skipped and reported; a duplicate code
    /// anywhere rejects the whole batch.
    #[instrument(skip(self, rows), fields(rows = rows.len()), err)]
    pub async fn import(&self, rows: Vec<NewItem>) -> Result<ImportReport, ServiceError> {
        if rows.is_empty() {
            return Err(ServiceError::Validation("no items to import".to_string()));
        }

        let now = Utc::now();
        let mut valid = Vec::with_capacity(rows.len());
        let mut skipped = Vec::new();

        for (index, row) in rows.into_iter().enumerate() {
            let parsed = match row.item_quantity {
                Some(q) if q <= 0 => Err(DomainError::validation(
                    "itemQuantity must be a positive number",
                )),
                _ => row.into_item(ItemId::new(), now),
            };
            match parsed {
                Ok(item) => valid.push(item),
                Err(e) => skipped.push(format!("Row {}: {}", row_number(index), reason(&e))),
            }
        }

        if valid.is_empty() {
            let first = skipped
                .into_iter()
                .next()
                .unwrap_or_else(|| "no valid items to import".to_string());
            return Err(ServiceError::Validation(first));
        }

        let stored = self
            .bounded("insert_items", self.items.insert_many(valid))
            .await?;
        info!(imported = stored.len(), skipped = skipped.len(), "items imported");

        Ok(ImportReport {
            imported: stored.len(),
            skipped,
        })
    }

    pub async fn get(&self, id: ItemId) -> Result<Item, ServiceError> {
        self.bounded("get_item", self.items.get(id))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("item {id}")))
    }

    #[instrument(skip(self, patch), fields(item_id = %id), err)]
    pub async fn update(&self, id: ItemId, patch: ItemPatch) -> Result<Item, ServiceError> {
        let patch = patch.validated()?;
        if patch.is_empty() {
            return self.get(id).await;
        }
        self.bounded("update_item", self.items.update(id, &patch, Utc::now()))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("item {id}")))
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    pub async fn set_active(&self, id: ItemId, is_active: bool) -> Result<Item, ServiceError> {
        self.bounded("set_item_active", self.items.set_active(id, is_active, Utc::now()))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("item {id}")))
    }

    /// Requests referencing the item are kept.
    #[instrument(skip(self), fields(item_id = %id), err)]
    pub async fn delete(&self, id: ItemId) -> Result<(), ServiceError> {
        if self.bounded("delete_item", self.items.delete(id)).await? {
            info!(item_id = %id, "item deleted");
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!("item {id}")))
        }
    }

    pub async fn list(&self, query: &ItemQuery) -> Result<Vec<Item>, ServiceError> {
        Ok(self.bounded("list_items", self.items.list(query)).await?)
    }
}

/// Row messages carry the bare reason, not the error-kind prefix.
fn reason(err: &DomainError) -> String {
    match err {
        DomainError::Validation(msg) | DomainError::InvalidId(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::store::InMemoryItemStore;

    fn service() -> InventoryService<Arc<InMemoryItemStore>> {
        InventoryService::new(Arc::new(InMemoryItemStore::new()), LifecyclePolicy::default())
    }

    fn row(code: &str, qty: Option<i64>) -> NewItem {
        NewItem {
            item_name: "Shuttlecock".to_string(),
            item_quantity: qty,
            sports_name: "Badminton".to_string(),
            item_code: code.to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_create_fails_and_keeps_first() {
        let svc = service();
        let first = svc
            .create(NewItem::new("Basketball", 5, "Basketball", "BB-001"))
            .await
            .unwrap();
        let err = svc
            .create(NewItem::new("Other", 1, "Basketball", "BB-001"))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::DuplicateKey("BB-001".to_string()));
        assert_eq!(svc.get(first.id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn create_reports_missing_fields() {
        let err = service().create(NewItem::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(msg) if msg.contains("itemCode")));
    }

    #[tokio::test]
    async fn import_skips_bad_rows_with_sheet_row_numbers() {
        let svc = service();
        let report = svc
            .import(vec![row("BD-1", Some(4)), row("BD-2", Some(0)), row("", Some(1))])
            .await
            .unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped[0].starts_with("Row 3: "), "{:?}", report.skipped);
        assert!(report.skipped[1].starts_with("Row 4: "), "{:?}", report.skipped);
    }

    #[tokio::test]
    async fn import_with_no_valid_rows_is_validation() {
        let err = service().import(vec![row("BD-1", Some(-2))]).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::Validation("Row 2: itemQuantity must be a positive number".to_string())
        );
        assert!(matches!(
            service().import(Vec::new()).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn import_duplicate_rejects_whole_batch() {
        let svc = service();
        svc.create(NewItem::new("Net", 1, "Badminton", "BD-9")).await.unwrap();
        let err = svc
            .import(vec![row("BD-1", Some(1)), row("BD-9", Some(1))])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateKey(_)));
        assert_eq!(svc.list(&ItemQuery::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_validates_and_rechecks_code() {
        let svc = service();
        let a = svc.create(NewItem::new("A", 1, "Hockey", "HK-1")).await.unwrap();
        svc.create(NewItem::new("B", 1, "Hockey", "HK-2")).await.unwrap();

        let negative = ItemPatch {
            item_quantity: Some(-1),
            ..ItemPatch::default()
        };
        assert!(matches!(svc.update(a.id, negative).await, Err(ServiceError::Validation(_))));

        let steal = ItemPatch {
            item_code: Some("HK-2".to_string()),
            ..ItemPatch::default()
        };
        assert!(matches!(svc.update(a.id, steal).await, Err(ServiceError::DuplicateKey(_))));

        let rename = ItemPatch {
            item_name: Some("Stick".to_string()),
            ..ItemPatch::default()
        };
        assert_eq!(svc.update(a.id, rename).await.unwrap().item_name, "Stick");
    }

    #[tokio::test]
    async fn deactivated_items_are_hidden_from_requesters() {
        let svc = service();
        let a = svc.create(NewItem::new("Ball", 2, "Volleyball", "VB-1")).await.unwrap();
        svc.create(NewItem::new("Net", 1, "Volleyball", "VB-2")).await.unwrap();

        let off = svc.set_active(a.id, false).await.unwrap();
        assert!(!off.is_active);

        let visible = svc.list(&ItemQuery::requestable()).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].item_code, "VB-2");
        assert_eq!(svc.list(&ItemQuery::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_items_are_not_found() {
        let svc = service();
        let id = ItemId::new();
        assert!(matches!(svc.get(id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.delete(id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.set_active(id, true).await, Err(ServiceError::NotFound(_))));
    }
}
