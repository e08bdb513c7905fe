//! PostgreSQL-backed stores.
//!
//! ## Error Mapping
//!
//! | SQLx error | StoreError |
//! |------------|------------|
//! | Database, code `23505` (unique violation on `item_code`) | `DuplicateKey` |
//! | `PoolClosed`, `PoolTimedOut` | `Unavailable` |
//! | `Io` (connection lost mid-statement) | `Indeterminate` |
//! | `ColumnDecode`, `Decode`, `ColumnNotFound`, bad status text | `Corrupt` |
//! | anything else | `Backend` |
//!
//! ## Atomicity
//!
//! Quantity deltas are one `UPDATE ... SET item_quantity = item_quantity + $2`
//! and status writes are one `UPDATE ... WHERE status = $expected`, so neither
//! needs an explicit transaction. Bulk import runs in a transaction.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgDatabaseError, PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use kitroom_core::{ItemId, RequestId, UserId};
use kitroom_inventory::{Item, ItemPatch, ItemQuery};
use kitroom_requests::{Request, RequestFilter, RequestStatus};

use super::{ItemStore, RequestStore, StatusWrite, StoreError};
use crate::config::StoreConfig;

const SCHEMA: &str = include_str!("schema.sql");

const ITEM_COLUMNS: &str =
    "id, item_name, item_quantity, sports_name, item_code, is_active, created_at, updated_at";

const REQUEST_COLUMNS: &str = "id, user_id, user_name, user_email, item_id, item_name, item_code, \
     status, request_date, updated_at";

/// Open a pool and make sure the schema exists.
pub async fn connect(url: &str, config: &StoreConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.store_timeout.max(Duration::from_secs(1)))
        .connect(url)
        .await
        .map_err(|e| map_sqlx_error("connect", e, None))?;
    apply_schema(&pool).await?;
    Ok(pool)
}

/// Idempotent; safe to run on every start.
#[instrument(skip(pool), err)]
async fn apply_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("apply_schema", e, None))?;
    Ok(())
}

fn map_sqlx_error(operation: &str, err: sqlx::Error, item_code: Option<&str>) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let item_code = item_code
                    .map(str::to_string)
                    .or_else(|| {
                        db_err
                            .try_downcast_ref::<PgDatabaseError>()
                            .and_then(duplicate_code_from_detail)
                    })
                    .unwrap_or_default();
                return StoreError::DuplicateKey { item_code };
            }
            StoreError::Backend(format!(
                "database error in {operation}: {}",
                db_err.message()
            ))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("timed out acquiring a connection in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Indeterminate(format!("io error in {operation}: {e}")),
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(format!("failed to decode row in {operation}: {err}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

/// Pull the offending value out of `Key (item_code)=(BB-001) already exists.`
fn duplicate_code_from_detail(db_err: &PgDatabaseError) -> Option<String> {
    let detail = db_err.detail()?;
    let (_, rest) = detail.split_once("=(")?;
    let (code, _) = rest.split_once(')')?;
    Some(code.to_string())
}

/// Escape `LIKE` metacharacters so a search is a plain substring match.
fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

struct ItemRow {
    id: Uuid,
    item_name: String,
    item_quantity: i64,
    sports_name: String,
    item_code: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            id: row.try_get("id")?,
            item_name: row.try_get("item_name")?,
            item_quantity: row.try_get("item_quantity")?,
            sports_name: row.try_get("sports_name")?,
            item_code: row.try_get("item_code")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: ItemId::from_uuid(row.id),
            item_name: row.item_name,
            item_quantity: row.item_quantity,
            sports_name: row.sports_name,
            item_code: row.item_code,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

struct RequestRow {
    id: Uuid,
    user_id: Uuid,
    user_name: String,
    user_email: String,
    item_id: Uuid,
    item_name: String,
    item_code: String,
    status: String,
    request_date: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for RequestRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(RequestRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            user_name: row.try_get("user_name")?,
            user_email: row.try_get("user_email")?,
            item_id: row.try_get("item_id")?,
            item_name: row.try_get("item_name")?,
            item_code: row.try_get("item_code")?,
            status: row.try_get("status")?,
            request_date: row.try_get("request_date")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<RequestRow> for Request {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let status: RequestStatus = row
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("request {}: {e}", row.id)))?;
        Ok(Request {
            id: RequestId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            user_name: row.user_name,
            user_email: row.user_email,
            item_id: ItemId::from_uuid(row.item_id),
            item_name: row.item_name,
            item_code: row.item_code,
            status,
            request_date: row.request_date,
            updated_at: row.updated_at,
        })
    }
}

fn decode_item(operation: &str, row: &PgRow) -> Result<Item, StoreError> {
    ItemRow::from_row(row)
        .map(Item::from)
        .map_err(|e| map_sqlx_error(operation, e, None))
}

fn decode_request(operation: &str, row: &PgRow) -> Result<Request, StoreError> {
    RequestRow::from_row(row)
        .map_err(|e| map_sqlx_error(operation, e, None))?
        .try_into()
}

/// Items table.
#[derive(Debug, Clone)]
pub struct PostgresItemStore {
    pool: PgPool,
}

impl PostgresItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_on(conn: &mut PgConnection, item: &Item) -> Result<Item, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO items ({ITEM_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(item.id.as_uuid())
        .bind(&item.item_name)
        .bind(item.item_quantity)
        .bind(&item.sports_name)
        .bind(&item.item_code)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .fetch_one(conn)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e, Some(&item.item_code)))?;
        decode_item("insert_item", &row)
    }
}

#[async_trait::async_trait]
impl ItemStore for PostgresItemStore {
    #[instrument(skip(self, item), fields(item_id = %item.id, item_code = %item.item_code), err)]
    async fn insert(&self, item: Item) -> Result<Item, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("insert_item", e, None))?;
        Self::insert_on(&mut conn, &item).await
    }

    #[instrument(skip(self, items), fields(count = items.len()), err)]
    async fn insert_many(&self, items: Vec<Item>) -> Result<Vec<Item>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("insert_items", e, None))?;

        let mut stored = Vec::with_capacity(items.len());
        for item in &items {
            stored.push(Self::insert_on(&mut tx, item).await?);
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("insert_items", e, None))?;
        Ok(stored)
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn get(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e, None))?;
        row.as_ref().map(|r| decode_item("get_item", r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_by_code(&self, item_code: &str) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE item_code = $1"))
            .bind(item_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_item_by_code", e, None))?;
        row.as_ref()
            .map(|r| decode_item("find_item_by_code", r))
            .transpose()
    }

    #[instrument(skip(self, patch), fields(item_id = %id), err)]
    async fn update(
        &self,
        id: ItemId,
        patch: &ItemPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE items SET
                item_name = COALESCE($2, item_name),
                item_quantity = COALESCE($3, item_quantity),
                sports_name = COALESCE($4, sports_name),
                item_code = COALESCE($5, item_code),
                updated_at = $6
            WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(patch.item_name.as_deref())
        .bind(patch.item_quantity)
        .bind(patch.sports_name.as_deref())
        .bind(patch.item_code.as_deref())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_item", e, patch.item_code.as_deref()))?;
        row.as_ref().map(|r| decode_item("update_item", r)).transpose()
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn set_active(
        &self,
        id: ItemId,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE items SET is_active = $2, updated_at = $3 WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(is_active)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_item_active", e, None))?;
        row.as_ref()
            .map(|r| decode_item("set_item_active", r))
            .transpose()
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn adjust_quantity(&self, id: ItemId, delta: i64) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE items SET item_quantity = item_quantity + $2 WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("adjust_item_quantity", e, None))?;
        row.as_ref()
            .map(|r| decode_item("adjust_item_quantity", r))
            .transpose()
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn delete(&self, id: ItemId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e, None))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn list(&self, query: &ItemQuery) -> Result<Vec<Item>, StoreError> {
        let pattern = query.sport_needle().map(|needle| like_pattern(&needle));
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM items
            WHERE ($1::bool = FALSE OR is_active)
                AND ($2::text IS NULL OR sports_name ILIKE $2 ESCAPE '\')
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(query.active_only)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e, None))?;
        rows.iter().map(|r| decode_item("list_items", r)).collect()
    }
}

/// Requests table.
#[derive(Debug, Clone)]
pub struct PostgresRequestStore {
    pool: PgPool,
}

impl PostgresRequestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RequestStore for PostgresRequestStore {
    #[instrument(
        skip(self, request),
        fields(request_id = %request.id, item_id = %request.item_id),
        err
    )]
    async fn insert(&self, request: Request) -> Result<Request, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO requests ({REQUEST_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(request.id.as_uuid())
        .bind(request.user_id.as_uuid())
        .bind(&request.user_name)
        .bind(&request.user_email)
        .bind(request.item_id.as_uuid())
        .bind(&request.item_name)
        .bind(&request.item_code)
        .bind(request.status.as_str())
        .bind(request.request_date)
        .bind(request.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_request", e, None))?;
        decode_request("insert_request", &row)
    }

    #[instrument(skip(self), fields(request_id = %id), err)]
    async fn get(&self, id: RequestId) -> Result<Option<Request>, StoreError> {
        let row = sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_request", e, None))?;
        row.as_ref()
            .map(|r| decode_request("get_request", r))
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM requests
            WHERE ($1::text IS NULL OR status = $1)
                AND ($2::uuid IS NULL OR user_id = $2)
                AND ($3::uuid IS NULL OR item_id = $3)
            ORDER BY request_date DESC, id DESC
            "#
        ))
        .bind(filter.status.map(RequestStatus::as_str))
        .bind(filter.user_id.map(|id| *id.as_uuid()))
        .bind(filter.item_id.map(|id| *id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_requests", e, None))?;
        rows.iter()
            .map(|r| decode_request("list_requests", r))
            .collect()
    }

    #[instrument(skip(self), fields(request_id = %id, expected = %expected, next = %next), err)]
    async fn compare_and_set_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        next: RequestStatus,
        now: DateTime<Utc>,
    ) -> Result<StatusWrite, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE requests SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = $2 \
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_request_status", e, None))?;

        if let Some(row) = row {
            return Ok(StatusWrite::Applied(decode_request("set_request_status", &row)?));
        }

        let exists: bool =
            sqlx::query("SELECT EXISTS (SELECT 1 FROM requests WHERE id = $1) AS present")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .and_then(|row| row.try_get::<bool, _>("present"))
                .map_err(|e| map_sqlx_error("set_request_status", e, None))?;

        Ok(if exists {
            StatusWrite::Stale
        } else {
            StatusWrite::Missing
        })
    }

    #[instrument(skip(self), fields(request_id = %id), err)]
    async fn delete(&self, id: RequestId) -> Result<Option<Request>, StoreError> {
        let row = sqlx::query(&format!(
            "DELETE FROM requests WHERE id = $1 RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_request", e, None))?;
        row.as_ref()
            .map(|r| decode_request("delete_request", r))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("tennis"), "%tennis%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn pool_errors_are_unavailable() {
        assert!(matches!(
            map_sqlx_error("get_item", sqlx::Error::PoolTimedOut, None),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error("get_item", sqlx::Error::PoolClosed, None),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn lost_connections_leave_the_outcome_unknown() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = map_sqlx_error("adjust_item_quantity", sqlx::Error::Io(io), None);
        assert!(err.outcome_unknown(), "{err:?}");
    }

    #[test]
    fn missing_columns_are_corrupt_rows() {
        let err = map_sqlx_error("get_item", sqlx::Error::ColumnNotFound("item_code".into()), None);
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn schema_is_idempotent_sql() {
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let statement = statement
                .lines()
                .filter(|l| !l.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join(" ");
            assert!(statement.contains("IF NOT EXISTS"), "{statement}");
        }
    }
}
