//! Request transition engine.
//!
//! `set_status` is the only operation that mutates request status. Each call
//! runs read status → conditional status write → inventory delta:
//!
//! - The status write is a compare-and-swap on the status that was read, so
//!   two concurrent calls on one request cannot both compensate from the same
//!   `previous_status`. A lost race re-reads and retries, bounded by
//!   [`LifecyclePolicy::status_cas_attempts`].
//! - The inventory delta is a single atomic increment in the item store.
//! - Once the status is written it stands. A delta that still fails after
//!   [`LifecyclePolicy::compensation_retries`] extra attempts is logged and
//!   returned as a [`PartialFailureWarning`] on an otherwise successful call.
//!   A delta whose outcome is unknown (timeout, lost connection) is never
//!   retried, so a unit is never moved twice.
//!
//! Every store call is bounded by [`LifecyclePolicy::store_timeout`]. A
//! status write that times out is read back: if it landed, compensation
//! proceeds as usual.

use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use kitroom_core::{ItemId, RequestId};
use kitroom_requests::{Compensation, Request, RequestFilter, RequestStatus, RequestSubmission};

use crate::config::StoreConfig;
use crate::error::ServiceError;
use crate::store::{ItemStore, RequestStore, StatusWrite, StoreError, timed};

/// Name reported for history of an item that no longer exists.
pub const UNKNOWN_ITEM_NAME: &str = "Unknown Item";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    pub status_cas_attempts: u32,
    pub compensation_retries: u32,
    pub store_timeout: Duration,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self::from(&StoreConfig::default())
    }
}

impl From<&StoreConfig> for LifecyclePolicy {
    fn from(config: &StoreConfig) -> Self {
        Self {
            status_cas_attempts: config.status_cas_attempts.max(1),
            compensation_retries: config.compensation_retries,
            store_timeout: config.store_timeout,
        }
    }
}

/// Status committed, inventory not adjusted. Carries what an operator needs
/// to reconcile by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialFailureWarning {
    pub request_id: RequestId,
    pub item_id: ItemId,
    pub intended_delta: i64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub request: Request,
    pub previous_status: RequestStatus,
    pub compensation: Compensation,
    pub warning: Option<PartialFailureWarning>,
}

impl TransitionOutcome {
    /// Delta the transition called for, whether or not it was applied.
    pub fn inventory_delta(&self) -> i64 {
        self.compensation.delta()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemHistory {
    pub item_name: String,
    /// Most recently updated first.
    pub requests: Vec<Request>,
}

/// Request lifecycle service over an item store and a request store.
#[derive(Debug, Clone)]
pub struct RequestLifecycle<I, R> {
    items: I,
    requests: R,
    policy: LifecyclePolicy,
}

impl<I, R> RequestLifecycle<I, R>
where
    I: ItemStore,
    R: RequestStore,
{
    pub fn new(items: I, requests: R, policy: LifecyclePolicy) -> Self {
        Self {
            items,
            requests,
            policy,
        }
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, StoreError>>,
    {
        timed(self.policy.store_timeout, operation, fut).await
    }

    /// Create a request in `pending`. The item reference is not checked.
    #[instrument(skip(self, submission), err)]
    pub async fn submit(&self, submission: RequestSubmission) -> Result<Request, ServiceError> {
        let valid = submission.validate()?;
        let request = Request::open(RequestId::new(), valid, Utc::now());
        let stored = self
            .bounded("insert_request", self.requests.insert(request))
            .await?;
        info!(
            request_id = %stored.id,
            item_id = %stored.item_id,
            user_id = %stored.user_id,
            "request submitted"
        );
        Ok(stored)
    }

    pub async fn get(&self, id: RequestId) -> Result<Request, ServiceError> {
        self.bounded("get_request", self.requests.get(id))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("request {id}")))
    }

    /// Newest `request_date` first.
    pub async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, ServiceError> {
        Ok(self
            .bounded("list_requests", self.requests.list(filter))
            .await?)
    }

    /// Remove a request. Inventory is never touched, even for an `issued`
    /// request.
    #[instrument(skip(self), fields(request_id = %id), err)]
    pub async fn delete(&self, id: RequestId) -> Result<Request, ServiceError> {
        let removed = self
            .bounded("delete_request", self.requests.delete(id))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("request {id}")))?;

        if removed.status.holds_unit() {
            warn!(
                request_id = %removed.id,
                item_id = %removed.item_id,
                "deleted an issued request; the checked-out unit is not restored"
            );
        }
        Ok(removed)
    }

    /// Every request referencing `item_id`, most recently updated first.
    pub async fn item_history(&self, item_id: ItemId) -> Result<ItemHistory, ServiceError> {
        let item = self.bounded("get_item", self.items.get(item_id)).await?;
        let mut requests = self
            .bounded("list_requests", self.requests.list(&RequestFilter::for_item(item_id)))
            .await?;
        requests.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(ItemHistory {
            item_name: item
                .map(|i| i.item_name)
                .unwrap_or_else(|| UNKNOWN_ITEM_NAME.to_string()),
            requests,
        })
    }

    /// Move a request to `new_status` and apply the matching inventory
    /// compensation.
    ///
    /// Fails without side effects on an unknown status (`InvalidStatus`) or
    /// request (`NotFound`), and with `Conflict` when every compare-and-swap
    /// attempt lost to a concurrent writer.
    #[instrument(skip(self), fields(request_id = %id), err)]
    pub async fn set_status(
        &self,
        id: RequestId,
        new_status: &str,
    ) -> Result<TransitionOutcome, ServiceError> {
        let next: RequestStatus = new_status.parse()?;

        for attempt in 1..=self.policy.status_cas_attempts {
            let current = self.get(id).await?;
            let previous = current.status;

            // Microseconds, so a read-back from Postgres compares equal.
            let now = Utc::now().trunc_subsecs(6);
            let write = match self
                .bounded(
                    "set_request_status",
                    self.requests.compare_and_set_status(id, previous, next, now),
                )
                .await
            {
                Ok(write) => write,
                Err(e) if e.outcome_unknown() => {
                    self.resolve_status_write(&current, next, now, e).await?
                }
                Err(e) => return Err(e.into()),
            };

            match write {
                StatusWrite::Applied(request) => {
                    let compensation = Compensation::for_transition(previous, next);
                    let warning = self.compensate(&request, previous, compensation).await;
                    return Ok(TransitionOutcome {
                        request,
                        previous_status: previous,
                        compensation,
                        warning,
                    });
                }
                StatusWrite::Stale => {
                    debug!(
                        request_id = %id,
                        attempt,
                        expected = %previous,
                        "request status changed concurrently; retrying"
                    );
                }
                StatusWrite::Missing => {
                    return Err(ServiceError::NotFound(format!("request {id}")));
                }
            }
        }

        Err(ServiceError::Conflict(format!(
            "request {id} status kept changing concurrently ({} attempts)",
            self.policy.status_cas_attempts
        )))
    }

    async fn compensate(
        &self,
        request: &Request,
        previous: RequestStatus,
        compensation: Compensation,
    ) -> Option<PartialFailureWarning> {
        if compensation.is_none() {
            return None;
        }
        let delta = compensation.delta();
        let attempts = self.policy.compensation_retries.saturating_add(1);

        let mut last_error = None;
        for attempt in 1..=attempts {
            match self
                .bounded("adjust_item_quantity", self.items.adjust_quantity(request.item_id, delta))
                .await
            {
                Ok(Some(item)) => {
                    info!(
                        request_id = %request.id,
                        item_id = %request.item_id,
                        previous_status = %previous,
                        new_status = %request.status,
                        delta,
                        item_quantity = item.item_quantity,
                        "inventory compensated"
                    );
                    return None;
                }
                Ok(None) => {
                    warn!(
                        request_id = %request.id,
                        item_id = %request.item_id,
                        delta,
                        "referenced item no longer exists; inventory left unchanged"
                    );
                    return None;
                }
                Err(e) if e.outcome_unknown() => {
                    // Never retried: the delta may already have landed.
                    last_error = Some(StoreError::Indeterminate(format!(
                        "inventory adjustment not acknowledged, check the item quantity \
                         before reconciling ({e})"
                    )));
                    break;
                }
                Err(e) => {
                    if attempt < attempts {
                        warn!(
                            request_id = %request.id,
                            item_id = %request.item_id,
                            attempt,
                            error = %e,
                            "inventory adjustment failed; retrying"
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "inventory adjustment not attempted".to_string());
        error!(
            request_id = %request.id,
            item_id = %request.item_id,
            intended_delta = delta,
            previous_status = %previous,
            new_status = %request.status,
            reason = %reason,
            "status committed but inventory adjustment failed; reconcile manually"
        );
        Some(PartialFailureWarning {
            request_id: request.id,
            item_id: request.item_id,
            intended_delta: delta,
            reason,
        })
    }

    /// A status write timed out. Read the request back to learn whether this
    /// call's write landed.
    async fn resolve_status_write(
        &self,
        current: &Request,
        next: RequestStatus,
        now: DateTime<Utc>,
        cause: StoreError,
    ) -> Result<StatusWrite, ServiceError> {
        let intended_delta = Compensation::for_transition(current.status, next).delta();
        let stored = match self.bounded("get_request", self.requests.get(current.id)).await {
            Ok(Some(stored)) => stored,
            Ok(None) => return Ok(StatusWrite::Missing),
            Err(e) => {
                error!(
                    request_id = %current.id,
                    item_id = %current.item_id,
                    previous_status = %current.status,
                    new_status = %next,
                    intended_delta,
                    error = %e,
                    "status write outcome unknown and read-back failed; reconcile manually"
                );
                return Err(cause.into());
            }
        };

        if stored.status == next && stored.updated_at == now {
            debug!(request_id = %current.id, "timed-out status write had landed");
            return Ok(StatusWrite::Applied(stored));
        }
        if stored.status == current.status && stored.updated_at == current.updated_at {
            warn!(
                request_id = %current.id,
                error = %cause,
                "status write timed out before landing"
            );
            return Err(cause.into());
        }

        error!(
            request_id = %current.id,
            item_id = %current.item_id,
            previous_status = %current.status,
            new_status = %next,
            stored_status = %stored.status,
            intended_delta,
            error = %cause,
            "status write timed out and the request changed since; reconcile manually"
        );
        Err(cause.into())
    }
}
