use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kitroom_core::{DomainError, DomainResult, Entity, ItemId, RequestId, UserId};

use crate::status::RequestStatus;

/// A user's claim against one item.
///
/// Requester and item fields are snapshots taken at creation time; they are
/// not re-synced when the user or item later changes. `item_id` is a weak
/// reference: the item may be edited or deleted independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: RequestId,
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub item_id: ItemId,
    pub item_name: String,
    pub item_code: String,
    pub status: RequestStatus,
    pub request_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Request {
    type Id = RequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Request {
    /// A freshly submitted request is always `pending`.
    pub fn open(id: RequestId, submission: ValidSubmission, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: submission.user_id,
            user_name: submission.user_name,
            user_email: submission.user_email,
            item_id: submission.item_id,
            item_name: submission.item_name,
            item_code: submission.item_code,
            status: RequestStatus::Pending,
            request_date: now,
            updated_at: now,
        }
    }
}

/// Raw request submission as received from the caller.
///
/// The requester identity is supplied by the session collaborator and taken
/// verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestSubmission {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    pub item_code: Option<String>,
}

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub item_id: ItemId,
    pub item_name: String,
    pub item_code: String,
}

impl RequestSubmission {
    pub fn validate(self) -> DomainResult<ValidSubmission> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        let fields = [
            ("userId", present(&self.user_id)),
            ("userName", present(&self.user_name)),
            ("userEmail", present(&self.user_email)),
            ("itemId", present(&self.item_id)),
            ("itemName", present(&self.item_name)),
            ("itemCode", present(&self.item_code)),
        ];

        let missing: Vec<&str> = fields
            .iter()
            .filter_map(|(name, value)| value.is_none().then_some(*name))
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let [user_id, user_name, user_email, item_id, item_name, item_code] =
            fields.map(|(_, value)| value.unwrap_or_default().to_string());

        Ok(ValidSubmission {
            user_id: user_id.parse()?,
            user_name,
            user_email,
            item_id: item_id.parse()?,
            item_name,
            item_code,
        })
    }
}

/// Listing filter for requests. Every field narrows; `None` means any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub user_id: Option<UserId>,
    pub item_id: Option<ItemId>,
}

impl RequestFilter {
    pub fn for_item(item_id: ItemId) -> Self {
        Self {
            item_id: Some(item_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, request: &Request) -> bool {
        self.status.is_none_or(|s| s == request.status)
            && self.user_id.is_none_or(|u| u == request.user_id)
            && self.item_id.is_none_or(|i| i == request.item_id)
    }
}
