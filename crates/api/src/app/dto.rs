use serde::{Deserialize, Serialize};

use kitroom_infra::{PartialFailureWarning, TransitionOutcome};
use kitroom_inventory::NewItem;
use kitroom_requests::{Request, RequestStatus};

// -------------------------
// Request DTOs
// -------------------------

/// `PUT /requests/{id}`. A missing status is reported as an invalid one.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListRequestsQuery {
    pub status: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListItemsQuery {
    pub sport: Option<String>,
    pub active_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImportItemsRequest {
    pub items: Vec<NewItem>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    pub request: Request,
    pub previous_status: RequestStatus,
    pub inventory_delta: i64,
    pub warning: Option<PartialFailureWarning>,
}

impl From<TransitionOutcome> for TransitionResponse {
    fn from(outcome: TransitionOutcome) -> Self {
        Self {
            inventory_delta: outcome.inventory_delta(),
            request: outcome.request,
            previous_status: outcome.previous_status,
            warning: outcome.warning,
        }
    }
}
