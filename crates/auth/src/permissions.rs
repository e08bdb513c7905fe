use serde::{Deserialize, Serialize};

/// Permission identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "requests.submit")]
    SubmitRequests,
    /// See every user's requests, not just one's own.
    #[serde(rename = "requests.read_all")]
    ReadAllRequests,
    /// Change request status.
    #[serde(rename = "requests.review")]
    ReviewRequests,
    /// See inactive items and item history.
    #[serde(rename = "items.read_all")]
    ReadAllItems,
    #[serde(rename = "items.manage")]
    ManageItems,
}

impl Permission {
    pub const ALL: [Permission; 5] = [
        Permission::SubmitRequests,
        Permission::ReadAllRequests,
        Permission::ReviewRequests,
        Permission::ReadAllItems,
        Permission::ManageItems,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::SubmitRequests => "requests.submit",
            Permission::ReadAllRequests => "requests.read_all",
            Permission::ReviewRequests => "requests.review",
            Permission::ReadAllItems => "items.read_all",
            Permission::ManageItems => "items.manage",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
