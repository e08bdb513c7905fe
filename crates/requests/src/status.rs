use core::str::FromStr;

use serde::{Deserialize, Serialize};

use kitroom_core::DomainError;

/// Request status lifecycle.
///
/// `Pending` is the only initial state. No state is terminal: any of the five
/// values may be written over any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Declined,
    Issued,
    Submitted,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 5] = [
        RequestStatus::Pending,
        RequestStatus::Approved,
        RequestStatus::Declined,
        RequestStatus::Issued,
        RequestStatus::Submitted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Declined => "declined",
            RequestStatus::Issued => "issued",
            RequestStatus::Submitted => "submitted",
        }
    }

    /// Whether a unit of the referenced item is checked out in this state.
    pub fn holds_unit(self) -> bool {
        self == RequestStatus::Issued
    }
}

impl core::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = DomainError;

    /// Exact, lowercase match only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::invalid_status(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_parses_from_its_name() {
        for status in RequestStatus::ALL {
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_and_miscased_values_are_invalid_status() {
        for raw in ["", "returned", "Issued", " pending"] {
            assert_eq!(
                raw.parse::<RequestStatus>().unwrap_err(),
                DomainError::invalid_status(raw)
            );
        }
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&RequestStatus::Submitted).unwrap();
        assert_eq!(json, "\"submitted\"");
        let back: RequestStatus = serde_json::from_str("\"declined\"").unwrap();
        assert_eq!(back, RequestStatus::Declined);
    }

    #[test]
    fn only_issued_holds_a_unit() {
        let holding: Vec<_> = RequestStatus::ALL.into_iter().filter(|s| s.holds_unit()).collect();
        assert_eq!(holding, vec![RequestStatus::Issued]);
    }
}
