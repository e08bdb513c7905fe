//! Inventory compensation for request status changes.
//!
//! Item quantity tracks units currently not checked out. Crossing into
//! `issued` consumes one unit, crossing out of it returns one; every other
//! change leaves inventory alone.
//!
//! | previous   | new                          | delta |
//! |------------|------------------------------|-------|
//! | ≠ issued   | issued                       | −1    |
//! | issued     | submitted                    | +1    |
//! | issued     | anything but issued/submitted| +1    |
//! | otherwise  |                              | 0     |
//!
//! Rows are evaluated top to bottom, first match wins.

use serde::{Deserialize, Serialize};

use crate::status::RequestStatus;

/// The inventory adjustment a single status change requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compensation {
    /// Transition does not cross the `issued` boundary.
    None,
    /// Entering `issued`: one unit leaves available inventory.
    CheckOut,
    /// `issued` → `submitted`: the unit comes back.
    Return,
    /// `issued` → any other status: early return / reversion.
    Revert,
}

impl Compensation {
    pub fn for_transition(previous: RequestStatus, next: RequestStatus) -> Self {
        use RequestStatus::{Issued, Submitted};

        match (previous, next) {
            (p, Issued) if p != Issued => Compensation::CheckOut,
            (Issued, Submitted) => Compensation::Return,
            (Issued, n) if n != Issued && n != Submitted => Compensation::Revert,
            _ => Compensation::None,
        }
    }

    /// Signed quantity change applied to the referenced item.
    pub fn delta(self) -> i64 {
        match self {
            Compensation::None => 0,
            Compensation::CheckOut => -1,
            Compensation::Return | Compensation::Revert => 1,
        }
    }

    pub fn is_none(self) -> bool {
        self == Compensation::None
    }
}
