use thiserror::Error;

use crate::{Permission, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(Permission),
}

/// Authorize a role for one permission.
///
/// - No IO
/// - No panics
pub fn authorize(role: Role, required: Permission) -> Result<(), AuthzError> {
    if role.grants(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required))
    }
}
