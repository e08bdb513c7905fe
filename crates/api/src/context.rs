use kitroom_auth::{Permission, Role, SessionClaims};
use kitroom_core::UserId;

/// Authenticated caller for one HTTP request.
///
/// Built by the auth middleware from a validated token and handed to
/// handlers through request extensions. Immutable for the request's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    user_id: UserId,
    name: String,
    email: String,
    role: Role,
}

impl AuthContext {
    pub fn new(
        user_id: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            user_id,
            name: name.into(),
            email: email.into(),
            role,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.role.grants(permission)
    }
}

impl From<SessionClaims> for AuthContext {
    fn from(claims: SessionClaims) -> Self {
        Self::new(claims.sub, claims.name, claims.email, claims.role)
    }
}
