//! `kitroom-auth`: session identity and role-based permission checks.
//!
//! Decoupled from HTTP and storage. The API layer decodes a bearer token
//! through [`JwtValidator`] and asks [`authorize`] before touching a service.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod roles;

pub use authorize::{AuthzError, authorize};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use permissions::Permission;
pub use roles::Role;
