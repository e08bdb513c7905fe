//! Equipment request domain module.
//!
//! The request record, its status enumeration, and the compensation table
//! that ties status changes to inventory quantity. Deterministic domain logic
//! only; the transition engine that persists all of this lives in infra.

pub mod compensation;
pub mod request;
pub mod status;

pub use compensation::Compensation;
pub use request::{Request, RequestFilter, RequestSubmission, ValidSubmission};
pub use status::RequestStatus;
