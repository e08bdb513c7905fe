//! Infrastructure layer: persistence, configuration, and the services that
//! drive the request lifecycle and the item catalog over it.

pub mod config;
pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod store;

pub use config::{ConfigError, StoreConfig};
pub use error::ServiceError;
pub use inventory::{ImportReport, InventoryService};
pub use lifecycle::{
    ItemHistory, LifecyclePolicy, PartialFailureWarning, RequestLifecycle, TransitionOutcome,
};
pub use store::{ItemStore, RequestStore, StatusWrite, StoreError};
