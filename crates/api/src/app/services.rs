//! Store selection and service wiring.

use std::sync::Arc;

use kitroom_infra::store::{
    InMemoryItemStore, InMemoryRequestStore, ItemStore, PostgresItemStore, PostgresRequestStore,
    RequestStore, postgres,
};
use kitroom_infra::{InventoryService, LifecyclePolicy, RequestLifecycle, StoreConfig, StoreError};

pub type DynItemStore = Arc<dyn ItemStore>;
pub type DynRequestStore = Arc<dyn RequestStore>;

pub struct AppServices {
    pub lifecycle: RequestLifecycle<DynItemStore, DynRequestStore>,
    pub inventory: InventoryService<DynItemStore>,
}

impl AppServices {
    pub fn new(items: DynItemStore, requests: DynRequestStore, policy: LifecyclePolicy) -> Self {
        Self {
            lifecycle: RequestLifecycle::new(items.clone(), requests, policy),
            inventory: InventoryService::new(items, policy),
        }
    }

    pub fn in_memory(policy: LifecyclePolicy) -> Self {
        Self::new(
            Arc::new(InMemoryItemStore::new()),
            Arc::new(InMemoryRequestStore::new()),
            policy,
        )
    }
}

/// Postgres when `DATABASE_URL` is set, process memory otherwise.
pub async fn build_services(config: &StoreConfig) -> Result<AppServices, StoreError> {
    let policy = LifecyclePolicy::from(config);

    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; using in-memory stores");
        return Ok(AppServices::in_memory(policy));
    };

    let pool = postgres::connect(url, config).await?;
    tracing::info!(max_connections = config.max_connections, "connected to postgres");

    Ok(AppServices::new(
        Arc::new(PostgresItemStore::new(pool.clone())),
        Arc::new(PostgresRequestStore::new(pool)),
        policy,
    ))
}
