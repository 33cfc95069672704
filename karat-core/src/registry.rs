use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::store::{DocumentStore, StoreError, StoreResult};
use crate::tenant::{ConnectionParams, TenantId};

/// Builds a live store handle from connection parameters.
pub trait TenantConnector: Send + Sync {
    fn connect(&self, params: &ConnectionParams) -> StoreResult<Arc<dyn DocumentStore>>;
}

/// A live connection to one tenant's store plus the parameters it was
/// built from.
#[derive(Clone)]
pub struct TenantHandle {
    params: Arc<ConnectionParams>,
    store: Arc<dyn DocumentStore>,
}

impl TenantHandle {
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    pub fn tenant_id(&self) -> TenantId {
        self.params.tenant_id()
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }
}

impl fmt::Debug for TenantHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantHandle")
            .field("tenant", &self.params.project_id)
            .finish_non_exhaustive()
    }
}

/// Process-wide cache of the tenant handle.
///
/// The first successful [`resolve`](Self::resolve) wins for the lifetime
/// of the registry: later calls return the cached handle even when their
/// parameters name a different tenant. Feature modules rely on
/// [`require`](Self::require) returning the same handle for the whole
/// run.
pub struct TenantConnectionRegistry {
    connector: Arc<dyn TenantConnector>,
    slot: RwLock<Option<TenantHandle>>,
}

impl TenantConnectionRegistry {
    pub fn new(connector: Arc<dyn TenantConnector>) -> Self {
        Self {
            connector,
            slot: RwLock::new(None),
        }
    }

    /// Return the cached handle, building it from `params` on first use.
    pub fn resolve(&self, params: &ConnectionParams) -> StoreResult<TenantHandle> {
        if let Some(handle) = self.slot.read().as_ref() {
            Self::note_mismatch(handle, params);
            return Ok(handle.clone());
        }

        let mut slot = self.slot.write();
        if let Some(handle) = slot.as_ref() {
            Self::note_mismatch(handle, params);
            return Ok(handle.clone());
        }

        let store = self.connector.connect(params)?;
        let handle = TenantHandle {
            params: Arc::new(params.clone()),
            store,
        };
        info!(tenant = %handle.tenant_id(), shop = %params.shop_name, "tenant connection established");
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// The cached handle, if any resolution has succeeded.
    pub fn handle(&self) -> Option<TenantHandle> {
        self.slot.read().clone()
    }

    /// The cached handle, or `TenantNotInitialized`.
    pub fn require(&self) -> StoreResult<TenantHandle> {
        self.handle().ok_or(StoreError::TenantNotInitialized)
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.read().is_some()
    }

    fn note_mismatch(handle: &TenantHandle, requested: &ConnectionParams) {
        if handle.params() != requested {
            warn!(
                bound = %handle.params().project_id,
                requested = %requested.project_id,
                "tenant connection already bound; keeping the first tenant for this process"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConnector;

    fn params(project: &str) -> ConnectionParams {
        ConnectionParams::new(format!("key-{project}"), project)
    }

    #[test]
    fn first_resolution_wins() {
        let connector = Arc::new(MemoryConnector::new());
        let registry = TenantConnectionRegistry::new(connector.clone());

        let a = registry.resolve(&params("shop-a")).unwrap();
        let b = registry.resolve(&params("shop-b")).unwrap();

        assert_eq!(a.tenant_id(), TenantId("shop-a".into()));
        assert_eq!(b.tenant_id(), TenantId("shop-a".into()));
        assert_eq!(registry.require().unwrap().params().project_id, "shop-a");
        assert_eq!(connector.connects(), 1);
    }

    #[test]
    fn require_before_resolve_fails() {
        let registry = TenantConnectionRegistry::new(Arc::new(MemoryConnector::new()));
        assert!(registry.handle().is_none());
        assert!(matches!(registry.require(), Err(StoreError::TenantNotInitialized)));
    }

    #[test]
    fn failed_connect_leaves_registry_empty() {
        let registry = TenantConnectionRegistry::new(Arc::new(MemoryConnector::new()));
        assert!(registry.resolve(&params("")).is_err());
        assert!(!registry.is_resolved());
        assert!(registry.resolve(&params("shop-a")).is_ok());
    }
}
