//! karat-core: framework-agnostic core for the Karat shop console.
//!
//! Holds the pieces every other crate leans on: the config store, the
//! structured error type, tenant connection parameters, the
//! [`DocumentStore`] seam and the per-process [`TenantConnectionRegistry`].

pub mod clock;
pub mod config;
pub mod errors;
pub mod memory;
pub mod registry;
pub mod store;
pub mod tenant;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{KaratConfig, KaratConfigSnapshot};
pub use errors::{ErrorKind, KaratError, KaratResult};
pub use memory::{MemoryConnector, MemoryStore};
pub use registry::{TenantConnectionRegistry, TenantConnector, TenantHandle};
pub use store::{Document, DocumentStore, Fields, StoreError, StoreResult, WriteMode};
pub use tenant::{ConnectionParams, TenantId};
