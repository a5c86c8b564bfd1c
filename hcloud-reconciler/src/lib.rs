pub mod audit;
pub mod convert;
pub mod error;
pub mod labels;
pub mod manager;
pub mod provider;
pub mod reconciler;
pub mod spec;
pub mod store;

pub use audit::ReconcileAuditLogger;
pub use error::{ErrorClass, ReconcileError};
pub use manager::{Manager, ManagerOptions};
pub use provider::{ActionWaiter, Cloud, CloudApi, HcloudClient};
pub use reconciler::{Controller, reconcile_once};
pub use spec::{Managed, Observed, ResourceSpec};
pub use store::{FileStore, MemoryStore, ResourceStore, StoreError};
