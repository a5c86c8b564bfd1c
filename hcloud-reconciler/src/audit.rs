//! Audit logging of provider-side changes.
//!
//! Every resource created, changed or removed at the provider is recorded on
//! the `audit` tracing target, so the events can be routed apart from the
//! regular diagnostics.

use tracing::{info, warn};

use crate::error::ReconcileError;
use crate::provider::ResourceId;

/// Audit logger with reconcile-specific methods.
#[derive(Debug, Clone)]
pub struct ReconcileAuditLogger {
    component: &'static str,
    enabled: bool,
}

impl ReconcileAuditLogger {
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            enabled: true,
        }
    }

    /// Create a noop audit logger (for testing)
    pub fn new_noop() -> Self {
        Self {
            component: "noop",
            enabled: false,
        }
    }

    // === Lifecycle Events ===

    pub fn created(&self, kind: &str, name: &str, id: ResourceId) {
        if self.enabled {
            info!(target: "audit", component = self.component, kind, name, id, "{} '{}' created", kind, name);
        }
    }

    pub fn updated(&self, kind: &str, name: &str, id: ResourceId) {
        if self.enabled {
            info!(target: "audit", component = self.component, kind, name, id, "{} '{}' updated", kind, name);
        }
    }

    pub fn deleted(&self, kind: &str, name: &str, id: Option<ResourceId>) {
        if self.enabled {
            info!(target: "audit", component = self.component, kind, name, id, "{} '{}' deleted", kind, name);
        }
    }

    // === Failures ===

    pub fn failed(&self, kind: &str, name: &str, error: &ReconcileError) {
        if self.enabled {
            warn!(
                target: "audit",
                component = self.component,
                kind,
                name,
                class = ?error.class(),
                retryable = error.is_retryable(),
                "{} '{}' failed: {}",
                kind,
                name,
                error
            );
        }
    }
}
