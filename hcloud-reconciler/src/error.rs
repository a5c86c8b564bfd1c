//! Reconcile error taxonomy.

use std::fmt::Display;

use thiserror::Error;

use crate::convert::ConvertError;
use crate::provider::{ActionError, ProviderError, ResourceId};
use crate::store::StoreError;

/// Coarse classification of a failed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A referenced resource does not exist.
    Reference,
    /// Caller input could not be translated into a provider request.
    Conversion,
    /// The provider could not be reached or rejected the request.
    Transport,
    /// An asynchronous provider action finished with an error.
    Action,
    /// Waiting for an action ran out of time.
    Timeout,
    /// The state store failed.
    Store,
}

/// Error returned by controllers; every variant except `Store` names the
/// operation it came from.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{op}: unknown {kind} {name}")]
    Reference {
        op: &'static str,
        kind: &'static str,
        name: String,
    },

    #[error("{op}: {source}")]
    Convert {
        op: &'static str,
        #[source]
        source: ConvertError,
    },

    #[error("{op}: {source}")]
    Provider {
        op: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error("{op}: {source}")]
    Action {
        op: &'static str,
        #[source]
        source: ActionError,
    },

    #[error("{op}: {kind} {name} has no provider id")]
    NotCreated {
        op: &'static str,
        kind: &'static str,
        name: String,
    },

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

impl ReconcileError {
    pub fn reference(op: &'static str, kind: &'static str, name: impl Display) -> Self {
        ReconcileError::Reference {
            op,
            kind,
            name: name.to_string(),
        }
    }

    /// The managed resource disappeared at the provider during a pass. The
    /// next pass observes it as absent and recreates it.
    pub fn vanished(op: &'static str, kind: &'static str, id: ResourceId) -> Self {
        ReconcileError::Provider {
            op,
            source: ProviderError::api(404, "not_found", format!("{} {} not found", kind, id)),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ReconcileError::Reference { .. } | ReconcileError::NotCreated { .. } => {
                ErrorClass::Reference
            }
            ReconcileError::Convert { .. } => ErrorClass::Conversion,
            ReconcileError::Provider { .. } => ErrorClass::Transport,
            ReconcileError::Action { source, .. } => match source {
                ActionError::Failed { .. } => ErrorClass::Action,
                ActionError::TimedOut { .. } => ErrorClass::Timeout,
                ActionError::Poll { .. } => ErrorClass::Transport,
            },
            ReconcileError::Store(_) => ErrorClass::Store,
        }
    }

    /// Whether a later pass may succeed without the caller changing anything.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self.class(),
            ErrorClass::Reference | ErrorClass::Conversion
        )
    }
}

/// Result type for reconcile operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Attach an operation name to a lower-level error.
pub trait WrapOp<T> {
    fn op(self, op: &'static str) -> Result<T>;
}

impl<T> WrapOp<T> for std::result::Result<T, ProviderError> {
    fn op(self, op: &'static str) -> Result<T> {
        self.map_err(|source| ReconcileError::Provider { op, source })
    }
}

impl<T> WrapOp<T> for std::result::Result<T, ActionError> {
    fn op(self, op: &'static str) -> Result<T> {
        self.map_err(|source| ReconcileError::Action { op, source })
    }
}

impl<T> WrapOp<T> for std::result::Result<T, ConvertError> {
    fn op(self, op: &'static str) -> Result<T> {
        self.map_err(|source| ReconcileError::Convert { op, source })
    }
}
