use thiserror::Error;
use uuid::Uuid;

use super::MutationKind;
use crate::remote::RemoteError;

/// Local checks that fail before any request is sent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("Invalid {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    #[error("Cannot change status from {from} to {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Sign in required")]
    ActorRequired,

    #[error("Record {0} is sample data and cannot be changed")]
    FixtureRecord(Uuid),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Another {kind} is already in progress")]
    Busy { kind: MutationKind },

    /// The target is not in the store.
    #[error("Record not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The owning view went away before the response arrived.
    #[error("View is no longer available")]
    Detached,
}

impl MutationError {
    /// Text suitable for a failure notice, if there is anything better than
    /// a generic message.
    pub fn reason(&self) -> Option<String> {
        match self {
            MutationError::Remote(remote) => remote.reason(),
            MutationError::Detached => None,
            other => Some(other.to_string()),
        }
    }

    /// True when nothing was sent to the remote service.
    pub fn is_local(&self) -> bool {
        !matches!(self, MutationError::Remote(_))
    }
}
