use thiserror::Error;

use crate::gateway::{MutationError, Notice};
use crate::remote::RemoteError;

#[derive(Error, Debug)]
pub enum DashviewError {
    #[error("Not in a dashview project. Run 'dashview init' first.")]
    NotInitialized,

    #[error("Already initialized. Remove .dashview/ to reinitialize.")]
    AlreadyInitialized,

    #[error("No actor configured. Pass --actor, set DASHVIEW_ACTOR or run 'dashview init --actor <id>'.")]
    NoActor,

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Id prefix '{0}' matches {1} records")]
    AmbiguousId(String, usize),

    #[error("Invalid record kind: {0}")]
    InvalidKind(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Load failed: {0}")]
    LoadFailed(String),

    #[error("{0}")]
    MutationFailed(Notice),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, DashviewError>;
