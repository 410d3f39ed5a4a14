//! Typed failure kinds for a migration run.
//!
//! Precondition checks return these instead of terminating the process, so
//! the binary entry point owns the exit-code and logging policy.

use thiserror::Error;

/// A single failed remote call, with enough context to locate it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport or decode failure raised by the HTTP layer.
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: ureq::Error,
    },
    /// The remote platform answered but reported a failure of its own.
    #[error("{context}: {detail}")]
    Remote { context: String, detail: String },
}

impl ApiError {
    pub fn transport(context: impl Into<String>, source: ureq::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    pub fn remote(context: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Remote {
            context: context.into(),
            detail: detail.into(),
        }
    }
}

/// Everything that can stop a migration run.
///
/// The first four variants are precondition violations checked explicitly;
/// `Api` wraps any remote failure, which is never retried or rolled back.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("process group {0} was not found on the NiFi canvas")]
    FlowNotFound(String),

    #[error("process group {0} is not under version control")]
    NotVersionControlled(String),

    #[error("process group {name} has {differences} uncommitted change(s) on the canvas")]
    UncommittedChanges { name: String, differences: usize },

    #[error("process group {name} is in an inconsistent state: {detail}")]
    InconsistentState { name: String, detail: String },

    #[error("no registry client is configured on the target NiFi")]
    NoRegistryClient,

    #[error("{label} at {url} did not become reachable within {waited_secs}s")]
    Timeout {
        label: String,
        url: String,
        waited_secs: u64,
    },

    #[error("exported definition for {name} is not valid JSON: {source}")]
    InvalidDefinition {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}
