//! Error taxonomy for a generate/test/repair run.
//!
//! A failing test run is not an error: it is reported through
//! [`TestResult`](crate::core::types::TestResult) and drives the repair transition.
//! Every variant here is fatal to the operation that produced it.

use thiserror::Error;

/// Result alias used across the library boundary.
pub type Result<T, E = AiterateError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AiterateError {
    /// Missing credential, invalid config file or invalid config value.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unsupported language '{0}' (supported: go, python)")]
    UnsupportedLanguage(String),

    /// Completion call failed: transport, auth, non-2xx status, or empty content.
    #[error("completion service error: {0}")]
    Service(String),

    /// Prompt template could not be rendered.
    #[error("prompt rendering failed: {0}")]
    Prompt(String),

    /// A toolchain process could not be started or supervised.
    #[error("failed to launch `{command}`: {message}")]
    ExecutionLaunch { command: String, message: String },

    #[error("dependency resolution failed: {0}")]
    DependencyResolution(String),

    /// The model answered with no usable source text.
    #[error("model returned empty {0}")]
    EmptyGeneration(&'static str),

    /// Joint repair response lacked the named section, or it was empty.
    #[error("malformed repair response: missing or empty {missing} section")]
    MalformedRepairResponse { missing: &'static str },

    #[error("workspace error: {0}")]
    Workspace(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("session '{0}' not found")]
    NotFound(String),

    #[error("corrupt session record '{id}': {message}")]
    CorruptRecord { id: String, message: String },

    #[error("run cancelled")]
    Cancelled,
}

impl AiterateError {
    /// Wrap an `anyhow` chain from an I/O helper as a persistence failure.
    pub(crate) fn persistence(err: anyhow::Error) -> Self {
        Self::Persistence(format!("{err:#}"))
    }

    pub(crate) fn workspace(err: anyhow::Error) -> Self {
        Self::Workspace(format!("{err:#}"))
    }
}
