//! Error taxonomy for the registry core.
//!
//! Every pipeline stage and engine wraps underlying failures into one of
//! these kinds with a stable message. The caller-facing layer translates
//! kind → HTTP status via [`RegistryError::status`] and never leaks raw
//! upstream error text.

use thiserror::Error;

/// Top-level error type for all registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Malformed or contradictory request input.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unknown package id or name.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate package identity.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Quality score fell below the admission threshold.
    #[error("package rejected by quality gate: net score {net_score:.2} is below threshold {threshold:.2}")]
    QualityGate { net_score: f64, threshold: f64 },

    /// An attached retrieval program rejected the download.
    #[error("retrieval program rejected the download (exit status {status})")]
    ProgramRejected { status: i32 },

    /// An attached retrieval program exceeded its wall-clock budget.
    #[error("retrieval program timed out after {timeout_secs} seconds")]
    ProgramTimeout { timeout_secs: u64 },

    /// A metadata store, blob store, fact provider, or registry call failed.
    #[error("upstream failure: {context}")]
    Upstream {
        context: String,
        #[source]
        source: Option<Box<dyn core::error::Error + Send + Sync>>,
    },
}

impl RegistryError {
    /// Build an [`RegistryError::InvalidRequest`] from anything displayable.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Build a [`RegistryError::NotFound`] from anything displayable.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`RegistryError::Conflict`] from anything displayable.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Build an [`RegistryError::Upstream`] with context but no source.
    pub fn upstream(context: impl Into<String>) -> Self {
        Self::Upstream {
            context: context.into(),
            source: None,
        }
    }

    /// The HTTP status code this error kind maps to.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) | Self::ProgramRejected { .. } | Self::ProgramTimeout { .. } => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::QualityGate { .. } => 424,
            Self::Upstream { .. } => 500,
        }
    }
}

/// Extension for wrapping foreign errors into [`RegistryError::Upstream`]
/// with lazily built context, in the spirit of the usual `with_context`
/// combinators.
pub trait UpstreamContext<T> {
    /// Wrap the error value with upstream context produced by `f`.
    fn upstream_with<F: FnOnce() -> String>(self, f: F) -> crate::Result<T>;
}

impl<T, E> UpstreamContext<T> for Result<T, E>
where
    E: core::error::Error + Send + Sync + 'static,
{
    fn upstream_with<F: FnOnce() -> String>(self, f: F) -> crate::Result<T> {
        self.map_err(|e| RegistryError::Upstream {
            context: f(),
            source: Some(Box::new(e)),
        })
    }
}
