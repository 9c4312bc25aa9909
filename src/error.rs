//! Assembly-time defects.
//!
//! Everything in here is a declarative mistake discovered while the resource
//! tree is being built. None of these are client errors: they are reported
//! before serving starts so that a broken declaration never reaches traffic.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    /// A declared response carries a status outside `100..=999`.
    #[error("invalid HTTP status {status} for {context}")]
    InvalidStatus { status: u16, context: String },

    /// `MethodBuilder::build` was called without an operation.
    #[error("method {method} has no operation")]
    MissingOperation { method: String },

    /// A resource name is empty or contains reserved characters.
    #[error("invalid resource name '{name}': {reason}")]
    InvalidResourceName { name: String, reason: &'static str },

    /// A route path could not be compiled into a matcher.
    #[error("invalid route '{path}': {reason}")]
    InvalidRoute { path: String, reason: String },

    /// A JSON schema handed to a schema validator does not compile.
    #[error("invalid JSON schema: {0}")]
    InvalidSchema(String),
}

impl AssemblyError {
    pub(crate) fn invalid_status(status: u16, context: impl Into<String>) -> Self {
        AssemblyError::InvalidStatus {
            status,
            context: context.into(),
        }
    }
}
