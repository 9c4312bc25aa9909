//! Declared responses and the outcome-driven body mutation hook.

use crate::error::AssemblyError;
use crate::openapi::TypeDescriptor;
use crate::server::response::status_reason;
use serde_json::{json, Value};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Status of the fixed operation-error response.
pub const INTERNAL_SERVER_ERROR: u16 = 500;

/// Computes a response body from the execution outcome just before encoding.
///
/// `body` and `success` are what the operation returned (`None`/`false` when
/// the pipeline stopped before executing); `err` is the error that selected
/// this response, if any.
pub trait BodyMutator: Send + Sync {
    fn mutate(
        &self,
        body: Option<&Value>,
        success: bool,
        err: Option<&(dyn StdError + 'static)>,
    ) -> Option<Value>;
}

struct FnMutator<F>(F);

impl<F> BodyMutator for FnMutator<F>
where
    F: Fn(Option<&Value>, bool, Option<&(dyn StdError + 'static)>) -> Option<Value> + Send + Sync,
{
    fn mutate(
        &self,
        body: Option<&Value>,
        success: bool,
        err: Option<&(dyn StdError + 'static)>,
    ) -> Option<Value> {
        (self.0)(body, success, err)
    }
}

/// Renders `{"error": message}` from the triggering error, otherwise passes
/// the operation body through.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorBody;

impl BodyMutator for ErrorBody {
    fn mutate(
        &self,
        body: Option<&Value>,
        _success: bool,
        err: Option<&(dyn StdError + 'static)>,
    ) -> Option<Value> {
        match err {
            Some(e) => Some(json!({ "error": e.to_string() })),
            None => body.cloned(),
        }
    }
}

/// Where a response's body comes from.
#[derive(Clone, Default)]
pub enum ResponseBody {
    /// No body is written
    #[default]
    Empty,
    /// A value fixed at declaration time
    Static(Value),
    /// Whatever the operation returned
    Operation,
    /// Computed from the outcome
    Mutator(Arc<dyn BodyMutator>),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Empty => f.write_str("Empty"),
            ResponseBody::Static(v) => f.debug_tuple("Static").field(v).finish(),
            ResponseBody::Operation => f.write_str("Operation"),
            ResponseBody::Mutator(_) => f.write_str("Mutator(..)"),
        }
    }
}

/// A declared response: status, body source and documentation.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    pub description: String,
    pub body: ResponseBody,
    /// Documented body schema
    pub schema: Option<TypeDescriptor>,
}

impl Response {
    /// A bodyless response described by the status' reason phrase.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            description: status_reason(status).to_string(),
            body: ResponseBody::Empty,
            schema: None,
        }
    }

    /// The fixed response for operation errors. Not configurable per method.
    #[must_use]
    pub fn internal_error() -> Self {
        Self::new(INTERNAL_SERVER_ERROR).with_error_body()
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = ResponseBody::Static(body);
        self
    }

    /// Use the operation's returned body.
    #[must_use]
    pub fn with_operation_body(mut self) -> Self {
        self.body = ResponseBody::Operation;
        self
    }

    #[must_use]
    pub fn with_error_body(self) -> Self {
        self.with_mutator(ErrorBody)
    }

    #[must_use]
    pub fn with_mutator<M>(mut self, mutator: M) -> Self
    where
        M: BodyMutator + 'static,
    {
        self.body = ResponseBody::Mutator(Arc::new(mutator));
        self
    }

    #[must_use]
    pub fn with_mutator_fn<F>(self, f: F) -> Self
    where
        F: Fn(Option<&Value>, bool, Option<&(dyn StdError + 'static)>) -> Option<Value>
            + Send
            + Sync
            + 'static,
    {
        self.with_mutator(FnMutator(f))
    }

    #[must_use]
    pub fn with_schema(mut self, schema: TypeDescriptor) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Reject statuses that are not three-digit HTTP codes.
    pub fn validate(&self, context: &str) -> Result<(), AssemblyError> {
        if (100..=999).contains(&self.status) {
            Ok(())
        } else {
            Err(AssemblyError::invalid_status(self.status, context))
        }
    }

    /// The body to encode for this outcome; `None` writes no body.
    #[must_use]
    pub fn resolve_body(
        &self,
        body: Option<&Value>,
        success: bool,
        err: Option<&(dyn StdError + 'static)>,
    ) -> Option<Value> {
        match &self.body {
            ResponseBody::Empty => None,
            ResponseBody::Static(v) => Some(v.clone()),
            ResponseBody::Operation => body.cloned(),
            ResponseBody::Mutator(m) => m.mutate(body, success, err),
        }
    }
}
