//! Method- and parameter-level validation.
//!
//! A [`ValidationChain`] runs the method validator first, then each
//! parameter validator in declaration order, with the request-body validator
//! last. The first failure stops the chain; its [`ValidationRule`] response
//! is what the client sees and the operation never runs.

use crate::error::AssemblyError;
use crate::input::{Input, InputError};
use crate::openapi::{json_schema, TypeDescriptor};
use crate::params::ParamKind;
use crate::response::Response;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Status of the default validation-failure response.
pub const BAD_REQUEST: u16 = 400;

/// Why a validator rejected the request.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The request does not satisfy the rule; answered with the rule's response.
    #[error("{}", describe(.location.as_deref(), .message))]
    Invalid {
        /// What failed, e.g. `query.limit` or `body`
        location: Option<String>,
        message: String,
    },
    /// Reading the input failed. Declaration defects among these are
    /// answered with the fixed 500 instead of the rule's response.
    #[error(transparent)]
    Input(#[from] InputError),
}

fn describe(location: Option<&str>, message: &str) -> String {
    match location {
        Some(location) => format!("{location}: {message}"),
        None => message.to_string(),
    }
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Invalid {
            location: None,
            message: message.into(),
        }
    }

    pub fn at(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            location: Some(location.into()),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Invalid { location, .. } => location.as_deref(),
            Self::Input(_) => None,
        }
    }

    /// True when the failure is a declaration defect rather than bad input.
    #[must_use]
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::Input(e) if e.is_defect())
    }
}

/// A pure check over the request input.
pub trait Validator: Send + Sync {
    fn validate(&self, input: &Input<'_>) -> Result<(), ValidationError>;
}

/// Adapts a closure to [`Validator`].
pub struct FnValidator<F>(F);

impl<F> FnValidator<F>
where
    F: Fn(&Input<'_>) -> Result<(), ValidationError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Validator for FnValidator<F>
where
    F: Fn(&Input<'_>) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, input: &Input<'_>) -> Result<(), ValidationError> {
        (self.0)(input)
    }
}

/// The 400 response used when a rule does not name its own.
#[must_use]
pub fn default_failure_response() -> Response {
    Response::new(BAD_REQUEST).with_error_body()
}

/// A validator together with the response sent when it fails.
#[derive(Clone)]
pub struct ValidationRule {
    pub validator: Arc<dyn Validator>,
    pub response: Response,
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("response", &self.response.status())
            .finish_non_exhaustive()
    }
}

impl ValidationRule {
    #[must_use]
    pub fn new(validator: Arc<dyn Validator>, response: Response) -> Self {
        Self {
            validator,
            response,
        }
    }
}

/// The rule that stopped the chain and why.
#[derive(Debug)]
pub struct ValidationFailure<'a> {
    pub error: ValidationError,
    pub response: &'a Response,
}

/// Ordered validation rules of one method.
#[derive(Debug, Clone, Default)]
pub struct ValidationChain {
    rules: Vec<ValidationRule>,
}

impl ValidationChain {
    /// Build the chain from the method rule, the parameter rules in
    /// declaration order and the body rule.
    pub fn new<'a>(
        method_rule: Option<&'a ValidationRule>,
        parameter_rules: impl IntoIterator<Item = &'a ValidationRule>,
        body_rule: Option<&'a ValidationRule>,
    ) -> Self {
        let rules = method_rule
            .into_iter()
            .chain(parameter_rules)
            .chain(body_rule)
            .cloned()
            .collect();
        Self { rules }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Failure responses of the rules, in evaluation order.
    pub fn responses(&self) -> impl Iterator<Item = &Response> {
        self.rules.iter().map(|rule| &rule.response)
    }

    pub fn evaluate(&self, input: &Input<'_>) -> Result<(), ValidationFailure<'_>> {
        for (index, rule) in self.rules.iter().enumerate() {
            if let Err(error) = rule.validator.validate(input) {
                debug!(
                    request_id = %input.request_id(),
                    rule = index,
                    error = %error,
                    "Validation failed"
                );
                return Err(ValidationFailure {
                    error,
                    response: &rule.response,
                });
            }
        }
        Ok(())
    }
}

/// Every parameter declared `required` is present, and so is a required body.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredParameters;

impl Validator for RequiredParameters {
    fn validate(&self, input: &Input<'_>) -> Result<(), ValidationError> {
        for param in input.parameters().iter().filter(|p| p.required) {
            if input.value(param.kind, &param.name)?.is_none() {
                return Err(ValidationError::at(
                    location(param.kind, &param.name),
                    "required parameter is missing",
                ));
            }
        }
        if input.request_body_parameter().is_some_and(|b| b.required) && !input.has_body() {
            return Err(ValidationError::at("body", "request body is required"));
        }
        Ok(())
    }
}

/// Present parameters with enumerated allowed values carry one of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowedValues;

fn allowed(candidates: &[Value], actual: &str) -> bool {
    candidates.iter().any(|c| match c {
        Value::String(s) => s == actual,
        other => other.to_string() == actual,
    })
}

impl Validator for AllowedValues {
    fn validate(&self, input: &Input<'_>) -> Result<(), ValidationError> {
        for param in input.parameters().iter() {
            let Some(candidates) = &param.allowed_values else {
                continue;
            };
            if let Some(actual) = input.value(param.kind, &param.name)? {
                if !allowed(candidates, &actual) {
                    return Err(ValidationError::at(
                        location(param.kind, &param.name),
                        format!("'{actual}' is not an allowed value"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Validates the decoded request body against a JSON schema.
///
/// A request without a body passes; pair it with [`RequiredParameters`]
/// when the body is mandatory.
pub struct SchemaValidator {
    compiled: jsonschema::Validator,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator").finish_non_exhaustive()
    }
}

impl SchemaValidator {
    pub fn new(schema: &Value) -> Result<Self, AssemblyError> {
        let compiled = jsonschema::validator_for(schema)
            .map_err(|e| AssemblyError::InvalidSchema(e.to_string()))?;
        Ok(Self { compiled })
    }

    /// Compile the schema described by `ty`.
    pub fn for_type(ty: &TypeDescriptor) -> Result<Self, AssemblyError> {
        Self::new(&json_schema(ty))
    }
}

impl Validator for SchemaValidator {
    fn validate(&self, input: &Input<'_>) -> Result<(), ValidationError> {
        if !input.has_body() {
            return Ok(());
        }
        let body = input
            .body_value()
            .map_err(|e| ValidationError::at("body", e.to_string()))?;
        let errors: Vec<String> = self.compiled.iter_errors(body).map(|e| e.to_string()).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::at("body", errors.join("; ")))
        }
    }
}

/// Location string for a parameter, as used in validation errors.
#[must_use]
pub fn location(kind: ParamKind, name: &str) -> String {
    format!("{kind}.{name}")
}
