//! Declared parameters.
//!
//! A [`Parameter`] is keyed by `(kind, name)`. The [`ParameterRegistry`] of a
//! method is the single source of truth for which request values an
//! operation may read (see [`crate::input::Input`]) and for what the OpenAPI
//! renderer documents.

use crate::input::Input;
use crate::openapi::TypeDescriptor;
use crate::response::Response;
use crate::validation::{FnValidator, ValidationError, ValidationRule, Validator};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Where a parameter lives in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKind {
    /// A templated path segment such as `{petId}`
    Uri,
    Query,
    Header,
    Cookie,
    /// A url-encoded or multipart form field
    Form,
    /// A multipart file upload
    File,
    /// The request body
    Body,
}

impl ParamKind {
    /// The OpenAPI `in` value for kinds that are documented as parameters.
    #[must_use]
    pub fn openapi_location(self) -> Option<&'static str> {
        match self {
            ParamKind::Uri => Some("path"),
            ParamKind::Query => Some("query"),
            ParamKind::Header => Some("header"),
            ParamKind::Cookie => Some("cookie"),
            ParamKind::Form | ParamKind::File | ParamKind::Body => None,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamKind::Uri => "uri",
            ParamKind::Query => "query",
            ParamKind::Header => "header",
            ParamKind::Cookie => "cookie",
            ParamKind::Form => "form",
            ParamKind::File => "file",
            ParamKind::Body => "body",
        };
        f.write_str(s)
    }
}

/// One named, typed input of a method.
#[derive(Clone)]
pub struct Parameter {
    pub kind: ParamKind,
    pub name: String,
    pub ty: TypeDescriptor,
    pub required: bool,
    pub description: Option<String>,
    /// Enumerated allowed values, documented and checked by
    /// [`AllowedValues`](crate::validation::AllowedValues)
    pub allowed_values: Option<Vec<Value>>,
    pub(crate) validation: Option<ValidationRule>,
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("required", &self.required)
            .field("allowed_values", &self.allowed_values)
            .field("has_validator", &self.validation.is_some())
            .finish()
    }
}

impl Parameter {
    pub fn new(kind: ParamKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            ty: TypeDescriptor::string(),
            // Path segments are always present when the route matched.
            required: kind == ParamKind::Uri,
            description: None,
            allowed_values: None,
            validation: None,
        }
    }

    pub fn uri(name: impl Into<String>) -> Self {
        Self::new(ParamKind::Uri, name)
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self::new(ParamKind::Query, name)
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::new(ParamKind::Header, name)
    }

    pub fn cookie(name: impl Into<String>) -> Self {
        Self::new(ParamKind::Cookie, name)
    }

    pub fn form(name: impl Into<String>) -> Self {
        Self::new(ParamKind::Form, name)
    }

    pub fn file(name: impl Into<String>) -> Self {
        let mut p = Self::new(ParamKind::File, name);
        p.ty = TypeDescriptor::binary();
        p
    }

    /// The request-body descriptor, with the body's schema.
    #[must_use]
    pub fn body(schema: TypeDescriptor) -> Self {
        let mut p = Self::new(ParamKind::Body, "body");
        p.ty = schema;
        p
    }

    #[must_use]
    pub fn with_type(mut self, ty: TypeDescriptor) -> Self {
        self.ty = ty;
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_allowed_values(mut self, values: Vec<Value>) -> Self {
        self.allowed_values = Some(values);
        self
    }

    /// Attach this parameter's validator and the response sent when it fails.
    #[must_use]
    pub fn validate_with<V>(mut self, validator: V, response: Response) -> Self
    where
        V: Validator + 'static,
    {
        self.validation = Some(ValidationRule::new(Arc::new(validator), response));
        self
    }

    /// Closure form of [`Parameter::validate_with`].
    #[must_use]
    pub fn validate_fn<F>(self, f: F, response: Response) -> Self
    where
        F: Fn(&Input<'_>) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.validate_with(FnValidator::new(f), response)
    }

    #[must_use]
    pub fn has_validator(&self) -> bool {
        self.validation.is_some()
    }

    fn matches(&self, kind: ParamKind, name: &str) -> bool {
        if self.kind != kind {
            return false;
        }
        match kind {
            ParamKind::Header => self.name.eq_ignore_ascii_case(name),
            _ => self.name == name,
        }
    }
}

/// The declared parameters of one method, in declaration order.
///
/// Registering a `(kind, name)` pair that already exists replaces the earlier
/// declaration in place. Header names compare case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    params: Vec<Parameter>,
}

impl ParameterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, param: Parameter) -> &mut Self {
        match self
            .params
            .iter_mut()
            .find(|p| p.matches(param.kind, &param.name))
        {
            Some(existing) => *existing = param,
            None => self.params.push(param),
        }
        self
    }

    #[must_use]
    pub fn get(&self, kind: ParamKind, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.matches(kind, name))
    }

    #[must_use]
    pub fn contains(&self, kind: ParamKind, name: &str) -> bool {
        self.get(kind, name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn of_kind(&self, kind: ParamKind) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(move |p| p.kind == kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_kind_and_name() {
        let mut reg = ParameterRegistry::new();
        reg.register(Parameter::query("id"));
        reg.register(Parameter::uri("id"));
        assert_eq!(reg.len(), 2);
        assert!(reg.contains(ParamKind::Query, "id"));
        assert!(reg.contains(ParamKind::Uri, "id"));
        assert!(!reg.contains(ParamKind::Header, "id"));
    }

    #[test]
    fn test_reregistration_replaces_in_place() {
        let mut reg = ParameterRegistry::new();
        reg.register(Parameter::query("limit"));
        reg.register(Parameter::query("offset"));
        reg.register(Parameter::query("limit").required());
        let names: Vec<_> = reg.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["limit", "offset"]);
        assert!(reg.get(ParamKind::Query, "limit").unwrap().required);
    }

    #[test]
    fn test_header_names_are_case_insensitive() {
        let mut reg = ParameterRegistry::new();
        reg.register(Parameter::header("X-Api-Key"));
        assert!(reg.contains(ParamKind::Header, "x-api-key"));
        reg.register(Parameter::header("x-api-key").required());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_uri_parameters_default_to_required() {
        assert!(Parameter::uri("petId").required);
        assert!(!Parameter::query("q").required);
        assert_eq!(Parameter::file("avatar").ty, TypeDescriptor::binary());
    }
}
