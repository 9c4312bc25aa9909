//! The per-request method pipeline.
//!
//! Every request served by a [`ResourceMethod`] moves through
//! `Negotiating -> SecurityCheck -> Validating -> Executing -> Responding`.
//! Any stage may short-circuit with a declared response; every path ends in
//! `Responding`, where the resolved response body is computed from the
//! outcome and encoded with the negotiated encoder.
//!
//! # Example
//!
//! ```rust
//! use http::Method;
//! use restpipe::pipeline::{Outcome, ResourceMethod};
//! use restpipe::response::Response;
//! use restpipe::server::Request;
//! use serde_json::json;
//!
//! let method = ResourceMethod::builder(Method::GET)
//!     .operation_fn(|_input| Ok(Outcome::ok(json!({"status": "up"}))))
//!     .fail(Response::new(503))
//!     .build()
//!     .unwrap();
//! let res = method.serve(&Request::new(Method::GET, "/health"), None);
//! assert_eq!(res.status, 200);
//! assert_eq!(res.get_header("content-type"), Some("application/json"));
//! ```

use crate::content::{
    negotiate_decoder, negotiate_encoder, ContentTypeRegistry, Encoder, FormCodec,
    MultipartCodec, NegotiatedEncoder, TextCodec, FORM_URLENCODED, MULTIPART_FORM_DATA,
    TEXT_PLAIN,
};
use crate::error::AssemblyError;
use crate::ids::REQUEST_ID_HEADER;
use crate::input::{Input, UriResolver};
use crate::middleware::Middleware;
use crate::params::{ParamKind, Parameter, ParameterRegistry};
use crate::response::Response;
use crate::security::{SecurityChain, SecurityHook, SecurityScheme};
use crate::server::{HandlerResponse, Request};
use crate::validation::{FnValidator, ValidationChain, ValidationError, ValidationRule, Validator};
use http::Method;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

static INTERNAL_ERROR: Lazy<Response> = Lazy::new(Response::internal_error);

/// What an operation produced.
///
/// `success == false` is a soft failure: the operation completed without
/// reaching its positive outcome (e.g. "not found") and the method's fail
/// response is used.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub body: Option<Value>,
    pub success: bool,
}

impl Outcome {
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self {
            body: Some(body),
            success: true,
        }
    }

    /// Serialize `body` into a successful outcome.
    pub fn ok_json<T: Serialize>(body: &T) -> anyhow::Result<Self> {
        Ok(Self::ok(serde_json::to_value(body)?))
    }

    #[must_use]
    pub fn ok_empty() -> Self {
        Self {
            body: None,
            success: true,
        }
    }

    #[must_use]
    pub fn fail() -> Self {
        Self {
            body: None,
            success: false,
        }
    }

    /// A soft failure carrying a body for the fail response's mutator.
    #[must_use]
    pub fn fail_with(body: Value) -> Self {
        Self {
            body: Some(body),
            success: false,
        }
    }
}

/// User business logic behind a method.
///
/// An `Err` is an operation-internal error: the client receives the fixed
/// 500 response, never a method-specific one.
pub trait Operation: Send + Sync {
    fn execute(&self, input: &Input<'_>) -> anyhow::Result<Outcome>;
}

struct FnOperation<F>(F);

impl<F> Operation for FnOperation<F>
where
    F: Fn(&Input<'_>) -> anyhow::Result<Outcome> + Send + Sync,
{
    fn execute(&self, input: &Input<'_>) -> anyhow::Result<Outcome> {
        (self.0)(input)
    }
}

/// Stages of the request state machine, recorded in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Negotiating,
    SecurityCheck,
    Validating,
    Executing,
    Responding,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineStage::Negotiating => "negotiating",
            PipelineStage::SecurityCheck => "security_check",
            PipelineStage::Validating => "validating",
            PipelineStage::Executing => "executing",
            PipelineStage::Responding => "responding",
        })
    }
}

fn enter(request: &Request, stage: PipelineStage) {
    debug!(request_id = %request.request_id, stage = %stage, "Pipeline stage");
}

/// One HTTP-verb-bound handler of a resource, assembled by [`MethodBuilder`].
///
/// Immutable once built, apart from the middleware and security hook it
/// inherits when attached to a [`crate::resource::Resource`].
#[derive(Clone)]
pub struct ResourceMethod {
    method: Method,
    summary: Option<String>,
    description: Option<String>,
    operation_id: Option<String>,
    tags: Vec<String>,
    operation: Arc<dyn Operation>,
    content: ContentTypeRegistry,
    parameters: ParameterRegistry,
    request_body: Option<Parameter>,
    security: SecurityChain,
    security_hook: Option<SecurityHook>,
    validation: ValidationChain,
    success: Response,
    fail: Option<Response>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl fmt::Debug for ResourceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceMethod")
            .field("method", &self.method)
            .field("operation_id", &self.operation_id)
            .field("parameters", &self.parameters.len())
            .field("security", &self.security.len())
            .field("security_hook", &self.security_hook.is_some())
            .field("validators", &self.validation.len())
            .field("success", &self.success.status())
            .field("fail", &self.fail.as_ref().map(Response::status))
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

impl ResourceMethod {
    #[must_use]
    pub fn builder(method: Method) -> MethodBuilder {
        MethodBuilder::new(method)
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn content_types(&self) -> &ContentTypeRegistry {
        &self.content
    }

    #[must_use]
    pub fn parameters(&self) -> &ParameterRegistry {
        &self.parameters
    }

    #[must_use]
    pub fn request_body(&self) -> Option<&Parameter> {
        self.request_body.as_ref()
    }

    #[must_use]
    pub fn validation(&self) -> &ValidationChain {
        &self.validation
    }

    #[must_use]
    pub fn security(&self) -> &SecurityChain {
        &self.security
    }

    #[must_use]
    pub fn has_security_hook(&self) -> bool {
        self.security_hook.is_some()
    }

    #[must_use]
    pub fn success_response(&self) -> &Response {
        &self.success
    }

    #[must_use]
    pub fn fail_response(&self) -> Option<&Response> {
        self.fail.as_ref()
    }

    #[must_use]
    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    pub(crate) fn prepend_middleware(&mut self, inherited: &[Arc<dyn Middleware>]) {
        if inherited.is_empty() {
            return;
        }
        let own = std::mem::take(&mut self.middleware);
        self.middleware = inherited.iter().map(Arc::clone).chain(own).collect();
    }

    /// Adopt `hook` unless this method already has one.
    pub(crate) fn inherit_security_hook(&mut self, hook: Option<&SecurityHook>) {
        if self.security_hook.is_none() {
            self.security_hook = hook.map(Arc::clone);
        }
    }

    /// Serve one request: middleware `before`, the pipeline, middleware `after`.
    ///
    /// `resolver` supplies URI parameters; without one, operations reading a
    /// URI parameter get [`crate::input::InputError::NoUriResolver`]. A
    /// validator hitting that, or an undeclared parameter, yields the fixed
    /// 500 rather than its own failure response.
    ///
    /// # Panics
    ///
    /// Panics when the operation soft-fails and the method declared no fail
    /// response. That is a declaration defect, not a client error.
    pub fn serve(&self, request: &Request, resolver: Option<&UriResolver>) -> HandlerResponse {
        let start = Instant::now();
        let short_circuit = self.middleware.iter().find_map(|mw| mw.before(request));
        let mut response = match short_circuit {
            Some(res) => {
                debug!(request_id = %request.request_id, status = res.status, "Middleware short-circuited request");
                res
            }
            None => self.run(request, resolver),
        };
        let latency = start.elapsed();
        for mw in &self.middleware {
            mw.after(request, &mut response, latency);
        }
        response
    }

    fn run(&self, request: &Request, resolver: Option<&UriResolver>) -> HandlerResponse {
        enter(request, PipelineStage::Negotiating);
        let encoder = match negotiate_encoder(request, &self.content) {
            Ok(encoder) => encoder,
            Err(err) => {
                warn!(request_id = %request.request_id, error = %err, "Encoder negotiation failed");
                return self.unsupported_without_encoder(request, &err);
            }
        };
        // Only a request carrying a body can fail here.
        let decoder = match negotiate_decoder(request, &self.content) {
            Ok(decoder) => decoder,
            Err(err) => {
                warn!(request_id = %request.request_id, error = %err, "Decoder negotiation failed");
                let unsupported = self.content.unsupported_response();
                return respond(request, &encoder, unsupported, None, false, Some(&err));
            }
        };

        let input = Input::new(
            request,
            &self.parameters,
            self.request_body.as_ref(),
            decoder.as_ref(),
            resolver,
        );

        enter(request, PipelineStage::SecurityCheck);
        let verdict = match &self.security_hook {
            Some(hook) => (**hook)(&self.security, &input),
            None => self.security.evaluate(&input),
        };
        if let Err(rejection) = verdict {
            warn!(
                request_id = %request.request_id,
                scheme = %rejection.scheme,
                outcome = %rejection.outcome,
                "Request refused by security"
            );
            return respond(request, &encoder, &rejection.response, None, false, Some(&rejection));
        }

        enter(request, PipelineStage::Validating);
        if let Err(failure) = self.validation.evaluate(&input) {
            if failure.error.is_defect() {
                error!(
                    request_id = %request.request_id,
                    method = %self.method,
                    error = %failure.error,
                    "Validator hit a declaration defect"
                );
                return respond(request, &encoder, &INTERNAL_ERROR, None, false, Some(&failure.error));
            }
            warn!(request_id = %request.request_id, error = %failure.error, "Request failed validation");
            return respond(request, &encoder, failure.response, None, false, Some(&failure.error));
        }

        enter(request, PipelineStage::Executing);
        let outcome = match self.operation.execute(&input) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(request_id = %request.request_id, error = %err, "Operation failed");
                let err: &(dyn StdError + 'static) = &*err;
                return respond(request, &encoder, &INTERNAL_ERROR, None, false, Some(err));
            }
        };

        let resolved = if outcome.success {
            &self.success
        } else {
            self.fail_or_panic(request)
        };
        respond(
            request,
            &encoder,
            resolved,
            outcome.body.as_ref(),
            outcome.success,
            None,
        )
    }

    #[allow(clippy::panic)]
    fn fail_or_panic(&self, request: &Request) -> &Response {
        match &self.fail {
            Some(fail) => fail,
            None => {
                error!(
                    request_id = %request.request_id,
                    method = %self.method,
                    path = %request.path,
                    "Operation soft-failed but no fail response is declared"
                );
                panic!(
                    "fail response not defined for {} {}",
                    self.method, request.path
                );
            }
        }
    }

    /// No encoder could be agreed and the registry has no default: write the
    /// unsupported-type response as plain text.
    fn unsupported_without_encoder(
        &self,
        request: &Request,
        err: &(dyn StdError + 'static),
    ) -> HandlerResponse {
        let fallback = NegotiatedEncoder {
            content_type: TEXT_PLAIN.to_string(),
            codec: Arc::new(TextCodec) as Arc<dyn Encoder>,
        };
        respond(
            request,
            &fallback,
            self.content.unsupported_response(),
            None,
            false,
            Some(err),
        )
    }
}

/// The `Responding` stage: resolve the body from the outcome and encode it.
fn respond(
    request: &Request,
    encoder: &NegotiatedEncoder,
    response: &Response,
    body: Option<&Value>,
    success: bool,
    err: Option<&(dyn StdError + 'static)>,
) -> HandlerResponse {
    enter(request, PipelineStage::Responding);
    let mut res = HandlerResponse::empty(response.status());
    res.set_header("content-type", encoder.content_type.clone());
    res.set_header(REQUEST_ID_HEADER, request.request_id.to_string());
    if let Some(value) = response.resolve_body(body, success, err) {
        let mut sink = Vec::new();
        match encoder.codec.encode(&mut sink, &value) {
            Ok(()) => res.body = sink,
            Err(e) => {
                error!(
                    request_id = %request.request_id,
                    content_type = %encoder.content_type,
                    error = %e,
                    "Response encoding failed"
                );
                res.status = INTERNAL_ERROR.status();
            }
        }
    }
    res
}

/// Declarative assembly of a [`ResourceMethod`].
pub struct MethodBuilder {
    method: Method,
    summary: Option<String>,
    description: Option<String>,
    operation_id: Option<String>,
    tags: Vec<String>,
    operation: Option<Arc<dyn Operation>>,
    content: ContentTypeRegistry,
    parameters: ParameterRegistry,
    request_body: Option<Parameter>,
    security: SecurityChain,
    validator: Option<ValidationRule>,
    success: Response,
    fail: Option<Response>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl MethodBuilder {
    /// JSON content types, a `200` success response carrying the operation
    /// body and no fail response.
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            summary: None,
            description: None,
            operation_id: None,
            tags: Vec::new(),
            operation: None,
            content: ContentTypeRegistry::json(),
            parameters: ParameterRegistry::new(),
            request_body: None,
            security: SecurityChain::default(),
            validator: None,
            success: Response::new(200).with_operation_body(),
            fail: None,
            middleware: Vec::new(),
        }
    }

    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn operation<O>(mut self, operation: O) -> Self
    where
        O: Operation + 'static,
    {
        self.operation = Some(Arc::new(operation));
        self
    }

    #[must_use]
    pub fn operation_fn<F>(self, f: F) -> Self
    where
        F: Fn(&Input<'_>) -> anyhow::Result<Outcome> + Send + Sync + 'static,
    {
        self.operation(FnOperation(f))
    }

    /// Replace the content-type registry (JSON by default).
    #[must_use]
    pub fn content_types(mut self, registry: ContentTypeRegistry) -> Self {
        self.content = registry;
        self
    }

    /// Declare a parameter. Use [`MethodBuilder::request_body`] for bodies.
    #[must_use]
    pub fn parameter(mut self, param: Parameter) -> Self {
        self.parameters.register(param);
        self
    }

    #[must_use]
    pub fn request_body(mut self, body: Parameter) -> Self {
        self.request_body = Some(body);
        self
    }

    /// Add a security scheme; schemes are tried in the order added.
    #[must_use]
    pub fn security(mut self, scheme: SecurityScheme) -> Self {
        self.security.push(scheme);
        self
    }

    /// The method-level validator, run before any parameter validator.
    #[must_use]
    pub fn validator<V>(mut self, validator: V, response: Response) -> Self
    where
        V: Validator + 'static,
    {
        self.validator = Some(ValidationRule::new(Arc::new(validator), response));
        self
    }

    #[must_use]
    pub fn validator_fn<F>(self, f: F, response: Response) -> Self
    where
        F: Fn(&Input<'_>) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.validator(FnValidator::new(f), response)
    }

    #[must_use]
    pub fn success(mut self, response: Response) -> Self {
        self.success = response;
        self
    }

    #[must_use]
    pub fn fail(mut self, response: Response) -> Self {
        self.fail = Some(response);
        self
    }

    #[must_use]
    pub fn middleware<M>(self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.middleware_arc(Arc::new(middleware))
    }

    #[must_use]
    pub fn middleware_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Check the declaration and freeze it.
    ///
    /// Fails when no operation was set or when any declared response carries
    /// a status outside `100..=999`. Parameters read by security schemes are
    /// declared here unless the method already declares them.
    pub fn build(mut self) -> Result<ResourceMethod, AssemblyError> {
        let operation = self.operation.take().ok_or_else(|| AssemblyError::MissingOperation {
            method: self.method.to_string(),
        })?;
        let context = self.method.to_string();

        self.success.validate(&format!("{context} success"))?;
        if let Some(fail) = &self.fail {
            fail.validate(&format!("{context} fail"))?;
        }
        self.content
            .unsupported_response()
            .validate(&format!("{context} unsupported media type"))?;
        for scheme in self.security.schemes() {
            let ctx = format!("{context} security scheme '{}'", scheme.name);
            scheme.authentication_failure.validate(&ctx)?;
            scheme.authorization_failure.validate(&ctx)?;
        }

        let mut credentials = Vec::new();
        for scheme in self.security.schemes() {
            credentials.extend(scheme.authenticator.parameters());
        }
        for param in credentials {
            if !self.parameters.contains(param.kind, &param.name) {
                self.parameters.register(param);
            }
        }

        let has_form = self.parameters.of_kind(ParamKind::Form).next().is_some();
        let has_files = self.parameters.of_kind(ParamKind::File).next().is_some();
        if (has_form || has_files) && self.content.decoder(MULTIPART_FORM_DATA).is_err() {
            self.content
                .register_decoder(MULTIPART_FORM_DATA, MultipartCodec, false);
        }
        if has_form && self.content.decoder(FORM_URLENCODED).is_err() {
            self.content.register_decoder(FORM_URLENCODED, FormCodec, false);
        }

        let body_rule = self.request_body.as_ref().and_then(|b| b.validation.as_ref());
        let validation = ValidationChain::new(
            self.validator.as_ref(),
            self.parameters.iter().filter_map(|p| p.validation.as_ref()),
            body_rule,
        );
        let validation_ctx = format!("{context} validator");
        if let Some(rule) = &self.validator {
            rule.response.validate(&validation_ctx)?;
        }
        for rule in self
            .parameters
            .iter()
            .filter_map(|p| p.validation.as_ref())
            .chain(body_rule)
        {
            rule.response.validate(&validation_ctx)?;
        }

        debug!(
            method = %self.method,
            parameters = self.parameters.len(),
            security_schemes = self.security.len(),
            validators = validation.len(),
            "Method assembled"
        );

        Ok(ResourceMethod {
            method: self.method,
            summary: self.summary,
            description: self.description,
            operation_id: self.operation_id,
            tags: self.tags,
            operation,
            content: self.content,
            parameters: self.parameters,
            request_body: self.request_body,
            security: self.security,
            security_hook: None,
            validation,
            success: self.success,
            fail: self.fail,
            middleware: self.middleware,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{JsonCodec, YamlCodec, APPLICATION_JSON, APPLICATION_YAML};
    use crate::security::{AuthOutcome, SecurityRejection};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn echo() -> MethodBuilder {
        ResourceMethod::builder(Method::GET)
            .operation_fn(|_input| Ok(Outcome::ok(json!({"id": 1}))))
            .fail(Response::new(404))
    }

    #[test]
    fn test_build_requires_operation() {
        let err = ResourceMethod::builder(Method::GET).build().unwrap_err();
        assert_eq!(
            err,
            AssemblyError::MissingOperation {
                method: "GET".into()
            }
        );
    }

    #[test]
    fn test_build_rejects_invalid_status() {
        let err = echo().success(Response::new(20)).build().unwrap_err();
        assert!(matches!(err, AssemblyError::InvalidStatus { status: 20, .. }));
        let err = echo()
            .security(
                SecurityScheme::custom("x", |_: &Input<'_>| AuthOutcome::Ok)
                    .with_authorization_failure(Response::new(1200)),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, AssemblyError::InvalidStatus { status: 1200, .. }));
    }

    #[test]
    fn test_content_type_always_set() {
        let method = echo().build().unwrap();
        let res = method.serve(&Request::new(Method::GET, "/pets/1"), None);
        assert_eq!(res.status, 200);
        assert_eq!(res.get_header("content-type"), Some(APPLICATION_JSON));
        assert_eq!(res.json_body(), Some(json!({"id": 1})));
    }

    #[test]
    fn test_yaml_negotiated() {
        let mut content = ContentTypeRegistry::new();
        content.register(APPLICATION_JSON, JsonCodec, true);
        content.register(APPLICATION_YAML, YamlCodec, false);
        let method = echo().content_types(content).build().unwrap();
        let req = Request::new(Method::GET, "/pets/1").with_header("Accept", "application/yaml");
        let res = method.serve(&req, None);
        assert_eq!(res.get_header("content-type"), Some(APPLICATION_YAML));
        let back: Value = serde_yaml::from_slice(&res.body).unwrap();
        assert_eq!(back, json!({"id": 1}));
    }

    #[test]
    fn test_no_encoder_writes_unsupported_as_text() {
        let mut content = ContentTypeRegistry::new();
        content.register(APPLICATION_YAML, YamlCodec, false);
        let method = echo().content_types(content).build().unwrap();
        let req = Request::new(Method::GET, "/pets/1").with_header("Accept", "image/png");
        let res = method.serve(&req, None);
        assert_eq!(res.status, 415);
        assert_eq!(res.get_header("content-type"), Some(TEXT_PLAIN));
    }

    #[test]
    fn test_undecodable_body_is_unsupported() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let method = ResourceMethod::builder(Method::POST)
            .operation_fn(move |_input| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(Outcome::ok_empty())
            })
            .build()
            .unwrap();
        let req = Request::new(Method::POST, "/pets")
            .with_header("Content-Type", "text/csv")
            .with_body("a,b");
        let res = method.serve(&req, None);
        assert_eq!(res.status, 415);
        assert_eq!(res.get_header("content-type"), Some(APPLICATION_JSON));
        assert!(res.json_body().unwrap()["error"]
            .as_str()
            .unwrap()
            .contains("text/csv"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_validator_without_uri_resolver_is_fixed_500() {
        let method = ResourceMethod::builder(Method::GET)
            .parameter(Parameter::uri("petId").required())
            .validator(crate::validation::RequiredParameters, Response::new(400).with_error_body())
            .operation_fn(|_input| Ok(Outcome::ok_empty()))
            .build()
            .unwrap();
        let res = method.serve(&Request::new(Method::GET, "/pets/1"), None);
        assert_eq!(res.status, 500);

        let resolver: UriResolver = Arc::new(|_req: &Request, _name: &str| Some("1".to_string()));
        let res = method.serve(&Request::new(Method::GET, "/pets/1"), Some(&resolver));
        assert_eq!(res.status, 200);
    }

    #[test]
    fn test_undeclared_parameter_in_validator_is_fixed_500() {
        let method = ResourceMethod::builder(Method::GET)
            .validator_fn(
                |input: &Input<'_>| input.query("limit").map(|_| ()).map_err(Into::into),
                Response::new(422).with_error_body(),
            )
            .operation_fn(|_input| Ok(Outcome::ok_empty()))
            .build()
            .unwrap();
        let res = method.serve(&Request::new(Method::GET, "/pets?limit=1"), None);
        assert_eq!(res.status, 500);
    }

    #[test]
    fn test_operation_error_is_fixed_500() {
        let method = ResourceMethod::builder(Method::GET)
            .operation_fn(|_input| Err(anyhow::anyhow!("database unavailable")))
            .fail(Response::new(404))
            .build()
            .unwrap();
        let res = method.serve(&Request::new(Method::GET, "/pets/1"), None);
        assert_eq!(res.status, 500);
        assert_eq!(res.json_body(), Some(json!({"error": "database unavailable"})));
    }

    #[test]
    fn test_security_hook_replaces_default_step() {
        let mut method = echo()
            .security(SecurityScheme::custom("deny", |_: &Input<'_>| {
                AuthOutcome::AuthenticationFailed
            }))
            .build()
            .unwrap();
        let req = Request::new(Method::GET, "/pets/1");
        assert_eq!(method.serve(&req, None).status, 401);

        let hook: SecurityHook = Arc::new(
            |_chain: &SecurityChain, _input: &Input<'_>| -> Result<(), SecurityRejection> { Ok(()) },
        );
        method.inherit_security_hook(Some(&hook));
        assert_eq!(method.serve(&req, None).status, 200);

        let other: SecurityHook = Arc::new(|_chain: &SecurityChain, _input: &Input<'_>| -> Result<(), SecurityRejection> {
            Err(SecurityRejection {
                scheme: "other".into(),
                outcome: AuthOutcome::AuthorizationFailed,
                response: Response::new(403),
            })
        });
        method.inherit_security_hook(Some(&other));
        assert_eq!(method.serve(&req, None).status, 200);
    }

    #[test]
    fn test_validation_failure_skips_operation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let method = ResourceMethod::builder(Method::GET)
            .parameter(Parameter::query("limit"))
            .validator_fn(
                |input: &Input<'_>| match input.query("limit")? {
                    Some(_) => Ok(()),
                    None => Err(ValidationError::at("query.limit", "missing")),
                },
                Response::new(422).with_error_body(),
            )
            .operation_fn(move |_input| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(Outcome::ok_empty())
            })
            .build()
            .unwrap();
        let res = method.serve(&Request::new(Method::GET, "/pets"), None);
        assert_eq!(res.status, 422);
        assert_eq!(res.json_body(), Some(json!({"error": "query.limit: missing"})));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let res = method.serve(&Request::new(Method::GET, "/pets?limit=1"), None);
        assert_eq!(res.status, 200);
        assert!(res.body.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_security_parameters_are_declared() {
        let method = echo()
            .security(SecurityScheme::api_key(
                "key",
                crate::security::ApiKeyAuthenticator::query("api_key", ["k"]),
            ))
            .build()
            .unwrap();
        assert!(method
            .parameters()
            .contains(crate::params::ParamKind::Query, "api_key"));
    }

    #[test]
    #[should_panic(expected = "fail response not defined")]
    fn test_soft_failure_without_fail_response_panics() {
        let method = ResourceMethod::builder(Method::GET)
            .operation_fn(|_input| Ok(Outcome::fail()))
            .build()
            .unwrap();
        method.serve(&Request::new(Method::GET, "/pets/1"), None);
    }
}
