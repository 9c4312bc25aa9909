//! The capability-checked view of a request handed to operations,
//! authenticators and validators.
//!
//! Every getter first looks the `(kind, name)` pair up in the method's
//! [`ParameterRegistry`]. An undeclared access fails with
//! [`InputError::ParameterNotDefined`] without touching the request, so the
//! documented contract and the data an operation can actually read are the
//! same set.

use crate::content::{CodecError, NegotiatedDecoder};
use crate::ids::RequestId;
use crate::params::{ParamKind, Parameter, ParameterRegistry};
use crate::server::{Request, UploadedFile};
use http::Method;
use once_cell::unsync::OnceCell;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

/// Resolves a templated path segment for a request.
///
/// Supplied by the serving layer (see [`crate::router::Router`]); a method
/// served without one cannot read URI parameters.
pub type UriResolver = Arc<dyn Fn(&Request, &str) -> Option<String> + Send + Sync>;

/// Resolver reading the segments the router stored on the request.
#[must_use]
pub fn path_params_resolver(request: &Request, name: &str) -> Option<String> {
    request.get_path_param(name).map(str::to_string)
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("{kind} parameter '{name}' is not defined")]
    ParameterNotDefined { kind: ParamKind, name: String },
    #[error("no URI resolver configured")]
    NoUriResolver,
    #[error("request body is not defined for this method")]
    BodyNotDefined,
    #[error("request has no body")]
    MissingBody,
    #[error("no decoder negotiated for the request body")]
    NoDecoder,
    #[error(transparent)]
    Decode(#[from] CodecError),
    #[error("request body does not match the expected type: {0}")]
    Convert(String),
}

impl InputError {
    /// Errors caused by how the method was declared or served, never by the
    /// client.
    #[must_use]
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            Self::ParameterNotDefined { .. } | Self::NoUriResolver | Self::BodyNotDefined
        )
    }
}

/// Per-request pipeline state, threaded explicitly through every stage.
pub struct Input<'a> {
    request: &'a Request,
    parameters: &'a ParameterRegistry,
    request_body: Option<&'a Parameter>,
    decoder: Option<&'a NegotiatedDecoder>,
    resolver: Option<&'a UriResolver>,
    decoded: OnceCell<Value>,
}

impl<'a> Input<'a> {
    pub fn new(
        request: &'a Request,
        parameters: &'a ParameterRegistry,
        request_body: Option<&'a Parameter>,
        decoder: Option<&'a NegotiatedDecoder>,
        resolver: Option<&'a UriResolver>,
    ) -> Self {
        Self {
            request,
            parameters,
            request_body,
            decoder,
            resolver,
            decoded: OnceCell::new(),
        }
    }

    fn declared(&self, kind: ParamKind, name: &str) -> Result<(), InputError> {
        if self.parameters.contains(kind, name) {
            return Ok(());
        }
        error!(
            request_id = %self.request.request_id,
            kind = %kind,
            name = %name,
            "Access to undeclared parameter"
        );
        Err(InputError::ParameterNotDefined {
            kind,
            name: name.to_string(),
        })
    }

    pub fn uri_param(&self, name: &str) -> Result<Option<String>, InputError> {
        self.declared(ParamKind::Uri, name)?;
        let resolver = self.resolver.ok_or(InputError::NoUriResolver)?;
        Ok((**resolver)(self.request, name))
    }

    pub fn header(&self, name: &str) -> Result<Option<&'a str>, InputError> {
        self.declared(ParamKind::Header, name)?;
        Ok(self.request.get_header(name))
    }

    pub fn cookie(&self, name: &str) -> Result<Option<&'a str>, InputError> {
        self.declared(ParamKind::Cookie, name)?;
        Ok(self.request.get_cookie(name))
    }

    pub fn query(&self, name: &str) -> Result<Option<&'a str>, InputError> {
        self.declared(ParamKind::Query, name)?;
        Ok(self.request.get_query_param(name))
    }

    pub fn query_all(&self, name: &str) -> Result<Vec<&'a str>, InputError> {
        self.declared(ParamKind::Query, name)?;
        Ok(self.request.get_query_params(name))
    }

    pub fn form(&self, name: &str) -> Result<Option<&'a str>, InputError> {
        self.declared(ParamKind::Form, name)?;
        Ok(self.request.get_form_field(name))
    }

    pub fn form_all(&self, name: &str) -> Result<Vec<&'a str>, InputError> {
        self.declared(ParamKind::Form, name)?;
        Ok(self.request.get_form_fields(name))
    }

    pub fn file(&self, name: &str) -> Result<Option<&'a UploadedFile>, InputError> {
        self.declared(ParamKind::File, name)?;
        Ok(self.request.get_file(name))
    }

    pub fn files(&self, name: &str) -> Result<Vec<&'a UploadedFile>, InputError> {
        self.declared(ParamKind::File, name)?;
        Ok(self.request.get_files(name))
    }

    /// The scalar value of any declared non-body parameter; files yield their
    /// file name (or the field name when the client sent none).
    pub fn value(&self, kind: ParamKind, name: &str) -> Result<Option<String>, InputError> {
        let owned = |v: Option<&str>| v.map(str::to_string);
        match kind {
            ParamKind::Uri => self.uri_param(name),
            ParamKind::Header => self.header(name).map(owned),
            ParamKind::Cookie => self.cookie(name).map(owned),
            ParamKind::Query => self.query(name).map(owned),
            ParamKind::Form => self.form(name).map(owned),
            ParamKind::File => Ok(self
                .file(name)?
                .map(|f| f.file_name.clone().unwrap_or_else(|| f.field.clone()))),
            ParamKind::Body => {
                let raw = self.raw_body()?;
                Ok(raw.map(|b| String::from_utf8_lossy(b).into_owned()))
            }
        }
    }

    /// Raw body bytes. Fails when the method declared no request body, even if
    /// the client sent one.
    pub fn raw_body(&self) -> Result<Option<&'a [u8]>, InputError> {
        if self.request_body.is_none() {
            return Err(InputError::BodyNotDefined);
        }
        Ok(self.request.body.as_deref().filter(|b| !b.is_empty()))
    }

    /// The body decoded with the negotiated decoder. Decoded once per request.
    pub fn body_value(&self) -> Result<&Value, InputError> {
        self.decoded.get_or_try_init(|| {
            let raw = self.raw_body()?.ok_or(InputError::MissingBody)?;
            let decoder = self.decoder.ok_or(InputError::NoDecoder)?;
            let content_type = self.request.get_header("content-type").unwrap_or_default();
            Ok(decoder.codec.decode_as(content_type, raw)?)
        })
    }

    /// The body decoded into `T`.
    pub fn body<T: DeserializeOwned>(&self) -> Result<T, InputError> {
        serde_json::from_value(self.body_value()?.clone())
            .map_err(|e| InputError::Convert(e.to_string()))
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request.request_id
    }

    #[must_use]
    pub fn method(&self) -> &'a Method {
        &self.request.method
    }

    #[must_use]
    pub fn path(&self) -> &'a str {
        &self.request.path
    }

    #[must_use]
    pub fn has_body(&self) -> bool {
        self.request.has_body()
    }

    #[must_use]
    pub fn parameters(&self) -> &'a ParameterRegistry {
        self.parameters
    }

    #[must_use]
    pub fn request_body_parameter(&self) -> Option<&'a Parameter> {
        self.request_body
    }

    /// Name of the negotiated body format, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&'a str> {
        self.decoder.map(|d| d.content_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentTypeRegistry;
    use crate::openapi::TypeDescriptor;
    use serde::Deserialize;

    fn registry() -> ParameterRegistry {
        let mut reg = ParameterRegistry::new();
        reg.register(Parameter::uri("petId"))
            .register(Parameter::header("X-Trace"))
            .register(Parameter::query("tag"))
            .register(Parameter::cookie("session"));
        reg
    }

    fn resolver() -> UriResolver {
        Arc::new(path_params_resolver)
    }

    #[test]
    fn test_undeclared_parameter_is_rejected() {
        let req = Request::new(Method::GET, "/pets/7?limit=5").with_path_param("petId", "7");
        let params = registry();
        let input = Input::new(&req, &params, None, None, None);
        assert!(matches!(
            input.query("limit"),
            Err(InputError::ParameterNotDefined { kind: ParamKind::Query, .. })
        ));
        assert!(matches!(
            input.header("petId"),
            Err(InputError::ParameterNotDefined { kind: ParamKind::Header, .. })
        ));
    }

    #[test]
    fn test_uri_param_requires_resolver() {
        let req = Request::new(Method::GET, "/pets/7").with_path_param("petId", "7");
        let params = registry();
        let without = Input::new(&req, &params, None, None, None);
        assert!(matches!(without.uri_param("petId"), Err(InputError::NoUriResolver)));

        let r = resolver();
        let with = Input::new(&req, &params, None, None, Some(&r));
        assert_eq!(with.uri_param("petId").unwrap().as_deref(), Some("7"));
    }

    #[test]
    fn test_declared_getters_read_request() {
        let req = Request::new(Method::GET, "/pets?tag=a&tag=b")
            .with_header("x-trace", "t-1")
            .with_header("Cookie", "session=abc");
        let params = registry();
        let input = Input::new(&req, &params, None, None, None);
        assert_eq!(input.header("X-Trace").unwrap(), Some("t-1"));
        assert_eq!(input.query("tag").unwrap(), Some("b"));
        assert_eq!(input.query_all("tag").unwrap(), vec!["a", "b"]);
        assert_eq!(input.cookie("session").unwrap(), Some("abc"));
    }

    #[test]
    fn test_body_requires_declaration() {
        let req = Request::new(Method::POST, "/pets").with_body("{}");
        let params = registry();
        let input = Input::new(&req, &params, None, None, None);
        assert!(matches!(input.raw_body(), Err(InputError::BodyNotDefined)));
    }

    #[test]
    fn test_body_decoding() {
        #[derive(Deserialize)]
        struct Pet {
            name: String,
        }

        let req = Request::new(Method::POST, "/pets")
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"Rex"}"#);
        let params = registry();
        let body = Parameter::body(TypeDescriptor::object("Pet"));
        let content = ContentTypeRegistry::json();
        let decoder = content.default_decoder().unwrap();
        let input = Input::new(&req, &params, Some(&body), Some(&decoder), None);
        assert_eq!(input.body::<Pet>().unwrap().name, "Rex");
        assert_eq!(input.body_value().unwrap()["name"], "Rex");

        let no_decoder = Input::new(&req, &params, Some(&body), None, None);
        assert!(matches!(no_decoder.body_value(), Err(InputError::NoDecoder)));
    }

    #[test]
    fn test_declared_body_absent_from_request() {
        let req = Request::new(Method::POST, "/pets");
        let params = registry();
        let body = Parameter::body(TypeDescriptor::Any);
        let input = Input::new(&req, &params, Some(&body), None, None);
        assert_eq!(input.raw_body().unwrap(), None);
        assert!(matches!(input.body_value(), Err(InputError::MissingBody)));
    }
}
