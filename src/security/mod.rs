//! # Security Module
//!
//! Authentication and authorization for resource methods.
//!
//! ## Overview
//!
//! A method carries a [`SecurityChain`]: zero or more [`SecurityScheme`]s
//! evaluated in declaration order with OR semantics. The first scheme whose
//! [`Authenticator`] returns [`AuthOutcome::Ok`] admits the request. A failing
//! scheme records its own failure response, which differs for
//! authentication (`401`) and authorization (`403`) failures, and the chain
//! moves on. When every scheme fails, the response recorded by the last
//! scheme is sent.
//!
//! Built-in authenticators:
//! - [`ApiKeyAuthenticator`] - static keys in a header, query parameter or cookie
//! - [`BearerJwtAuthenticator`] - `header.payload.signature` tokens with scope checks
//!
//! Authenticators read credentials through [`Input`] like any operation does,
//! so each one declares the parameters it needs; attaching a scheme to a
//! method registers them.
//!
//! ## Example
//!
//! ```rust
//! use restpipe::security::{ApiKeyAuthenticator, BearerJwtAuthenticator, SecurityChain, SecurityScheme};
//!
//! let mut chain = SecurityChain::default();
//! chain.push(SecurityScheme::api_key("apiKey", ApiKeyAuthenticator::header("X-Api-Key", ["secret"])));
//! chain.push(SecurityScheme::bearer("bearerAuth", BearerJwtAuthenticator::new("sig").scopes(["pets:read"])));
//! assert_eq!(chain.len(), 2);
//! ```

use crate::input::Input;
use crate::params::Parameter;
use crate::response::Response;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

mod api_key;
mod bearer_jwt;

pub use api_key::{ApiKeyAuthenticator, ApiKeyLocation};
pub use bearer_jwt::BearerJwtAuthenticator;

/// Status of the default authentication-failure response.
pub const UNAUTHORIZED: u16 = 401;
/// Status of the default authorization-failure response.
pub const FORBIDDEN: u16 = 403;

/// Result of one authenticator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Ok,
    /// Credentials missing or not valid
    AuthenticationFailed,
    /// Valid credentials without the required rights
    AuthorizationFailed,
}

impl fmt::Display for AuthOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthOutcome::Ok => "authorized",
            AuthOutcome::AuthenticationFailed => "authentication failed",
            AuthOutcome::AuthorizationFailed => "authorization failed",
        })
    }
}

/// Checks the credentials of a request.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, input: &Input<'_>) -> AuthOutcome;

    /// Parameters this authenticator reads; registered on every method the
    /// scheme is attached to.
    fn parameters(&self) -> Vec<Parameter> {
        Vec::new()
    }

    /// Scopes listed in the method's documented security requirement.
    fn scopes(&self) -> Vec<String> {
        Vec::new()
    }
}

struct FnAuthenticator<F>(F);

impl<F> Authenticator for FnAuthenticator<F>
where
    F: Fn(&Input<'_>) -> AuthOutcome + Send + Sync,
{
    fn authenticate(&self, input: &Input<'_>) -> AuthOutcome {
        (self.0)(input)
    }
}

/// How a scheme is documented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeKind {
    ApiKey {
        location: ApiKeyLocation,
        name: String,
    },
    HttpBearer {
        bearer_format: Option<String>,
    },
    HttpBasic,
    /// Application-specific; documented by its description only
    Custom {
        description: Option<String>,
    },
}

/// One named authentication strategy with its two failure responses.
#[derive(Clone)]
pub struct SecurityScheme {
    pub name: String,
    pub kind: SchemeKind,
    pub authenticator: Arc<dyn Authenticator>,
    pub authentication_failure: Response,
    pub authorization_failure: Response,
}

impl fmt::Debug for SecurityScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityScheme")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("authentication_failure", &self.authentication_failure.status())
            .field("authorization_failure", &self.authorization_failure.status())
            .finish_non_exhaustive()
    }
}

impl SecurityScheme {
    pub fn new(
        name: impl Into<String>,
        kind: SchemeKind,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            authenticator,
            authentication_failure: Response::new(UNAUTHORIZED).with_error_body(),
            authorization_failure: Response::new(FORBIDDEN).with_error_body(),
        }
    }

    pub fn api_key(name: impl Into<String>, authenticator: ApiKeyAuthenticator) -> Self {
        let kind = SchemeKind::ApiKey {
            location: authenticator.location(),
            name: authenticator.param_name().to_string(),
        };
        Self::new(name, kind, Arc::new(authenticator))
    }

    pub fn bearer(name: impl Into<String>, authenticator: BearerJwtAuthenticator) -> Self {
        let kind = SchemeKind::HttpBearer {
            bearer_format: Some("JWT".to_string()),
        };
        Self::new(name, kind, Arc::new(authenticator))
    }

    /// A custom scheme backed by a closure.
    pub fn custom<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Input<'_>) -> AuthOutcome + Send + Sync + 'static,
    {
        Self::new(
            name,
            SchemeKind::Custom { description: None },
            Arc::new(FnAuthenticator(f)),
        )
    }

    #[must_use]
    pub fn with_authentication_failure(mut self, response: Response) -> Self {
        self.authentication_failure = response;
        self
    }

    #[must_use]
    pub fn with_authorization_failure(mut self, response: Response) -> Self {
        self.authorization_failure = response;
        self
    }

    fn reject(&self, outcome: AuthOutcome) -> SecurityRejection {
        let response = match outcome {
            AuthOutcome::AuthorizationFailed => self.authorization_failure.clone(),
            _ => self.authentication_failure.clone(),
        };
        SecurityRejection {
            scheme: self.name.clone(),
            outcome,
            response,
        }
    }
}

/// Why a request was refused and the response to send.
#[derive(Debug, Clone, Error)]
#[error("{outcome} for security scheme '{scheme}'")]
pub struct SecurityRejection {
    pub scheme: String,
    pub outcome: AuthOutcome,
    pub response: Response,
}

/// Replaces the default security step of every method declared under a
/// resource that sets it.
pub type SecurityHook =
    Arc<dyn Fn(&SecurityChain, &Input<'_>) -> Result<(), SecurityRejection> + Send + Sync>;

/// Ordered security schemes of one method.
#[derive(Debug, Clone, Default)]
pub struct SecurityChain {
    schemes: Vec<SecurityScheme>,
}

impl SecurityChain {
    /// Append a scheme; order of declaration is order of evaluation.
    pub fn push(&mut self, scheme: SecurityScheme) {
        self.schemes.push(scheme);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    pub fn schemes(&self) -> impl Iterator<Item = &SecurityScheme> {
        self.schemes.iter()
    }

    /// Admit the request if any scheme accepts it. An empty chain admits
    /// everything.
    pub fn evaluate(&self, input: &Input<'_>) -> Result<(), SecurityRejection> {
        let mut last = None;
        for scheme in &self.schemes {
            match scheme.authenticator.authenticate(input) {
                AuthOutcome::Ok => {
                    debug!(
                        request_id = %input.request_id(),
                        scheme = %scheme.name,
                        "Security scheme accepted request"
                    );
                    return Ok(());
                }
                outcome => {
                    debug!(
                        request_id = %input.request_id(),
                        scheme = %scheme.name,
                        outcome = %outcome,
                        "Security scheme refused request"
                    );
                    last = Some(scheme.reject(outcome));
                }
            }
        }
        last.map_or(Ok(()), Err)
    }
}
