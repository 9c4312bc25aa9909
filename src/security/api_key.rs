use super::{AuthOutcome, Authenticator};
use crate::input::Input;
use crate::params::Parameter;
use std::collections::HashSet;
use tracing::debug;

/// Where an API key is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyLocation {
    Header,
    Query,
    Cookie,
}

impl ApiKeyLocation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ApiKeyLocation::Header => "header",
            ApiKeyLocation::Query => "query",
            ApiKeyLocation::Cookie => "cookie",
        }
    }
}

/// Static API key authenticator.
///
/// A missing or unknown key is an authentication failure. For header keys,
/// `Authorization: Bearer <key>` is accepted as well.
#[derive(Debug, Clone)]
pub struct ApiKeyAuthenticator {
    location: ApiKeyLocation,
    name: String,
    keys: HashSet<String>,
}

impl ApiKeyAuthenticator {
    pub fn new<I, K>(location: ApiKeyLocation, name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut name = name.into();
        if location == ApiKeyLocation::Header {
            name = name.to_ascii_lowercase();
        }
        Self {
            location,
            name,
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn header<I, K>(name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self::new(ApiKeyLocation::Header, name, keys)
    }

    pub fn query<I, K>(name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self::new(ApiKeyLocation::Query, name, keys)
    }

    pub fn cookie<I, K>(name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self::new(ApiKeyLocation::Cookie, name, keys)
    }

    #[must_use]
    pub fn location(&self) -> ApiKeyLocation {
        self.location
    }

    #[must_use]
    pub fn param_name(&self) -> &str {
        &self.name
    }

    fn extract_key<'a>(&self, input: &Input<'a>) -> Option<&'a str> {
        match self.location {
            ApiKeyLocation::Header => input.header(&self.name).ok().flatten().or_else(|| {
                input
                    .header("authorization")
                    .ok()
                    .flatten()
                    .and_then(|h| h.strip_prefix("Bearer "))
            }),
            ApiKeyLocation::Query => input.query(&self.name).ok().flatten(),
            ApiKeyLocation::Cookie => input.cookie(&self.name).ok().flatten(),
        }
    }
}

impl Authenticator for ApiKeyAuthenticator {
    fn authenticate(&self, input: &Input<'_>) -> AuthOutcome {
        let Some(key) = self.extract_key(input) else {
            debug!(location = self.location.as_str(), name = %self.name, "API key missing");
            return AuthOutcome::AuthenticationFailed;
        };
        if self.keys.contains(key) {
            AuthOutcome::Ok
        } else {
            debug!(location = self.location.as_str(), name = %self.name, "API key rejected");
            AuthOutcome::AuthenticationFailed
        }
    }

    fn parameters(&self) -> Vec<Parameter> {
        match self.location {
            ApiKeyLocation::Header => vec![
                Parameter::header(self.name.clone()),
                Parameter::header("authorization"),
            ],
            ApiKeyLocation::Query => vec![Parameter::query(self.name.clone())],
            ApiKeyLocation::Cookie => vec![Parameter::cookie(self.name.clone())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterRegistry;
    use crate::server::Request;
    use http::Method;

    fn check(auth: &ApiKeyAuthenticator, req: &Request) -> AuthOutcome {
        let mut params = ParameterRegistry::new();
        for p in auth.parameters() {
            params.register(p);
        }
        auth.authenticate(&Input::new(req, &params, None, None, None))
    }

    #[test]
    fn test_header_key() {
        let auth = ApiKeyAuthenticator::header("X-Api-Key", ["secret"]);
        let ok = Request::new(Method::GET, "/").with_header("x-api-key", "secret");
        assert_eq!(check(&auth, &ok), AuthOutcome::Ok);
        let bearer = Request::new(Method::GET, "/").with_header("Authorization", "Bearer secret");
        assert_eq!(check(&auth, &bearer), AuthOutcome::Ok);
        let wrong = Request::new(Method::GET, "/").with_header("X-API-KEY", "guess");
        assert_eq!(check(&auth, &wrong), AuthOutcome::AuthenticationFailed);
        let missing = Request::new(Method::GET, "/");
        assert_eq!(check(&auth, &missing), AuthOutcome::AuthenticationFailed);
    }

    #[test]
    fn test_query_and_cookie_keys() {
        let q = ApiKeyAuthenticator::query("api_key", ["k1", "k2"]);
        assert_eq!(check(&q, &Request::new(Method::GET, "/?api_key=k2")), AuthOutcome::Ok);
        let c = ApiKeyAuthenticator::cookie("session", ["abc"]);
        let req = Request::new(Method::GET, "/").with_header("Cookie", "theme=dark; session=abc");
        assert_eq!(check(&c, &req), AuthOutcome::Ok);
    }
}
