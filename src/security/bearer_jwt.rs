use super::{AuthOutcome, Authenticator};
use crate::input::Input;
use crate::params::Parameter;
use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;
use tracing::{debug, warn};

/// Bearer token authenticator for tokens in the `Authorization` header or a
/// cookie.
///
/// Tokens have the form `header.payload.signature`; the signature part must
/// equal the configured `signature` string and the payload is JSON with an
/// optional whitespace separated `scope` field. A missing, malformed or
/// mis-signed token fails authentication; a valid token lacking a required
/// scope fails authorization.
#[derive(Debug, Clone)]
pub struct BearerJwtAuthenticator {
    signature: String,
    cookie_name: Option<String>,
    scopes: Vec<String>,
}

impl BearerJwtAuthenticator {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            cookie_name: None,
            scopes: Vec::new(),
        }
    }

    /// Also read the token from this cookie, before the header.
    #[must_use]
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = Some(name.into());
        self
    }

    /// Scopes the token must carry.
    #[must_use]
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    fn extract_token<'a>(&self, input: &Input<'a>) -> Option<&'a str> {
        if let Some(name) = &self.cookie_name {
            if let Some(t) = input.cookie(name).ok().flatten() {
                return Some(t);
            }
        }
        input
            .header("authorization")
            .ok()
            .flatten()
            .and_then(|h| h.strip_prefix("Bearer "))
    }

    fn decode_payload(payload: &str) -> Option<Vec<u8>> {
        general_purpose::URL_SAFE_NO_PAD
            .decode(payload)
            .or_else(|_| general_purpose::STANDARD.decode(payload))
            .ok()
    }

    pub(crate) fn validate_token(&self, token: &str) -> AuthOutcome {
        let mut parts = token.split('.');
        let (Some(_header), Some(payload), Some(sig), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            debug!("Bearer token rejected: malformed token");
            return AuthOutcome::AuthenticationFailed;
        };
        if sig != self.signature {
            debug!("Bearer token rejected: invalid signature");
            return AuthOutcome::AuthenticationFailed;
        }
        let Some(payload_bytes) = Self::decode_payload(payload) else {
            debug!("Bearer token rejected: invalid base64 payload");
            return AuthOutcome::AuthenticationFailed;
        };
        let json: Value = match serde_json::from_slice(&payload_bytes) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "Bearer token rejected: invalid JSON payload");
                return AuthOutcome::AuthenticationFailed;
            }
        };
        let token_scopes = json.get("scope").and_then(|v| v.as_str()).unwrap_or("");
        let has_all_scopes = self
            .scopes
            .iter()
            .all(|s| token_scopes.split_whitespace().any(|ts| ts == s));

        if has_all_scopes {
            AuthOutcome::Ok
        } else {
            warn!(
                token_scopes = %token_scopes,
                required = ?self.scopes,
                "Bearer token lacks required scopes"
            );
            AuthOutcome::AuthorizationFailed
        }
    }
}

impl Authenticator for BearerJwtAuthenticator {
    fn authenticate(&self, input: &Input<'_>) -> AuthOutcome {
        match self.extract_token(input) {
            Some(token) => self.validate_token(token),
            None => {
                debug!("Bearer token missing (no Authorization header or cookie)");
                AuthOutcome::AuthenticationFailed
            }
        }
    }

    fn parameters(&self) -> Vec<Parameter> {
        let mut params = vec![Parameter::header("authorization")];
        if let Some(name) = &self.cookie_name {
            params.push(Parameter::cookie(name.clone()));
        }
        params
    }

    fn scopes(&self) -> Vec<String> {
        self.scopes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterRegistry;
    use crate::server::Request;
    use http::Method;

    fn token(payload: &Value, sig: &str) -> String {
        let body = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("e30.{body}.{sig}")
    }

    fn check(auth: &BearerJwtAuthenticator, req: &Request) -> AuthOutcome {
        let mut params = ParameterRegistry::new();
        for p in auth.parameters() {
            params.register(p);
        }
        auth.authenticate(&Input::new(req, &params, None, None, None))
    }

    fn bearer(token: &str) -> Request {
        Request::new(Method::GET, "/").with_header("Authorization", format!("Bearer {token}"))
    }

    #[test]
    fn test_valid_token_with_scopes() {
        let auth = BearerJwtAuthenticator::new("sig").scopes(["read", "write"]);
        let t = token(&serde_json::json!({"scope": "write read admin"}), "sig");
        assert_eq!(check(&auth, &bearer(&t)), AuthOutcome::Ok);
    }

    #[test]
    fn test_missing_scope_is_authorization_failure() {
        let auth = BearerJwtAuthenticator::new("sig").scopes(["admin"]);
        let t = token(&serde_json::json!({"scope": "read"}), "sig");
        assert_eq!(check(&auth, &bearer(&t)), AuthOutcome::AuthorizationFailed);
    }

    #[test]
    fn test_bad_tokens_are_authentication_failures() {
        let auth = BearerJwtAuthenticator::new("sig");
        let wrong_sig = token(&serde_json::json!({}), "other");
        assert_eq!(check(&auth, &bearer(&wrong_sig)), AuthOutcome::AuthenticationFailed);
        assert_eq!(check(&auth, &bearer("not-a-jwt")), AuthOutcome::AuthenticationFailed);
        assert_eq!(check(&auth, &bearer("a.!!!.sig")), AuthOutcome::AuthenticationFailed);
        assert_eq!(
            check(&auth, &Request::new(Method::GET, "/")),
            AuthOutcome::AuthenticationFailed
        );
    }

    #[test]
    fn test_extra_segments_are_rejected() {
        let auth = BearerJwtAuthenticator::new("sig");
        let t = token(&serde_json::json!({}), "sig");
        assert_eq!(check(&auth, &bearer(&t)), AuthOutcome::Ok);
        assert_eq!(
            check(&auth, &bearer(&format!("{t}.extra"))),
            AuthOutcome::AuthenticationFailed
        );
    }

    #[test]
    fn test_cookie_token() {
        let auth = BearerJwtAuthenticator::new("sig").cookie_name("auth_token");
        let t = token(&serde_json::json!({}), "sig");
        let req = Request::new(Method::GET, "/").with_header("Cookie", format!("auth_token={t}"));
        assert_eq!(check(&auth, &req), AuthOutcome::Ok);
    }
}
