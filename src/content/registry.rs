use super::codec::{Decoder, Encoder, JsonCodec, APPLICATION_JSON};
use crate::response::Response;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Status of the registry's default "no common type" response.
pub const UNSUPPORTED_MEDIA_TYPE: u16 = 415;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentTypeError {
    #[error("no such content type: {0}")]
    NoSuchContentType(String),
}

/// A codec resolved for one request, together with the name it was registered under.
pub struct Negotiated<C: ?Sized> {
    pub content_type: String,
    pub codec: Arc<C>,
}

impl<C: ?Sized> Clone for Negotiated<C> {
    fn clone(&self) -> Self {
        Self {
            content_type: self.content_type.clone(),
            codec: Arc::clone(&self.codec),
        }
    }
}

impl<C: ?Sized> fmt::Debug for Negotiated<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Negotiated")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

pub type NegotiatedEncoder = Negotiated<dyn Encoder>;
pub type NegotiatedDecoder = Negotiated<dyn Decoder>;

/// MIME-type name to encoder/decoder capabilities for one method.
///
/// Encoders and decoders are addressed independently. The default of each
/// side is the last type registered with `default = true`; registering the
/// same name again silently replaces the previous entry. The registry is
/// filled during assembly and only read afterwards.
#[derive(Clone)]
pub struct ContentTypeRegistry {
    encoders: BTreeMap<String, Arc<dyn Encoder>>,
    decoders: BTreeMap<String, Arc<dyn Decoder>>,
    default_encoder: Option<String>,
    default_decoder: Option<String>,
    unsupported: Response,
}

impl Default for ContentTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContentTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentTypeRegistry")
            .field("encoders", &self.encoders.keys().collect::<Vec<_>>())
            .field("decoders", &self.decoders.keys().collect::<Vec<_>>())
            .field("default_encoder", &self.default_encoder)
            .field("default_decoder", &self.default_decoder)
            .field("unsupported", &self.unsupported.status())
            .finish()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

impl ContentTypeRegistry {
    /// An empty registry whose unsupported-type response is a 415 carrying the error message.
    #[must_use]
    pub fn new() -> Self {
        Self {
            encoders: BTreeMap::new(),
            decoders: BTreeMap::new(),
            default_encoder: None,
            default_decoder: None,
            unsupported: Response::new(UNSUPPORTED_MEDIA_TYPE)
                .with_description("Unsupported media type")
                .with_error_body(),
        }
    }

    /// `application/json` as the default encoder and decoder.
    #[must_use]
    pub fn json() -> Self {
        let mut registry = Self::new();
        registry.register(APPLICATION_JSON, JsonCodec, true);
        registry
    }

    pub fn register_encoder<E>(&mut self, name: &str, encoder: E, default: bool) -> &mut Self
    where
        E: Encoder + 'static,
    {
        self.register_encoder_arc(name, Arc::new(encoder), default)
    }

    pub fn register_encoder_arc(
        &mut self,
        name: &str,
        encoder: Arc<dyn Encoder>,
        default: bool,
    ) -> &mut Self {
        let name = normalize(name);
        if default {
            self.default_encoder = Some(name.clone());
        }
        self.encoders.insert(name, encoder);
        self
    }

    pub fn register_decoder<D>(&mut self, name: &str, decoder: D, default: bool) -> &mut Self
    where
        D: Decoder + 'static,
    {
        self.register_decoder_arc(name, Arc::new(decoder), default)
    }

    pub fn register_decoder_arc(
        &mut self,
        name: &str,
        decoder: Arc<dyn Decoder>,
        default: bool,
    ) -> &mut Self {
        let name = normalize(name);
        if default {
            self.default_decoder = Some(name.clone());
        }
        self.decoders.insert(name, decoder);
        self
    }

    /// Register one codec as both encoder and decoder.
    pub fn register<C>(&mut self, name: &str, codec: C, default: bool) -> &mut Self
    where
        C: Encoder + Decoder + 'static,
    {
        let codec = Arc::new(codec);
        self.register_encoder_arc(name, Arc::clone(&codec) as Arc<dyn Encoder>, default);
        self.register_decoder_arc(name, codec as Arc<dyn Decoder>, default)
    }

    /// Replace the response used when no common type can be agreed.
    pub fn set_unsupported_response(&mut self, response: Response) -> &mut Self {
        self.unsupported = response;
        self
    }

    #[must_use]
    pub fn unsupported_response(&self) -> &Response {
        &self.unsupported
    }

    /// Look up an encoder by exact (case-insensitive) name.
    pub fn encoder(&self, name: &str) -> Result<NegotiatedEncoder, ContentTypeError> {
        let name = normalize(name);
        self.encoders
            .get(&name)
            .map(|codec| Negotiated {
                content_type: name.clone(),
                codec: Arc::clone(codec),
            })
            .ok_or(ContentTypeError::NoSuchContentType(name))
    }

    /// Look up a decoder by exact (case-insensitive) name.
    pub fn decoder(&self, name: &str) -> Result<NegotiatedDecoder, ContentTypeError> {
        let name = normalize(name);
        self.decoders
            .get(&name)
            .map(|codec| Negotiated {
                content_type: name.clone(),
                codec: Arc::clone(codec),
            })
            .ok_or(ContentTypeError::NoSuchContentType(name))
    }

    pub fn default_encoder(&self) -> Result<NegotiatedEncoder, ContentTypeError> {
        match &self.default_encoder {
            Some(name) => self.encoder(name),
            None => Err(ContentTypeError::NoSuchContentType("default encoder".into())),
        }
    }

    pub fn default_decoder(&self) -> Result<NegotiatedDecoder, ContentTypeError> {
        match &self.default_decoder {
            Some(name) => self.decoder(name),
            None => Err(ContentTypeError::NoSuchContentType("default decoder".into())),
        }
    }

    /// Resolve a media range (`*/*`, `image/*` or an exact name) against the encoders.
    pub fn match_encoder(&self, range: &str) -> Result<NegotiatedEncoder, ContentTypeError> {
        match wildcard_pick(range, self.default_encoder.as_deref(), self.encoders.keys()) {
            Some(WildcardPick::Default) => self.default_encoder(),
            Some(WildcardPick::Name(name)) => self.encoder(&name),
            None => self.encoder(range),
        }
    }

    /// Resolve a media range against the decoders.
    pub fn match_decoder(&self, range: &str) -> Result<NegotiatedDecoder, ContentTypeError> {
        match wildcard_pick(range, self.default_decoder.as_deref(), self.decoders.keys()) {
            Some(WildcardPick::Default) => self.default_decoder(),
            Some(WildcardPick::Name(name)) => self.decoder(&name),
            None => self.decoder(range),
        }
    }

    /// Registered encoder names, sorted.
    pub fn encoder_types(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }

    /// Registered decoder names, sorted.
    pub fn decoder_types(&self) -> impl Iterator<Item = &str> {
        self.decoders.keys().map(String::as_str)
    }
}

enum WildcardPick {
    Default,
    Name(String),
}

/// `*/*` always means the default. `type/*` prefers the default when it shares
/// the type, otherwise the first registered name of that type. `None` means
/// the range is not a wildcard.
fn wildcard_pick<'a>(
    range: &str,
    default: Option<&str>,
    mut names: impl Iterator<Item = &'a String>,
) -> Option<WildcardPick> {
    let range = normalize(range);
    if range == "*/*" || range == "*" {
        return Some(WildcardPick::Default);
    }
    let prefix = range.strip_suffix("/*")?;
    let same_type = |name: &str| name.split('/').next() == Some(prefix);
    if default.is_some_and(same_type) {
        return Some(WildcardPick::Default);
    }
    Some(match names.find(|n| same_type(n.as_str())) {
        Some(name) => WildcardPick::Name(name.clone()),
        // An unmatched range falls through to an exact lookup, which reports it.
        None => WildcardPick::Name(range),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::codec::{TextCodec, YamlCodec, APPLICATION_YAML, TEXT_PLAIN};

    #[test]
    fn test_register_default_then_get_default() {
        let mut reg = ContentTypeRegistry::new();
        reg.register(APPLICATION_JSON, JsonCodec, true);
        assert_eq!(reg.default_encoder().unwrap().content_type, APPLICATION_JSON);
        assert_eq!(reg.default_decoder().unwrap().content_type, APPLICATION_JSON);
    }

    #[test]
    fn test_last_default_wins() {
        let mut reg = ContentTypeRegistry::new();
        reg.register(APPLICATION_JSON, JsonCodec, true);
        reg.register(APPLICATION_YAML, YamlCodec, true);
        reg.register(TEXT_PLAIN, TextCodec, false);
        assert_eq!(reg.default_encoder().unwrap().content_type, APPLICATION_YAML);
        assert_eq!(reg.default_decoder().unwrap().content_type, APPLICATION_YAML);
    }

    #[test]
    fn test_encoder_and_decoder_are_independent() {
        let mut reg = ContentTypeRegistry::new();
        reg.register_encoder(TEXT_PLAIN, TextCodec, true);
        assert!(reg.encoder(TEXT_PLAIN).is_ok());
        assert_eq!(
            reg.decoder(TEXT_PLAIN).unwrap_err(),
            ContentTypeError::NoSuchContentType(TEXT_PLAIN.into())
        );
        assert!(reg.default_decoder().is_err());
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut reg = ContentTypeRegistry::new();
        reg.register_encoder(APPLICATION_JSON, JsonCodec, false);
        reg.register_encoder(APPLICATION_JSON, TextCodec, false);
        assert_eq!(reg.encoder_types().count(), 1);
        let mut buf = Vec::new();
        let enc = reg.encoder("Application/JSON").unwrap();
        enc.codec.encode(&mut buf, &serde_json::json!("x")).unwrap();
        assert_eq!(buf, b"x");
    }

    #[test]
    fn test_unset_default_is_error_not_panic() {
        let reg = ContentTypeRegistry::new();
        assert!(reg.default_encoder().is_err());
        assert!(reg.default_decoder().is_err());
        assert_eq!(reg.unsupported_response().status(), UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_wildcards() {
        let mut reg = ContentTypeRegistry::new();
        reg.register(APPLICATION_JSON, JsonCodec, true);
        reg.register(TEXT_PLAIN, TextCodec, false);
        assert_eq!(reg.match_encoder("*/*").unwrap().content_type, APPLICATION_JSON);
        assert_eq!(reg.match_encoder("application/*").unwrap().content_type, APPLICATION_JSON);
        assert_eq!(reg.match_encoder("text/*").unwrap().content_type, TEXT_PLAIN);
        assert!(reg.match_encoder("image/*").is_err());
    }
}
