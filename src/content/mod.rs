//! # Content Module
//!
//! Content-type capabilities of a method and the per-request negotiation that
//! picks one of them.
//!
//! - [`ContentTypeRegistry`] maps MIME-type names to [`Encoder`]s and
//!   [`Decoder`]s, with one default of each and the response to send when no
//!   common type can be agreed.
//! - [`negotiate_encoder`] reads `Accept` and always has a fallback.
//! - [`negotiate_decoder`] reads `Content-Type` and is strict when a body is
//!   present.
//! - [`FormCodec`] and [`MultipartCodec`] decode HTML form submissions; methods
//!   declaring form or file parameters register them automatically.
//!
//! ```rust
//! use restpipe::content::{ContentTypeRegistry, JsonCodec, YamlCodec};
//!
//! let mut registry = ContentTypeRegistry::new();
//! registry.register("application/json", JsonCodec, true);
//! registry.register("application/yaml", YamlCodec, false);
//! assert_eq!(registry.default_encoder().unwrap().content_type, "application/json");
//! ```

mod codec;
mod form;
mod negotiate;
mod registry;

pub use codec::{
    CodecError, Decoder, Encoder, JsonCodec, TextCodec, YamlCodec, APPLICATION_JSON,
    APPLICATION_YAML, TEXT_PLAIN,
};
pub use form::{
    parse_multipart, FormCodec, MultipartCodec, MultipartForm, FORM_URLENCODED,
    MULTIPART_FORM_DATA,
};
pub use negotiate::{
    negotiate_decoder, negotiate_encoder, parse_media_list, NegotiationError, ACCEPT,
    CONTENT_TYPE,
};
pub use registry::{
    ContentTypeError, ContentTypeRegistry, Negotiated, NegotiatedDecoder, NegotiatedEncoder,
    UNSUPPORTED_MEDIA_TYPE,
};
