//! Per-request format negotiation.
//!
//! Encoder negotiation is best effort with a guaranteed fallback: a server must
//! always be able to answer, so an unusable `Accept` header degrades to the
//! registry default. Decoder negotiation is strict: a body whose format cannot
//! be identified is rejected rather than guessed at.

use super::registry::{ContentTypeRegistry, NegotiatedDecoder, NegotiatedEncoder};
use crate::server::Request;
use thiserror::Error;
use tracing::debug;

/// Format-preference header.
pub const ACCEPT: &str = "accept";
/// Format-declaration header.
pub const CONTENT_TYPE: &str = "content-type";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("no encoder available for accepted types [{accepted}]")]
    NoEncoder { accepted: String },
    #[error("request has a body but no content type")]
    MissingContentType,
    #[error("no decoder available for content type [{declared}]")]
    NoDecoder { declared: String },
}

/// Split a media-type list into bare type names, keeping header order.
///
/// Parameters such as `q=0.8` or `charset=utf-8` are stripped; weights do not
/// reorder the list.
#[must_use]
pub fn parse_media_list(header: &str) -> Vec<String> {
    header
        .split(',')
        .filter_map(|candidate| {
            let name = candidate.split(';').next()?.trim();
            (!name.is_empty()).then(|| name.to_ascii_lowercase())
        })
        .collect()
}

fn header_value<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.get_header(name).filter(|v| !v.trim().is_empty())
}

/// Choose the encoder for the response.
///
/// Absent or blank `Accept` means the default. Otherwise the first listed
/// candidate with a registered encoder wins; when none match the default is
/// tried before giving up.
pub fn negotiate_encoder(
    request: &Request,
    registry: &ContentTypeRegistry,
) -> Result<NegotiatedEncoder, NegotiationError> {
    let Some(accept) = header_value(request, ACCEPT) else {
        return registry
            .default_encoder()
            .map_err(|_| NegotiationError::NoEncoder {
                accepted: String::new(),
            });
    };

    for candidate in parse_media_list(accept) {
        if let Ok(found) = registry.match_encoder(&candidate) {
            debug!(
                accept = %accept,
                content_type = %found.content_type,
                "Encoder negotiated"
            );
            return Ok(found);
        }
    }

    registry
        .default_encoder()
        .map_err(|_| NegotiationError::NoEncoder {
            accepted: accept.to_string(),
        })
}

/// Choose the decoder for the request body.
///
/// A bodyless request resolves to the default decoder, or to `None` when no
/// default exists; that is not an error. A request with a body must declare
/// its `Content-Type`, and one of the declared candidates must be registered.
pub fn negotiate_decoder(
    request: &Request,
    registry: &ContentTypeRegistry,
) -> Result<Option<NegotiatedDecoder>, NegotiationError> {
    if !request.has_body() {
        return Ok(registry.default_decoder().ok());
    }

    let declared =
        header_value(request, CONTENT_TYPE).ok_or(NegotiationError::MissingContentType)?;

    parse_media_list(declared)
        .iter()
        .find_map(|candidate| registry.match_decoder(candidate).ok())
        .map(Some)
        .ok_or_else(|| NegotiationError::NoDecoder {
            declared: declared.to_string(),
        })
}
