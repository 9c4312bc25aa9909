//! Request and response models plus the [`Service`] facade that ties the
//! router and dispatcher together.

pub(crate) mod request;
pub(crate) mod response;
mod service;

pub use request::{
    parse_cookies, parse_query_params, HeaderVec, ParamVec, Request, UploadedFile,
    MAX_INLINE_HEADERS, MAX_INLINE_PARAMS,
};
pub use response::HandlerResponse;
pub use service::Service;
