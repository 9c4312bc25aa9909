use std::time::Duration;

use crate::server::{HandlerResponse, Request};

/// Hooks run around a method pipeline.
///
/// `before` runs in order; the first one returning a response short-circuits
/// the pipeline. `after` runs for every middleware on the final response,
/// including short-circuited ones.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &Request) -> Option<HandlerResponse> {
        None
    }
    fn after(&self, _req: &Request, _res: &mut HandlerResponse, _latency: Duration) {}
}
