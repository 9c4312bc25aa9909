use super::request::Request;
use super::response::HandlerResponse;
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::error::AssemblyError;
use crate::openapi::{render, DocInfo};
use crate::resource::Resource;
use crate::router::{RouteOutcome, Router};
use crate::runtime_config::RuntimeConfig;
use http::header::{HeaderName, HeaderValue};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, warn};

/// Routes requests through an assembled resource tree.
///
/// Built once at startup; cheap to clone and share across connections.
#[derive(Clone)]
pub struct Service {
    router: Arc<Router>,
    dispatcher: Dispatcher,
    openapi: Arc<Value>,
}

impl Service {
    /// Flatten `root` into a route table and render its OpenAPI document.
    pub fn new(root: &Resource, config: &RuntimeConfig) -> Result<Self, AssemblyError> {
        Self::with_docs(root, config, &DocInfo::default())
    }

    pub fn with_docs(
        root: &Resource,
        config: &RuntimeConfig,
        docs: &DocInfo,
    ) -> Result<Self, AssemblyError> {
        Ok(Self {
            router: Arc::new(Router::new(root)?),
            dispatcher: Dispatcher::new(config.stack_size),
            openapi: Arc::new(render(root, docs)),
        })
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// The rendered OpenAPI 3.1 document of the tree.
    #[must_use]
    pub fn openapi(&self) -> &Value {
        &self.openapi
    }

    /// Route and serve one request.
    ///
    /// Unknown paths get 404; a known path with an undeclared verb gets 405
    /// with an `Allow` header. A pipeline panic is passed back as
    /// [`DispatchError::HandlerPanicked`].
    pub fn handle(&self, mut request: Request) -> Result<HandlerResponse, DispatchError> {
        match self.router.route(&request.method, &request.path) {
            RouteOutcome::Matched(route) => {
                route.apply(&mut request);
                let resolver = Arc::clone(self.router.resolver());
                self.dispatcher
                    .dispatch(Arc::clone(&route.method), request, Some(resolver))
            }
            RouteOutcome::MethodNotAllowed { allowed } => {
                let mut res = HandlerResponse::error(405, "Method Not Allowed");
                let allow: Vec<&str> = allowed.iter().map(http::Method::as_str).collect();
                res.set_header("allow", allow.join(", "));
                Ok(res)
            }
            RouteOutcome::NotFound => Ok(HandlerResponse::error(404, "Not Found")),
        }
    }

    /// Adapter for servers speaking the `http` crate types.
    ///
    /// A pipeline panic is answered with a 500 here; the defect has
    /// already been logged by the dispatcher.
    #[must_use]
    pub fn handle_http(&self, req: http::Request<Vec<u8>>) -> http::Response<Vec<u8>> {
        let response = match self.handle(Request::from_http(req)) {
            Ok(res) => res,
            Err(e) => {
                warn!(error = %e, "Request failed without a response");
                HandlerResponse::error(500, "Internal Server Error")
            }
        };
        into_http(response)
    }
}

fn into_http(res: HandlerResponse) -> http::Response<Vec<u8>> {
    let mut out = http::Response::new(res.body);
    *out.status_mut() =
        http::StatusCode::from_u16(res.status).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
    for (name, value) in &res.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                out.headers_mut().append(name, value);
            }
            _ => error!(header = %name, "Dropping invalid response header"),
        }
    }
    out
}
