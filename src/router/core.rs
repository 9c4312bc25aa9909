use crate::error::AssemblyError;
use crate::input::{path_params_resolver, UriResolver};
use crate::pipeline::ResourceMethod;
use crate::resource::Resource;
use crate::server::{ParamVec, Request};
use http::Method;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A request matched to a method, with the captured path segments.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub method: Arc<ResourceMethod>,
    /// Templated path of the matched route, e.g. `/pets/{petId}`
    pub pattern: Arc<str>,
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Store the captured segments on `request` for the URI resolver.
    pub fn apply(&self, request: &mut Request) {
        request.path_params = self.path_params.clone();
    }
}

/// Result of routing a request.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    Matched(RouteMatch),
    /// The path exists but not for this verb
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

#[derive(Clone)]
struct RouteEntry {
    method: Method,
    pattern: Arc<str>,
    regex: Regex,
    param_names: Vec<Arc<str>>,
    handler: Arc<ResourceMethod>,
}

/// Route table built from an assembled resource tree.
///
/// Routes are tried most specific first: fewer `{parameter}` segments win,
/// so `/pets/mine` is preferred over `/pets/{petId}`.
#[derive(Clone)]
pub struct Router {
    routes: Vec<RouteEntry>,
    resolver: UriResolver,
}

impl Router {
    pub fn new(root: &Resource) -> Result<Self, AssemblyError> {
        let mut routes = Vec::new();
        for (path, method) in root.routes() {
            let (regex, param_names) = Self::path_to_regex(&path)?;
            routes.push(RouteEntry {
                method: method.method().clone(),
                pattern: Arc::from(path.as_str()),
                regex,
                param_names: param_names.iter().map(|n| Arc::from(n.as_str())).collect(),
                handler: Arc::new(method.clone()),
            });
        }
        routes.sort_by_key(|r| r.param_names.len());

        let routes_summary: Vec<String> = routes
            .iter()
            .take(10)
            .map(|r| format!("{} {}", r.method, r.pattern))
            .collect();
        info!(
            routes_count = routes.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Ok(Self {
            routes,
            resolver: Arc::new(path_params_resolver),
        })
    }

    /// The resolver that reads segments stored by [`RouteMatch::apply`].
    #[must_use]
    pub fn resolver(&self) -> &UriResolver {
        &self.resolver
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// `(verb, pattern)` of every route, in matching order.
    pub fn patterns(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.routes.iter().map(|r| (&r.method, r.pattern.as_ref()))
    }

    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> RouteOutcome {
        debug!(method = %method, path = %path, "Route match attempt");
        let mut allowed = Vec::new();
        for entry in &self.routes {
            let Some(caps) = entry.regex.captures(path) else {
                continue;
            };
            if entry.method != *method {
                if !allowed.contains(&entry.method) {
                    allowed.push(entry.method.clone());
                }
                continue;
            }
            let path_params: ParamVec = entry
                .param_names
                .iter()
                .zip(caps.iter().skip(1))
                .filter_map(|(name, value)| {
                    value.map(|v| (Arc::clone(name), v.as_str().to_string()))
                })
                .collect();
            debug!(
                method = %method,
                path = %path,
                route_pattern = %entry.pattern,
                path_params = ?path_params,
                "Route matched"
            );
            return RouteOutcome::Matched(RouteMatch {
                method: Arc::clone(&entry.handler),
                pattern: Arc::clone(&entry.pattern),
                path_params,
            });
        }

        if allowed.is_empty() {
            warn!(method = %method, path = %path, "No route matched");
            RouteOutcome::NotFound
        } else {
            warn!(method = %method, path = %path, allowed = ?allowed, "Method not allowed");
            RouteOutcome::MethodNotAllowed { allowed }
        }
    }

    /// Convert a templated path to an anchored regex and its parameter names.
    ///
    /// `/users/{id}` becomes `^/users/([^/]+)$` with `["id"]`. Literal
    /// segments are escaped.
    pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<String>), AssemblyError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| AssemblyError::InvalidRoute {
                path: path.to_string(),
                reason: e.to_string(),
            })
        };
        if path == "/" {
            return Ok((compile(r"^/$")?, Vec::new()));
        }

        let mut pattern = String::with_capacity(path.len() + 5);
        pattern.push('^');
        let mut param_names = Vec::with_capacity(path.matches('{').count());

        for segment in path.split('/') {
            if segment.starts_with('{') && segment.ends_with('}') {
                let param_name = segment
                    .trim_start_matches('{')
                    .trim_end_matches('}')
                    .to_string();
                pattern.push_str("/([^/]+)");
                param_names.push(param_name);
            } else if !segment.is_empty() {
                pattern.push('/');
                pattern.push_str(&regex::escape(segment));
            }
        }

        pattern.push('$');
        Ok((compile(&pattern)?, param_names))
    }
}
