//! The declared resource tree.
//!
//! A [`Resource`] is one path segment. It owns its child resources and its
//! methods (one per HTTP verb). Middleware and a security-override hook set
//! on a resource are inherited, at the moment of attachment, by every method
//! and child added to it afterwards:
//!
//! - inherited middleware is prepended, so the outermost resource runs first
//! - a method or child that has no security hook of its own adopts the
//!   resource's; the nearest hook wins
//!
//! Inheritance is a snapshot. Middleware or a hook declared on a resource
//! after a child was added does not reach that child. Re-declaring a child
//! name or a method verb replaces the earlier entry.

use crate::error::AssemblyError;
use crate::input::Input;
use crate::middleware::Middleware;
use crate::pipeline::ResourceMethod;
use crate::security::{SecurityChain, SecurityHook, SecurityRejection};
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

static SEGMENT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^(?:\{[A-Za-z_][A-Za-z0-9_.\-]*\}|[A-Za-z0-9._~\-]+)$").ok()
});

fn check_name(name: &str) -> Result<(), AssemblyError> {
    let invalid = |reason| AssemblyError::InvalidResourceName {
        name: name.to_string(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    match SEGMENT.as_ref() {
        Some(re) if re.is_match(name) => Ok(()),
        Some(_) => Err(invalid(
            "expected a literal path segment or a single {parameter}",
        )),
        None => Err(invalid("segment pattern unavailable")),
    }
}

/// A node in the API path tree.
#[derive(Clone, Default)]
pub struct Resource {
    name: String,
    description: Option<String>,
    children: BTreeMap<String, Resource>,
    methods: BTreeMap<String, ResourceMethod>,
    middleware: Vec<Arc<dyn Middleware>>,
    security_hook: Option<SecurityHook>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("children", &self.children)
            .field("middleware", &self.middleware.len())
            .field("security_hook", &self.security_hook.is_some())
            .finish()
    }
}

impl Resource {
    /// A named path segment: a literal such as `pets` or a parameter such as
    /// `{petId}`.
    pub fn new(name: impl Into<String>) -> Result<Self, AssemblyError> {
        let name = name.into();
        check_name(&name)?;
        Ok(Self {
            name,
            ..Self::default()
        })
    }

    /// The unnamed root, served at `/`.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// True when this segment is a `{parameter}`.
    #[must_use]
    pub fn is_parameter(&self) -> bool {
        self.name.starts_with('{')
    }

    /// Middleware for methods and children added from now on.
    pub fn add_middleware<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        self.add_middleware_arc(Arc::new(middleware))
    }

    pub fn add_middleware_arc(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Replace the default security step of methods and children added from
    /// now on. The hook receives the method's own chain, so it can still
    /// delegate to [`SecurityChain::evaluate`].
    pub fn override_security<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&SecurityChain, &Input<'_>) -> Result<(), SecurityRejection> + Send + Sync + 'static,
    {
        self.set_security_hook(Arc::new(hook))
    }

    pub fn set_security_hook(&mut self, hook: SecurityHook) -> &mut Self {
        self.security_hook = Some(hook);
        self
    }

    #[must_use]
    pub fn has_security_hook(&self) -> bool {
        self.security_hook.is_some()
    }

    pub fn add_method(&mut self, mut method: ResourceMethod) -> &mut Self {
        method.prepend_middleware(&self.middleware);
        method.inherit_security_hook(self.security_hook.as_ref());
        let verb = method.method().to_string();
        if self.methods.insert(verb.clone(), method).is_some() {
            warn!(resource = %self.name, method = %verb, "Method re-declared; replacing");
        } else {
            debug!(resource = %self.name, method = %verb, "Method added");
        }
        self
    }

    pub fn add_child(&mut self, mut child: Resource) -> &mut Self {
        child.inherit(&self.middleware, self.security_hook.as_ref());
        let name = child.name.clone();
        if self.children.insert(name.clone(), child).is_some() {
            warn!(resource = %self.name, child = %name, "Child resource re-declared; replacing");
        } else {
            debug!(resource = %self.name, child = %name, "Child resource added");
        }
        self
    }

    fn inherit(&mut self, middleware: &[Arc<dyn Middleware>], hook: Option<&SecurityHook>) {
        if !middleware.is_empty() {
            let own = std::mem::take(&mut self.middleware);
            self.middleware = middleware.iter().map(Arc::clone).chain(own).collect();
        }
        if self.security_hook.is_none() {
            self.security_hook = hook.map(Arc::clone);
        }
        for method in self.methods.values_mut() {
            method.prepend_middleware(middleware);
            method.inherit_security_hook(hook);
        }
        for child in self.children.values_mut() {
            child.inherit(middleware, hook);
        }
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Resource> {
        self.children.get(name)
    }

    pub fn children(&self) -> impl Iterator<Item = &Resource> {
        self.children.values()
    }

    #[must_use]
    pub fn method(&self, method: &Method) -> Option<&ResourceMethod> {
        self.methods.get(method.as_str())
    }

    pub fn methods(&self) -> impl Iterator<Item = &ResourceMethod> {
        self.methods.values()
    }

    /// Every method in the tree with its full templated path, parents before
    /// children, siblings in name order.
    #[must_use]
    pub fn routes(&self) -> Vec<(String, &ResourceMethod)> {
        let mut out = Vec::new();
        self.collect_routes("", &mut out);
        out
    }

    fn collect_routes<'a>(&'a self, parent: &str, out: &mut Vec<(String, &'a ResourceMethod)>) {
        let path = if self.name.is_empty() {
            parent.to_string()
        } else {
            format!("{parent}/{}", self.name)
        };
        let shown = if path.is_empty() { "/" } else { path.as_str() };
        for method in self.methods.values() {
            out.push((shown.to_string(), method));
        }
        for child in self.children.values() {
            child.collect_routes(&path, out);
        }
    }
}
