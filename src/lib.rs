//! # restpipe
//!
//! **restpipe** executes declared REST methods. A method is declared once:
//! its content types, parameters, security schemes, validators, success and
//! fail responses and the operation that does the work. Every request served
//! by it then runs the same pipeline:
//!
//! ```text
//! Negotiating -> SecurityCheck -> Validating -> Executing -> Responding
//! ```
//!
//! Methods are attached to a tree of [`resource::Resource`]s. Middleware and
//! a security-override hook declared on a resource are inherited by
//! everything attached below it afterwards.
//!
//! ## Architecture
//!
//! - **[`content`]** - Encoder/decoder registry and `Accept`/`Content-Type` negotiation
//! - **[`params`]** - Declared parameters keyed by kind and name
//! - **[`input`]** - The only path from an operation to request data
//! - **[`security`]** - Security schemes evaluated with OR semantics
//! - **[`validation`]** - Ordered validators, first failure wins
//! - **[`response`]** - Declared responses and body mutation
//! - **[`pipeline`]** - The per-request state machine and [`pipeline::MethodBuilder`]
//! - **[`resource`]** - Resource tree composition
//! - **[`router`]**, **[`dispatcher`]**, **[`server`]** - Route table, per-request
//!   `may` coroutines and the [`server::Service`] facade
//! - **[`openapi`]** - Type descriptors and the OpenAPI 3.1 renderer
//! - **[`middleware`]** - Metrics and tracing middleware
//! - **[`runtime_config`]**, **[`telemetry`]** - Configuration and logging
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use restpipe::params::Parameter;
//! use restpipe::pipeline::{Outcome, ResourceMethod};
//! use restpipe::resource::Resource;
//! use restpipe::response::Response;
//! use restpipe::runtime_config::RuntimeConfig;
//! use restpipe::server::{Request, Service};
//! use serde_json::json;
//!
//! let get_pet = ResourceMethod::builder(Method::GET)
//!     .parameter(Parameter::uri("petId"))
//!     .operation_fn(|input| {
//!         let id = input.uri_param("petId")?.unwrap_or_default();
//!         if id == "1" {
//!             Ok(Outcome::ok(json!({"id": 1, "name": "Rex"})))
//!         } else {
//!             Ok(Outcome::fail())
//!         }
//!     })
//!     .fail(Response::new(404))
//!     .build()
//!     .unwrap();
//!
//! let mut pet = Resource::new("{petId}").unwrap();
//! pet.add_method(get_pet);
//! let mut pets = Resource::new("pets").unwrap();
//! pets.add_child(pet);
//! let mut root = Resource::root();
//! root.add_child(pets);
//!
//! let service = Service::new(&root, &RuntimeConfig::default()).unwrap();
//! let res = service.handle(Request::new(Method::GET, "/pets/1")).unwrap();
//! assert_eq!(res.status, 200);
//! let res = service.handle(Request::new(Method::GET, "/pets/2")).unwrap();
//! assert_eq!(res.status, 404);
//! ```
//!
//! ## Error Handling
//!
//! Declaration mistakes (bad status codes, a method without an operation,
//! invalid resource names or schemas) are reported by the builders as
//! [`error::AssemblyError`] before anything is served. At request time every
//! failure maps to a declared response, with one exception: an operation
//! that soft-fails on a method with no fail response panics, and the
//! dispatcher reports it as [`dispatcher::DispatchError::HandlerPanicked`].

pub mod content;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod input;
pub mod middleware;
pub mod openapi;
pub mod params;
pub mod pipeline;
pub mod resource;
pub mod response;
pub mod router;
pub mod runtime_config;
pub mod security;
pub mod server;
pub mod telemetry;
pub mod validation;

pub use error::AssemblyError;
pub use input::{Input, InputError, UriResolver};
pub use pipeline::{MethodBuilder, Operation, Outcome, ResourceMethod};
pub use resource::Resource;
pub use response::Response;
pub use server::{HandlerResponse, Request, Service};
