//! # Router Module
//!
//! Flattens an assembled [`Resource`](crate::resource::Resource) tree into a
//! route table and matches requests against it.
//!
//! ## Overview
//!
//! At construction every `(verb, templated path)` pair of the tree is
//! compiled into an anchored regex; `{name}` segments become capture groups.
//! Matching returns one of:
//!
//! - [`RouteOutcome::Matched`] with the method and captured segments
//! - [`RouteOutcome::MethodNotAllowed`] when the path exists for other verbs
//! - [`RouteOutcome::NotFound`]
//!
//! The router also supplies the [`UriResolver`](crate::input::UriResolver)
//! methods use to read URI parameters: [`RouteMatch::apply`] stores the
//! captured segments on the request and the resolver reads them back.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use restpipe::pipeline::{Outcome, ResourceMethod};
//! use restpipe::resource::Resource;
//! use restpipe::router::{RouteOutcome, Router};
//!
//! let mut pet = Resource::new("{petId}").unwrap();
//! pet.add_method(
//!     ResourceMethod::builder(Method::GET)
//!         .operation_fn(|_input| Ok(Outcome::ok_empty()))
//!         .build()
//!         .unwrap(),
//! );
//! let mut pets = Resource::new("pets").unwrap();
//! pets.add_child(pet);
//! let mut root = Resource::root();
//! root.add_child(pets);
//!
//! let router = Router::new(&root).unwrap();
//! match router.route(&Method::GET, "/pets/42") {
//!     RouteOutcome::Matched(m) => assert_eq!(m.path_params[0].1, "42"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

mod core;

pub use core::{RouteMatch, RouteOutcome, Router};
