//! # OpenAPI Module
//!
//! Documentation for an assembled resource tree.
//!
//! - [`describe`] turns a [`TypeDescriptor`] into a JSON schema, resolving
//!   object field names through a [`NamingStrategy`]
//! - [`render`] walks the tree and emits an OpenAPI 3.1 document: paths,
//!   parameters, request bodies per decoder type, responses per encoder type
//!   and security requirements
//!
//! ```rust
//! use restpipe::openapi::{json_schema, Describe};
//!
//! let schema = json_schema(&Vec::<i64>::type_descriptor());
//! assert_eq!(schema["type"], "array");
//! assert_eq!(schema["items"]["type"], "integer");
//! ```

mod describe;
mod render;

pub use describe::{
    describe, field_name, json_schema, tag_or_field_name, Describe, FieldDescriptor,
    NamingStrategy, Primitive, SchemaNode, TypeDescriptor,
};
pub use render::{render, DocInfo, OPENAPI_VERSION};
