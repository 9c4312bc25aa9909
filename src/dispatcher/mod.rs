//! # Dispatcher Module
//!
//! Runs method pipelines on `may` coroutines.
//!
//! Each request gets its own coroutine with the stack size from
//! [`RuntimeConfig`](crate::runtime_config::RuntimeConfig) (`RESTPIPE_STACK_SIZE`).
//! The caller blocks on the coroutine's join handle, so a dispatch reads like
//! a plain function call.
//!
//! ## Error Handling
//!
//! Every recoverable failure inside a pipeline (negotiation, security,
//! validation, operation errors) already produces a response. The one
//! request-time panic, a soft failure on a method that declared no fail
//! response, is caught here, logged at `error` level and returned as
//! [`DispatchError::HandlerPanicked`] so the server adapter decides what to
//! do with a declaration defect.

mod core;

pub use core::{DispatchError, Dispatcher};
