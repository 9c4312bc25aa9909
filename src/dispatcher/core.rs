use crate::ids::RequestId;
use crate::input::UriResolver;
use crate::pipeline::ResourceMethod;
use crate::server::{HandlerResponse, Request};
use may::coroutine;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The method pipeline panicked. Only a declaration defect does this.
    #[error("handler panicked for request {request_id}: {message}")]
    HandlerPanicked {
        request_id: RequestId,
        message: String,
    },
    #[error("failed to spawn request coroutine: {0}")]
    Spawn(#[source] std::io::Error),
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs each request's pipeline on its own `may` coroutine.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    stack_size: usize,
}

impl Dispatcher {
    #[must_use]
    pub fn new(stack_size: usize) -> Self {
        Self { stack_size }
    }

    #[must_use]
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    /// Serve `request` with `method` on a fresh coroutine and wait for it.
    ///
    /// A panic inside the pipeline is caught at the coroutine boundary and
    /// returned as [`DispatchError::HandlerPanicked`]; it is never turned
    /// into a response.
    pub fn dispatch(
        &self,
        method: Arc<ResourceMethod>,
        request: Request,
        resolver: Option<UriResolver>,
    ) -> Result<HandlerResponse, DispatchError> {
        let request_id = request.request_id;
        let start = Instant::now();
        debug!(
            request_id = %request_id,
            method = %request.method,
            path = %request.path,
            stack_size = self.stack_size,
            "Dispatching request"
        );

        // SAFETY: `Builder::spawn` is unsafe in `may` because a coroutine must
        // not hold thread-local state across yields. The closure owns all of
        // its captures and touches no thread-locals.
        #[allow(unsafe_code)]
        let spawned = unsafe {
            coroutine::Builder::new()
                .stack_size(self.stack_size)
                .spawn(move || {
                    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        method.serve(&request, resolver.as_ref())
                    }))
                })
        };
        let handle = spawned.map_err(|e| {
            error!(request_id = %request_id, error = %e, "Failed to spawn request coroutine");
            DispatchError::Spawn(e)
        })?;

        let outcome = match handle.join() {
            Ok(inner) => inner,
            Err(panic) => Err(panic),
        };
        match outcome {
            Ok(response) => {
                info!(
                    request_id = %request_id,
                    status = response.status,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Request dispatched"
                );
                Ok(response)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    request_id = %request_id,
                    panic_message = %message,
                    "Handler panicked - CRITICAL"
                );
                Err(DispatchError::HandlerPanicked {
                    request_id,
                    message,
                })
            }
        }
    }
}
