use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::Middleware;
use crate::server::{HandlerResponse, Request};

/// Counts requests, latency and outcomes.
///
/// All counters use relaxed atomics; the middleware never blocks a request.
///
/// Metrics collected:
/// - Total request count
/// - Average latency
/// - Responses per status class (2xx, 3xx, 4xx, 5xx)
/// - Security rejections (401 and 403 responses)
/// - Coroutine stack size of the last request served on a coroutine
#[derive(Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    status_classes: [AtomicUsize; 4],
    security_rejections: AtomicUsize,
    stack_size: AtomicUsize,
}

impl MetricsMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean processing time; zero before the first request.
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Responses whose status falls in `class` hundreds (2 for 2xx, ...).
    pub fn status_class_count(&self, class: u16) -> usize {
        match class {
            2..=5 => self.status_classes[usize::from(class - 2)].load(Ordering::Relaxed),
            _ => 0,
        }
    }

    pub fn security_rejections(&self) -> usize {
        self.security_rejections.load(Ordering::Relaxed)
    }

    /// Stack size of the coroutine that served the last request, 0 when
    /// requests are served outside the dispatcher.
    pub fn stack_size(&self) -> usize {
        self.stack_size.load(Ordering::Relaxed)
    }
}

impl Middleware for MetricsMiddleware {
    fn before(&self, _req: &Request) -> Option<HandlerResponse> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn after(&self, _req: &Request, res: &mut HandlerResponse, latency: Duration) {
        self.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        if let 200..=599 = res.status {
            self.status_classes[usize::from(res.status / 100 - 2)].fetch_add(1, Ordering::Relaxed);
        }
        if matches!(res.status, 401 | 403) {
            self.security_rejections.fetch_add(1, Ordering::Relaxed);
        }
        if may::coroutine::is_coroutine() {
            let size = may::coroutine::current().stack_size();
            self.stack_size.store(size, Ordering::Relaxed);
        }
    }
}
