//! Observability hooks for the dependency injection container.
//!
//! Observers receive synchronous callbacks around every resolution, including
//! closed call sites created from typed factories and proxy activations.

use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::key::Key;
use crate::registration::CallSiteKey;

/// Observer trait for dependency injection resolution events.
///
/// This trait enables structured tracing and monitoring of the DI container's
/// behavior. Observers can track what services are being resolved, timing
/// information, and failure conditions.
///
/// # Performance
///
/// Observer calls are made synchronously during resolution. Keep implementations
/// lightweight. When no observer is registered the provider skips the timing
/// and notification path entirely.
///
/// # Examples
///
/// ```
/// use ferrous_typed_di::{DiObserver, DiError, ServiceCollection, Key};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// struct TracingObserver {
///     trace_id: String,
/// }
///
/// impl DiObserver for TracingObserver {
///     fn resolving(&self, key: &Key) {
///         println!("[{}] Resolving: {}", self.trace_id, key);
///     }
///
///     fn resolved(&self, key: &Key, duration: Duration) {
///         println!("[{}] Resolved: {} in {:?}", self.trace_id, key, duration);
///     }
///
///     fn resolution_failed(&self, key: &Key, error: &DiError) {
///         println!("[{}] FAILED {}: {}", self.trace_id, key, error);
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_observer(Arc::new(TracingObserver { trace_id: "run-123".to_string() }));
///
/// // All subsequent resolutions will be traced
/// let provider = services.build();
/// ```
pub trait DiObserver: Send + Sync {
    /// Called when starting to resolve a service.
    ///
    /// This is called before the call site is looked up. Use this to start
    /// timing measurements and emit trace events.
    fn resolving(&self, key: &Key);

    /// Called when a service is successfully resolved.
    ///
    /// # Arguments
    ///
    /// * `key` - The service key that was resolved
    /// * `duration` - Time elapsed from `resolving` to `resolved`
    fn resolved(&self, key: &Key, duration: Duration);

    /// Called when resolution returns an error.
    fn resolution_failed(&self, key: &Key, error: &DiError);

    /// Called when a typed factory is closed over a requested type for the
    /// first time.
    fn call_site_created(&self, key: &CallSiteKey) {
        let _ = key;
    }

    /// Called after a proxy instance wraps its target.
    fn proxy_created(&self, key: &Key) {
        let _ = key;
    }
}

/// Container for registered observers.
///
/// This struct holds all registered observers and provides methods to notify
/// them of resolution events. It's designed to have minimal overhead when
/// no observers are registered.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    /// Creates a new empty observer collection.
    pub(crate) fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    /// Returns true if any observers are registered.
    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn resolving(&self, key: &Key) {
        for observer in &self.observers {
            observer.resolving(key);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, key: &Key, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(key, duration);
        }
    }

    #[inline]
    pub(crate) fn resolution_failed(&self, key: &Key, error: &DiError) {
        for observer in &self.observers {
            observer.resolution_failed(key, error);
        }
    }

    #[inline]
    pub(crate) fn call_site_created(&self, key: &CallSiteKey) {
        for observer in &self.observers {
            observer.call_site_created(key);
        }
    }

    #[inline]
    pub(crate) fn proxy_created(&self, key: &Key) {
        for observer in &self.observers {
            observer.proxy_created(key);
        }
    }
}

/// Built-in observer that logs events to stdout.
///
/// Failures go to stderr. Useful for development and debugging; for
/// production, implement [`DiObserver`] on top of your logging stack.
///
/// # Examples
///
/// ```
/// use ferrous_typed_di::{ServiceCollection, LoggingObserver};
/// use std::sync::Arc;
///
/// let mut services = ServiceCollection::new();
/// services.add_observer(Arc::new(LoggingObserver::new()));
///
/// // All resolutions will be logged to stdout
/// let provider = services.build();
/// ```
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    /// Creates a new logging observer with default prefix.
    pub fn new() -> Self {
        Self {
            prefix: "[ferrous-typed-di]".to_string(),
        }
    }

    /// Creates a new logging observer with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl DiObserver for LoggingObserver {
    fn resolving(&self, key: &Key) {
        println!("{} Resolving: {}", self.prefix, key);
    }

    fn resolved(&self, key: &Key, duration: Duration) {
        println!("{} Resolved: {} in {:?}", self.prefix, key, duration);
    }

    fn resolution_failed(&self, key: &Key, error: &DiError) {
        eprintln!("{} FAILED {}: {}", self.prefix, key, error);
    }

    fn call_site_created(&self, key: &CallSiteKey) {
        println!(
            "{} Closed call site: {} ({})",
            self.prefix,
            key.service.name(),
            key.lifetime
        );
    }

    fn proxy_created(&self, key: &Key) {
        println!("{} Proxy created: {}", self.prefix, key);
    }
}
