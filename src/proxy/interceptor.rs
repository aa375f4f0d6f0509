//! Interceptors and the invocation chain proxies route calls through.
//!
//! A proxy implements the service trait by handing each call to
//! [`InterceptorChain::invoke`] (or `invoke_async`) together with a closure
//! that calls the real target. Every interceptor sees an [`Invocation`] and
//! decides whether, how often and with what result to `proceed`.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{DiError, DiResult};
use crate::service_type::ServiceType;

/// Type-erased return value of an intercepted call.
pub type BoxedReturn = Box<dyn Any + Send>;

/// Pending result of an intercepted async call.
pub type PendingReturn = Pin<Box<dyn Future<Output = BoxedReturn> + Send>>;

/// What the target (or a short-circuiting interceptor) produced.
pub enum ReturnValue {
    /// Result of a synchronous call
    Value(BoxedReturn),
    /// Future of an asynchronous call, not yet awaited
    Pending(PendingReturn),
}

impl fmt::Debug for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnValue::Value(_) => f.write_str("Value"),
            ReturnValue::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Which call is being intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationInfo {
    service: &'static str,
    method: &'static str,
}

impl InvocationInfo {
    pub fn new(service: &'static str, method: &'static str) -> Self {
        Self { service, method }
    }

    /// Type name of the proxied service.
    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn method(&self) -> &'static str {
        self.method
    }
}

impl fmt::Display for InvocationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.service, self.method)
    }
}

/// One intercepted call in flight.
pub struct Invocation<'a> {
    info: InvocationInfo,
    interceptors: &'a [Arc<dyn Interceptor>],
    position: usize,
    target: &'a mut dyn FnMut() -> ReturnValue,
    return_value: Option<ReturnValue>,
    is_async: bool,
}

impl<'a> Invocation<'a> {
    pub fn info(&self) -> &InvocationInfo {
        &self.info
    }

    /// Whether the target returns a future.
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Hands the call to the next interceptor, or to the target at the end of
    /// the chain. May be called more than once, e.g. to retry.
    pub fn proceed(&mut self) {
        let interceptors = self.interceptors;
        match interceptors.get(self.position) {
            Some(interceptor) => {
                self.position += 1;
                interceptor.intercept(self);
                self.position -= 1;
            }
            None => self.return_value = Some((self.target)()),
        }
    }

    /// The current return value, if it is a finished `T`.
    pub fn return_value<T: Any>(&self) -> Option<&T> {
        match &self.return_value {
            Some(ReturnValue::Value(value)) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn return_value_mut<T: Any>(&mut self) -> Option<&mut T> {
        match &mut self.return_value {
            Some(ReturnValue::Value(value)) => value.downcast_mut::<T>(),
            _ => None,
        }
    }

    /// Replaces the return value; skipping `proceed` and setting a value short-circuits the call.
    pub fn set_return_value<T: Any + Send>(&mut self, value: T) {
        self.return_value = Some(ReturnValue::Value(Box::new(value)));
    }

    pub fn has_return_value(&self) -> bool {
        self.return_value.is_some()
    }

    /// Takes the pending future of an async call, leaving no return value.
    pub fn take_pending(&mut self) -> Option<PendingReturn> {
        match self.return_value.take() {
            Some(ReturnValue::Pending(pending)) => Some(pending),
            other => {
                self.return_value = other;
                None
            }
        }
    }

    pub fn set_pending(&mut self, pending: PendingReturn) {
        self.return_value = Some(ReturnValue::Pending(pending));
    }
}

/// Synchronous interceptor.
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{Interceptor, Invocation, InterceptorChain, ServiceType};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Doubler;
///
/// impl Interceptor for Doubler {
///     fn intercept(&self, invocation: &mut Invocation<'_>) {
///         invocation.proceed();
///         if let Some(value) = invocation.return_value_mut::<u32>() {
///             *value *= 2;
///         }
///     }
/// }
///
/// let chain = InterceptorChain::new(ServiceType::of::<u32>(), vec![Arc::new(Doubler) as Arc<dyn Interceptor>]);
/// assert_eq!(chain.invoke("answer", || 21u32), 42);
/// ```
pub trait Interceptor: Send + Sync + 'static {
    fn intercept(&self, invocation: &mut Invocation<'_>);
}

/// Interceptor aware of async calls.
///
/// Synchronous calls go through `intercept_synchronous`. For async calls the
/// rest of the chain runs first, and the resulting future is handed to
/// `intercept_asynchronous`, which awaits it (or not) and produces the final
/// result.
#[async_trait]
pub trait AsyncInterceptor: Send + Sync + 'static {
    fn intercept_synchronous(&self, invocation: &mut Invocation<'_>) {
        invocation.proceed();
    }

    async fn intercept_asynchronous(&self, info: InvocationInfo, proceed: PendingReturn) -> BoxedReturn {
        let _ = info;
        proceed.await
    }
}

/// Adapts an [`AsyncInterceptor`] to the synchronous chain.
pub struct AsyncInterceptorAdapter {
    inner: Arc<dyn AsyncInterceptor>,
}

impl AsyncInterceptorAdapter {
    pub fn new(inner: Arc<dyn AsyncInterceptor>) -> Self {
        Self { inner }
    }
}

impl Interceptor for AsyncInterceptorAdapter {
    fn intercept(&self, invocation: &mut Invocation<'_>) {
        if !invocation.is_async() {
            self.inner.intercept_synchronous(invocation);
            return;
        }

        invocation.proceed();
        if let Some(pending) = invocation.take_pending() {
            let inner = self.inner.clone();
            let info = *invocation.info();
            invocation.set_pending(Box::pin(async move { inner.intercept_asynchronous(info, pending).await }));
        }
    }
}

/// A resolved interceptor, before normalisation.
#[derive(Clone)]
pub enum InterceptorKind {
    Synchronous(Arc<dyn Interceptor>),
    AsyncAware(Arc<dyn AsyncInterceptor>),
}

impl InterceptorKind {
    /// Wraps async-aware interceptors in an [`AsyncInterceptorAdapter`].
    pub fn normalize(self) -> Arc<dyn Interceptor> {
        match self {
            InterceptorKind::Synchronous(interceptor) => interceptor,
            InterceptorKind::AsyncAware(interceptor) => Arc::new(AsyncInterceptorAdapter::new(interceptor)),
        }
    }
}

/// Ordered interceptors of one proxy instance.
#[derive(Clone)]
pub struct InterceptorChain {
    service: ServiceType,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
}

impl InterceptorChain {
    pub fn new(service: ServiceType, interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self {
            service,
            interceptors: interceptors.into(),
        }
    }

    /// The proxied service type.
    pub fn service(&self) -> ServiceType {
        self.service
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    fn run(&self, method: &'static str, is_async: bool, target: &mut dyn FnMut() -> ReturnValue) -> Option<ReturnValue> {
        let mut invocation = Invocation {
            info: InvocationInfo::new(self.service.name(), method),
            interceptors: &self.interceptors,
            position: 0,
            target,
            return_value: None,
            is_async,
        };
        invocation.proceed();
        invocation.return_value
    }

    /// Runs `target` through the chain.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::MissingReturnValue`] when no interceptor proceeded and
    /// none set a return value of type `R`.
    pub fn try_invoke<R, F>(&self, method: &'static str, mut target: F) -> DiResult<R>
    where
        R: Any + Send,
        F: FnMut() -> R,
    {
        let mut erased = || ReturnValue::Value(Box::new(target()));
        match self.run(method, false, &mut erased) {
            Some(ReturnValue::Value(value)) => self.downcast(method, value),
            _ => Err(self.missing(method)),
        }
    }

    /// Like [`try_invoke`](Self::try_invoke), panicking on a missing return value.
    pub fn invoke<R, F>(&self, method: &'static str, target: F) -> R
    where
        R: Any + Send,
        F: FnMut() -> R,
    {
        self.try_invoke(method, target)
            .unwrap_or_else(|e| panic!("{}", e))
    }

    /// Runs an async `target` through the chain and awaits the result.
    ///
    /// Interceptors run synchronously while the future is assembled; only the
    /// final future is awaited.
    pub async fn try_invoke_async<R, F, Fut>(&self, method: &'static str, mut target: F) -> DiResult<R>
    where
        R: Any + Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = R> + Send + 'static,
    {
        let returned = {
            let mut erased = || {
                let future = target();
                let pending: PendingReturn = Box::pin(async move {
                    let value: BoxedReturn = Box::new(future.await);
                    value
                });
                ReturnValue::Pending(pending)
            };
            self.run(method, true, &mut erased)
        };
        match returned {
            Some(ReturnValue::Pending(pending)) => self.downcast(method, pending.await),
            Some(ReturnValue::Value(value)) => self.downcast(method, value),
            None => Err(self.missing(method)),
        }
    }

    pub async fn invoke_async<R, F, Fut>(&self, method: &'static str, target: F) -> R
    where
        R: Any + Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = R> + Send + 'static,
    {
        match self.try_invoke_async(method, target).await {
            Ok(value) => value,
            Err(e) => panic!("{}", e),
        }
    }

    fn downcast<R: Any>(&self, method: &'static str, value: BoxedReturn) -> DiResult<R> {
        value
            .downcast::<R>()
            .map(|value| *value)
            .map_err(|_| self.missing(method))
    }

    fn missing(&self, method: &'static str) -> DiError {
        DiError::MissingReturnValue(InvocationInfo::new(self.service.name(), method).to_string())
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("service", &self.service.name())
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Recorder {
        label: &'static str,
        log: Arc<parking_lot::Mutex<Vec<String>>>,
    }

    impl Interceptor for Recorder {
        fn intercept(&self, invocation: &mut Invocation<'_>) {
            self.log.lock().push(format!("{} before {}", self.label, invocation.info().method()));
            invocation.proceed();
            self.log.lock().push(format!("{} after", self.label));
        }
    }

    struct ShortCircuit;
    impl Interceptor for ShortCircuit {
        fn intercept(&self, invocation: &mut Invocation<'_>) {
            invocation.set_return_value(7u8);
        }
    }

    struct Swallow;
    impl Interceptor for Swallow {
        fn intercept(&self, _invocation: &mut Invocation<'_>) {}
    }

    struct Retry(usize);
    impl Interceptor for Retry {
        fn intercept(&self, invocation: &mut Invocation<'_>) {
            for _ in 0..self.0 {
                invocation.proceed();
            }
        }
    }

    fn chain(interceptors: Vec<Arc<dyn Interceptor>>) -> InterceptorChain {
        InterceptorChain::new(ServiceType::of::<u8>(), interceptors)
    }

    #[test]
    fn interceptors_nest_in_registration_order() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let chain = chain(vec![
            Arc::new(Recorder { label: "outer", log: log.clone() }),
            Arc::new(Recorder { label: "inner", log: log.clone() }),
        ]);
        assert_eq!(chain.invoke("run", || 1u8), 1);
        assert_eq!(
            *log.lock(),
            vec!["outer before run", "inner before run", "inner after", "outer after"]
        );
    }

    #[test]
    fn short_circuit_skips_target() {
        let calls = AtomicUsize::new(0);
        let value = chain(vec![Arc::new(ShortCircuit)]).invoke("run", || {
            calls.fetch_add(1, Ordering::SeqCst);
            1u8
        });
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn proceed_can_run_twice() {
        let calls = AtomicUsize::new(0);
        chain(vec![Arc::new(Retry(2))]).invoke("run", || calls.fetch_add(1, Ordering::SeqCst));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn swallowed_call_reports_missing_value() {
        let err = chain(vec![Arc::new(Swallow)]).try_invoke("run", || 1u8).unwrap_err();
        assert!(matches!(err, DiError::MissingReturnValue(name) if name.ends_with("::run")));
    }

    #[test]
    fn wrong_type_reports_missing_value() {
        let err = chain(vec![Arc::new(ShortCircuit)]).try_invoke("run", || "text").unwrap_err();
        assert!(matches!(err, DiError::MissingReturnValue(_)));
    }
}
