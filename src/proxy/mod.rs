//! Interception proxies for trait-object services.
//!
//! Two registration modes exist:
//!
//! - **Explicit**: the proxy is added next to the original as
//!   [`ProxyService<T>`]. Resolving `T` is unaffected.
//! - **Implicit**: the proxy takes over `T`. The original registration is moved
//!   under an [`OriginalServiceKey`] and the proxy resolves its target from there.
//!
//! Both modes work for plain interfaces, closed generic interfaces, and open
//! generic definitions. Open generic proxies are additionally gated on the
//! [`FrozenProxyRegistry`], which
//! [`ServiceCollection::solidify_open_generic_proxy_registry`](crate::ServiceCollection::solidify_open_generic_proxy_registry)
//! produces before build.

mod activation;
mod interceptor;
mod original_key;
mod registration;
mod registry;
mod service;

pub use interceptor::{
    AsyncInterceptor, AsyncInterceptorAdapter, BoxedReturn, Interceptor, InterceptorChain, InterceptorKind,
    Invocation, InvocationInfo, PendingReturn, ReturnValue,
};
pub use original_key::OriginalServiceKey;
pub use registration::{Interceptors, ProxyMode, ProxyRegistration};
pub use registry::{FrozenProxyRegistry, StartupProxyRegistry};
pub use service::{InterfaceProxy, ProxyHooks, ProxyService, ProxyServiceDefinition};
