//! Proxy carriers and the hooks that build proxies for a concrete type.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::service_type::{into_any, into_any_trait, AnyArc, GenericDefinition, GenericService, ServiceType};

use super::interceptor::InterceptorChain;

/// A trait object that can be wrapped in an intercepting proxy.
///
/// Implement it on the trait object type (`impl InterfaceProxy for dyn Greeter`)
/// by returning a struct that implements the trait and forwards every method
/// through the [`InterceptorChain`].
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{InterceptorChain, InterfaceProxy};
/// use std::sync::Arc;
///
/// pub trait Greeter: Send + Sync {
///     fn greet(&self, name: &str) -> String;
/// }
///
/// struct GreeterProxy {
///     target: Arc<dyn Greeter>,
///     chain: InterceptorChain,
/// }
///
/// impl Greeter for GreeterProxy {
///     fn greet(&self, name: &str) -> String {
///         self.chain.invoke("greet", || self.target.greet(name))
///     }
/// }
///
/// impl InterfaceProxy for dyn Greeter {
///     fn create_proxy(target: Arc<Self>, chain: InterceptorChain) -> Arc<Self> {
///         Arc::new(GreeterProxy { target, chain })
///     }
/// }
/// ```
pub trait InterfaceProxy: Send + Sync + 'static {
    fn create_proxy(target: Arc<Self>, chain: InterceptorChain) -> Arc<Self>;
}

/// Carrier under which an explicit proxy is registered.
///
/// Resolving `T` keeps returning the original service; resolving
/// `ProxyService<T>` returns the intercepted one.
pub struct ProxyService<T: ?Sized> {
    proxy: Arc<T>,
}

impl<T: ?Sized> ProxyService<T> {
    pub fn new(proxy: Arc<T>) -> Self {
        Self { proxy }
    }

    /// The intercepting proxy.
    pub fn proxy(&self) -> Arc<T> {
        self.proxy.clone()
    }
}

impl<T: ?Sized> fmt::Debug for ProxyService<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyService")
            .field("service", &type_name::<T>())
            .finish()
    }
}

/// Open definition of the `ProxyService<_>` family.
pub struct ProxyServiceDefinition;

impl GenericDefinition for ProxyServiceDefinition {
    const INTERFACE: bool = false;
}

impl<T: ?Sized + GenericService> GenericService for ProxyService<T> {
    type Definition = ProxyServiceDefinition;

    fn type_arguments() -> Vec<ServiceType> {
        vec![ServiceType::generic::<T>()]
    }
}

/// Monomorphised proxy constructors for one service type.
///
/// Hooks travel inside a [`ServiceType`] token, so the container can build a
/// proxy for a closed type it only learns about at resolution time.
#[derive(Clone, Copy)]
pub struct ProxyHooks {
    carrier: fn() -> ServiceType,
    create: fn(AnyArc, InterceptorChain) -> DiResult<AnyArc>,
    create_carrier: fn(AnyArc, InterceptorChain) -> DiResult<AnyArc>,
}

impl ProxyHooks {
    /// Hooks for a plain proxyable trait object.
    pub fn of<T: ?Sized + InterfaceProxy>() -> Self {
        Self {
            carrier: ServiceType::of::<ProxyService<T>>,
            create: create_proxy::<T>,
            create_carrier: create_carrier::<T>,
        }
    }

    /// Hooks for a closed generic trait object.
    ///
    /// ```rust
    /// use ferrous_typed_di::{GenericDefinition, GenericService, InterceptorChain, InterfaceProxy, ProxyHooks, ServiceType};
    /// use std::sync::Arc;
    ///
    /// pub trait Store<T>: Send + Sync {
    ///     fn size(&self) -> usize;
    /// }
    /// pub struct StoreDef;
    /// impl GenericDefinition for StoreDef {
    ///     const INTERFACE: bool = true;
    /// }
    ///
    /// struct StoreProxy<T> { target: Arc<dyn Store<T>>, chain: InterceptorChain }
    /// impl<T: 'static> Store<T> for StoreProxy<T> {
    ///     fn size(&self) -> usize {
    ///         self.chain.invoke("size", || self.target.size())
    ///     }
    /// }
    ///
    /// impl<T: 'static> InterfaceProxy for dyn Store<T> {
    ///     fn create_proxy(target: Arc<Self>, chain: InterceptorChain) -> Arc<Self> {
    ///         Arc::new(StoreProxy { target, chain })
    ///     }
    /// }
    /// impl<T: 'static> GenericService for dyn Store<T> {
    ///     type Definition = StoreDef;
    ///     fn proxy_hooks() -> Option<ProxyHooks> {
    ///         Some(ProxyHooks::generic::<Self>())
    ///     }
    /// }
    ///
    /// assert!(ServiceType::generic::<dyn Store<u8>>().proxy_hooks().is_some());
    /// ```
    pub fn generic<T: ?Sized + InterfaceProxy + GenericService>() -> Self {
        Self {
            carrier: ServiceType::generic::<ProxyService<T>>,
            create: create_proxy::<T>,
            create_carrier: create_carrier::<T>,
        }
    }

    /// Token of `ProxyService<T>`.
    pub fn carrier(&self) -> ServiceType {
        (self.carrier)()
    }

    /// Wraps `target` (an erased `Arc<dyn T>`) in a proxy of the same type.
    pub fn create(&self, target: AnyArc, chain: InterceptorChain) -> DiResult<AnyArc> {
        (self.create)(target, chain)
    }

    /// Wraps `target` in a proxy and the proxy in a `ProxyService<T>`.
    pub fn create_carrier(&self, target: AnyArc, chain: InterceptorChain) -> DiResult<AnyArc> {
        (self.create_carrier)(target, chain)
    }
}

impl fmt::Debug for ProxyHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyHooks")
            .field("carrier", &self.carrier().name())
            .finish()
    }
}

fn downcast_target<T: ?Sized + InterfaceProxy>(target: AnyArc) -> DiResult<Arc<T>> {
    target
        .downcast::<Arc<T>>()
        .map(|boxed| (*boxed).clone())
        .map_err(|_| DiError::TypeMismatch(type_name::<T>()))
}

fn create_proxy<T: ?Sized + InterfaceProxy>(target: AnyArc, chain: InterceptorChain) -> DiResult<AnyArc> {
    let target = downcast_target::<T>(target)?;
    Ok(into_any_trait(T::create_proxy(target, chain)))
}

fn create_carrier<T: ?Sized + InterfaceProxy>(target: AnyArc, chain: InterceptorChain) -> DiResult<AnyArc> {
    let target = downcast_target::<T>(target)?;
    Ok(into_any(ProxyService::new(T::create_proxy(target, chain))))
}
