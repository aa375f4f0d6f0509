//! # ferrous-typed-di
//!
//! Dependency injection with typed factories for open generic services and
//! interception proxies, inspired by Microsoft.Extensions.DependencyInjection.
//!
//! ## Features
//!
//! - **Lifetimes**: Singleton, Scoped and Transient services
//! - **Keyed services**: several registrations of one type, told apart by a [`ServiceKey`]
//! - **Typed factories**: one registration serving a whole generic family, closed per requested type
//! - **Proxies**: explicit (`ProxyService<T>`) or implicit (replacing `T`) interception of trait objects
//! - **Circular dependency detection** with the full path in the error
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_typed_di::{ServiceCollection, Resolver};
//! use std::sync::Arc;
//!
//! // Define your services
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! // Register services
//! let mut services = ServiceCollection::new();
//! services.add_singleton(Database {
//!     connection_string: "postgres://localhost".to_string(),
//! });
//! services.add_transient_factory::<UserService, _>(|resolver| {
//!     UserService {
//!         db: resolver.get_required::<Database>(),
//!     }
//! });
//!
//! // Build and use the service provider
//! let provider = services.build();
//! let user_service = provider.get_required::<UserService>();
//! assert_eq!(user_service.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Typed Factories
//!
//! Rust has no open generic types at runtime, so a generic family is named by
//! a [`GenericDefinition`] marker and each closed type links back to it through
//! [`GenericService`]. A typed factory registered for the marker receives the
//! requested closed [`ServiceType`].
//!
//! ```rust
//! use ferrous_typed_di::{
//!     GenericDefinition, GenericFactoryTable, GenericService, Resolver, ServiceCollection, ServiceType,
//! };
//! use std::sync::Arc;
//!
//! pub struct CacheDef;
//! impl GenericDefinition for CacheDef {
//!     const INTERFACE: bool = false;
//! }
//!
//! #[derive(Default)]
//! pub struct Cache<T> {
//!     items: Vec<T>,
//! }
//! impl<T: Send + Sync + 'static> GenericService for Cache<T> {
//!     type Definition = CacheDef;
//!     fn type_arguments() -> Vec<ServiceType> {
//!         vec![ServiceType::of::<T>()]
//!     }
//! }
//!
//! let table = GenericFactoryTable::<CacheDef>::new()
//!     .concrete::<Cache<u64>, _>(|_| Cache::default())
//!     .concrete::<Cache<String>, _>(|_| Cache::default());
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton_typed_factory::<CacheDef, _>(table.into_factory());
//!
//! let provider = services.build();
//! let numbers = provider.get_generic_required::<Cache<u64>>();
//! let words = provider.get_generic_required::<Cache<String>>();
//! assert!(Arc::ptr_eq(&numbers, &provider.get_generic_required::<Cache<u64>>()));
//! assert!(numbers.items.is_empty() && words.items.is_empty());
//! ```
//!
//! ## Proxies
//!
//! ```rust
//! use ferrous_typed_di::{
//!     Interceptor, InterceptorChain, Interceptors, InterfaceProxy, Invocation, ProxyService, Resolver,
//!     ServiceCollection, ServiceType,
//! };
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! pub trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct FixedClock;
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 { 1_700_000_000 }
//! }
//!
//! struct ClockProxy { target: Arc<dyn Clock>, chain: InterceptorChain }
//! impl Clock for ClockProxy {
//!     fn now(&self) -> u64 {
//!         self.chain.invoke("now", || self.target.now())
//!     }
//! }
//! impl InterfaceProxy for dyn Clock {
//!     fn create_proxy(target: Arc<Self>, chain: InterceptorChain) -> Arc<Self> {
//!         Arc::new(ClockProxy { target, chain })
//!     }
//! }
//!
//! static CALLS: AtomicUsize = AtomicUsize::new(0);
//!
//! #[derive(Default)]
//! struct CountCalls;
//! impl Interceptor for CountCalls {
//!     fn intercept(&self, invocation: &mut Invocation<'_>) {
//!         CALLS.fetch_add(1, Ordering::SeqCst);
//!         invocation.proceed();
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton_trait::<dyn Clock>(Arc::new(FixedClock));
//! services
//!     .add_singleton_explicit_proxy(
//!         ServiceType::interface::<dyn Clock>(),
//!         Interceptors::new().with::<CountCalls>(),
//!     )
//!     .unwrap();
//!
//! let provider = services.build();
//! provider.get_required_trait::<dyn Clock>().now();
//! assert_eq!(CALLS.load(Ordering::SeqCst), 0);
//!
//! let proxied = provider.get_required::<ProxyService<dyn Clock>>();
//! assert_eq!(proxied.proxy().now(), 1_700_000_000);
//! assert_eq!(CALLS.load(Ordering::SeqCst), 1);
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: Created once and shared across the entire application
//! - **Scoped**: Created once per scope (ideal for web request contexts)
//! - **Transient**: Created fresh on every resolution
//!
//! For typed factories these apply per closed type.

// Module declarations
pub mod collection;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod observer;
pub mod options;
pub mod provider;
pub mod proxy;
pub mod service_type;
pub mod traits;
pub mod typed;

mod internal;
mod registration;

// Re-exports
pub use collection::ServiceCollection;
pub use descriptors::{
    Ctor, Implementation, KeyedCtor, ServiceDescriptor, TypedFactory, TypedKeyedFactory, TypedServiceDescriptor,
};
pub use error::{DiError, DiResult};
pub use internal::CircularPanic;
pub use key::{key_of_type, Key, ServiceKey};
pub use lifetime::Lifetime;
pub use observer::{DiObserver, LoggingObserver};
pub use options::ServiceProviderOptions;
pub use provider::{
    DefaultServiceProviderFactory, ProxyServiceProviderFactory, ResolverContext, Scope, ServiceProvider,
    ServiceProviderFactory,
};
pub use proxy::{
    AsyncInterceptor, AsyncInterceptorAdapter, BoxedReturn, FrozenProxyRegistry, Interceptor, InterceptorChain,
    InterceptorKind, Interceptors, InterfaceProxy, Invocation, InvocationInfo, OriginalServiceKey, PendingReturn,
    ProxyHooks, ProxyMode, ProxyRegistration, ProxyService, ProxyServiceDefinition, ReturnValue,
    StartupProxyRegistry,
};
pub use registration::{CallSite, CallSiteKey};
pub use service_type::{into_any, into_any_trait, AnyArc, GenericDefinition, GenericService, ServiceType, TypeShape};
pub use traits::{Resolver, ResolverCore};
pub use typed::{try_create_typed_factory_call_site, GenericFactoryTable};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_singleton_resolution() {
        let mut sc = ServiceCollection::new();
        sc.add_singleton(42usize);

        let sp = sc.build();
        let a = sp.get_required::<usize>();
        let b = sp.get_required::<usize>();

        assert_eq!(*a, 42);
        assert!(Arc::ptr_eq(&a, &b)); // Same instance
    }

    #[test]
    fn test_transient_resolution() {
        let mut sc = ServiceCollection::new();
        let counter = Arc::new(Mutex::new(0));
        let counter_clone = counter.clone();

        sc.add_transient_factory::<String, _>(move |_| {
            let mut c = counter_clone.lock().unwrap();
            *c += 1;
            format!("instance-{}", *c)
        });

        let sp = sc.build();
        let a = sp.get_required::<String>();
        let b = sp.get_required::<String>();

        assert_eq!(a.as_str(), "instance-1");
        assert_eq!(b.as_str(), "instance-2");
        assert!(!Arc::ptr_eq(&a, &b)); // Different instances
    }

    #[test]
    fn test_scoped_resolution() {
        let mut sc = ServiceCollection::new();
        sc.add_scoped_factory::<String, _>(|_| "scoped".to_string());

        let sp = sc.build();

        // Same scope should have same instance
        let scope1 = sp.create_scope();
        let s1a = scope1.get_required::<String>();
        let s1b = scope1.get_required::<String>();
        assert!(Arc::ptr_eq(&s1a, &s1b));

        // Different scope should have different instance
        let scope2 = sp.create_scope();
        let s2 = scope2.get_required::<String>();
        assert!(!Arc::ptr_eq(&s1a, &s2));
    }

    #[test]
    fn test_keyed_resolution_is_independent() {
        let mut sc = ServiceCollection::new();
        sc.add_singleton(1u32);
        sc.add_keyed_singleton("blue", 2u32);
        sc.add_keyed_singleton(7i64, 3u32);

        let sp = sc.build();
        assert_eq!(*sp.get_required::<u32>(), 1);
        assert_eq!(*sp.get_keyed_required::<u32>("blue"), 2);
        assert_eq!(*sp.get_keyed_required::<u32>(7i64), 3);
        assert!(matches!(
            sp.get_keyed::<u32>("green"),
            Err(DiError::KeyedNotFound { key, .. }) if key == "green"
        ));
    }

    #[test]
    fn test_scoped_from_root_is_rejected() {
        let mut sc = ServiceCollection::new();
        sc.add_scoped_factory::<String, _>(|_| "scoped".to_string());

        let sp = sc.build();
        assert!(matches!(sp.get::<String>(), Err(DiError::WrongLifetime(_))));
    }
}
