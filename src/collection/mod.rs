//! Service collection module for dependency injection.
//!
//! This module contains the ServiceCollection type and related functionality
//! for registering services and building service providers.

use std::slice;
use std::sync::Arc;

use crate::descriptors::{Ctor, KeyedCtor, ServiceDescriptor};
use crate::error::DiResult;
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::observer::{DiObserver, Observers};
use crate::options::ServiceProviderOptions;
use crate::provider::{ResolverContext, ServiceProvider};
use crate::service_type::{into_any, into_any_trait, AnyArc, ServiceType};

/// Ordered list of service descriptors, built into a [`ServiceProvider`].
///
/// Registration sugar (`add_singleton`, `add_scoped_factory`, typed factories,
/// proxies, ...) reduces to [`add`](Self::add). When several descriptors share
/// a type and key, the last one wins at build time.
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{ServiceCollection, Resolver};
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(8080u16);
/// services.add_keyed_singleton("admin", 9090u16);
///
/// let provider = services.build();
/// assert_eq!(*provider.get_required::<u16>(), 8080);
/// assert_eq!(*provider.get_keyed_required::<u16>("admin"), 9090);
/// ```
#[derive(Default)]
pub struct ServiceCollection {
    descriptors: Vec<ServiceDescriptor>,
    observers: Observers,
}

impl ServiceCollection {
    /// Creates a new empty service collection.
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            observers: Observers::new(),
        }
    }

    // ----- Descriptor list -----

    /// Appends a descriptor.
    pub fn add(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Inserts a descriptor at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, descriptor: ServiceDescriptor) -> &mut Self {
        self.descriptors.insert(index, descriptor);
        self
    }

    /// Removes and returns the descriptor at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> ServiceDescriptor {
        self.descriptors.remove(index)
    }

    /// Index of the first descriptor matching `predicate`.
    pub fn position<P>(&self, predicate: P) -> Option<usize>
    where
        P: FnMut(&ServiceDescriptor) -> bool,
    {
        self.descriptors.iter().position(predicate)
    }

    pub fn get(&self, index: usize) -> Option<&ServiceDescriptor> {
        self.descriptors.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, ServiceDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Whether any descriptor has this type and key.
    pub fn contains(&self, service_type: &ServiceType, key: Option<&ServiceKey>) -> bool {
        self.descriptors
            .iter()
            .any(|d| d.service_type() == *service_type && d.service_key() == key)
    }

    /// Adds `descriptor` unless one with the same type and key exists.
    ///
    /// Returns whether it was added.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_typed_di::{ServiceCollection, ServiceDescriptor, ServiceType, into_any};
    ///
    /// let mut services = ServiceCollection::new();
    ///
    /// let first = ServiceDescriptor::instance(ServiceType::of::<usize>(), None, into_any(42usize));
    /// assert!(services.try_add(first)); // First registration succeeds
    ///
    /// let second = ServiceDescriptor::instance(ServiceType::of::<usize>(), None, into_any(100usize));
    /// assert!(!services.try_add(second)); // Second registration is ignored
    /// ```
    pub fn try_add(&mut self, descriptor: ServiceDescriptor) -> bool {
        if self.contains(&descriptor.service_type(), descriptor.service_key()) {
            false
        } else {
            self.descriptors.push(descriptor);
            true
        }
    }

    /// Removes every descriptor with this type and key, returning them in order.
    pub fn remove_all(&mut self, service_type: &ServiceType, key: Option<&ServiceKey>) -> Vec<ServiceDescriptor> {
        let (removed, kept) = std::mem::take(&mut self.descriptors)
            .into_iter()
            .partition(|d| d.service_type() == *service_type && d.service_key() == key);
        self.descriptors = kept;
        removed
    }

    // ----- Concrete Type Registrations -----

    /// Registers a singleton instance that will be shared across the entire application.
    ///
    /// The instance is wrapped in an `Arc` for thread-safe sharing. All
    /// requests for this service type will return the same instance.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_typed_di::ServiceCollection;
    /// struct Config {
    ///     database_url: String
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Config {
    ///     database_url: "postgres://localhost".to_string()
    /// });
    /// ```
    pub fn add_singleton<T: 'static + Send + Sync>(&mut self, value: T) -> &mut Self {
        self.add(ServiceDescriptor::instance(ServiceType::of::<T>(), None, into_any(value)))
    }

    /// Registers a singleton factory that creates the instance on first request.
    ///
    /// The factory is called only once, and the result is cached and shared across
    /// all subsequent requests. The factory receives a `ResolverContext` to resolve
    /// dependencies.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_typed_di::{ServiceCollection, Resolver};
    /// # use std::sync::Arc;
    /// struct Database { url: String }
    /// struct UserService { db: Arc<Database> }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Database { url: "postgres://localhost".to_string() });
    /// services.add_singleton_factory::<UserService, _>(|resolver| {
    ///     UserService {
    ///         db: resolver.get_required::<Database>()
    ///     }
    /// });
    /// ```
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Singleton, factory)
    }

    /// Registers a scoped factory that creates one instance per scope.
    ///
    /// Each scope gets its own instance, but within a scope, the same instance
    /// is reused. Suited to per-request services.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_typed_di::{ServiceCollection, Resolver};
    /// # use std::sync::Arc;
    /// struct Database { url: String }
    /// struct RequestContext { request_id: String }
    /// struct UserService { db: Arc<Database>, context: Arc<RequestContext> }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Database { url: "postgres://localhost".to_string() });
    /// services.add_scoped_factory::<RequestContext, _>(|_| {
    ///     RequestContext { request_id: "req-123".to_string() }
    /// });
    /// services.add_scoped_factory::<UserService, _>(|resolver| {
    ///     UserService {
    ///         db: resolver.get_required::<Database>(),
    ///         context: resolver.get_required::<RequestContext>()
    ///     }
    /// });
    /// ```
    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Scoped, factory)
    }

    /// Registers a transient factory that creates a new instance on every request.
    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Transient, factory)
    }

    fn add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        let ctor: Ctor = Arc::new(move |r: &ResolverContext<'_>| -> DiResult<AnyArc> { Ok(into_any(factory(r))) });
        self.add(ServiceDescriptor::factory(ServiceType::of::<T>(), lifetime, ctor))
    }

    // ----- Trait Registrations -----

    /// Registers a singleton trait implementation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_typed_di::{ServiceCollection, Resolver};
    /// # use std::sync::Arc;
    /// trait Logger: Send + Sync {
    ///     fn log(&self, message: &str);
    /// }
    ///
    /// struct ConsoleLogger;
    /// impl Logger for ConsoleLogger {
    ///     fn log(&self, message: &str) {
    ///         println!("{}", message);
    ///     }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton_trait::<dyn Logger>(Arc::new(ConsoleLogger));
    ///
    /// let provider = services.build();
    /// provider.get_required_trait::<dyn Logger>().log("ready");
    /// ```
    pub fn add_singleton_trait<T>(&mut self, value: Arc<T>) -> &mut Self
    where
        T: ?Sized + 'static + Send + Sync,
    {
        self.add(ServiceDescriptor::instance(ServiceType::of_trait::<T>(), None, into_any_trait(value)))
    }

    /// Registers a singleton trait factory.
    ///
    /// The factory creates a trait implementation on first request, and the result
    /// is cached as a singleton. The factory must return an `Arc<Trait>`.
    pub fn add_singleton_trait_factory<Trait, F>(&mut self, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Singleton, factory)
    }

    /// Registers a scoped trait factory.
    pub fn add_scoped_trait_factory<Trait, F>(&mut self, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Scoped, factory)
    }

    /// Registers a transient trait factory.
    pub fn add_transient_trait_factory<Trait, F>(&mut self, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Transient, factory)
    }

    fn add_trait_factory<Trait, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> Arc<Trait> + Send + Sync + 'static,
    {
        let ctor: Ctor =
            Arc::new(move |r: &ResolverContext<'_>| -> DiResult<AnyArc> { Ok(into_any_trait(factory(r))) });
        self.add(ServiceDescriptor::factory(ServiceType::of_trait::<Trait>(), lifetime, ctor))
    }

    // ----- Keyed Registrations -----

    /// Registers a keyed singleton instance.
    pub fn add_keyed_singleton<T: 'static + Send + Sync>(&mut self, key: impl Into<ServiceKey>, value: T) -> &mut Self {
        self.add(ServiceDescriptor::instance(ServiceType::of::<T>(), Some(key.into()), into_any(value)))
    }

    /// Registers a keyed singleton factory; the factory receives the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_typed_di::{ServiceCollection, Resolver, ServiceKey};
    /// struct Shard { name: String }
    ///
    /// let mut services = ServiceCollection::new();
    /// for shard in ["eu", "us"] {
    ///     services.add_keyed_singleton_factory::<Shard, _>(shard, |_, key: &ServiceKey| Shard { name: key.to_string() });
    /// }
    ///
    /// let provider = services.build();
    /// assert_eq!(provider.get_keyed_required::<Shard>("us").name, "us");
    /// ```
    pub fn add_keyed_singleton_factory<T, F>(&mut self, key: impl Into<ServiceKey>, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>, &ServiceKey) -> T + Send + Sync + 'static,
    {
        self.add_keyed_factory(key.into(), Lifetime::Singleton, factory)
    }

    pub fn add_keyed_scoped_factory<T, F>(&mut self, key: impl Into<ServiceKey>, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>, &ServiceKey) -> T + Send + Sync + 'static,
    {
        self.add_keyed_factory(key.into(), Lifetime::Scoped, factory)
    }

    pub fn add_keyed_transient_factory<T, F>(&mut self, key: impl Into<ServiceKey>, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>, &ServiceKey) -> T + Send + Sync + 'static,
    {
        self.add_keyed_factory(key.into(), Lifetime::Transient, factory)
    }

    fn add_keyed_factory<T, F>(&mut self, key: ServiceKey, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>, &ServiceKey) -> T + Send + Sync + 'static,
    {
        let ctor: KeyedCtor = Arc::new(move |r: &ResolverContext<'_>, key: &ServiceKey| -> DiResult<AnyArc> {
            Ok(into_any(factory(r, key)))
        });
        self.add(ServiceDescriptor::keyed_factory(ServiceType::of::<T>(), key, lifetime, ctor))
    }

    /// Registers a keyed singleton trait implementation.
    pub fn add_keyed_singleton_trait<T>(&mut self, key: impl Into<ServiceKey>, value: Arc<T>) -> &mut Self
    where
        T: ?Sized + 'static + Send + Sync,
    {
        self.add(ServiceDescriptor::instance(
            ServiceType::of_trait::<T>(),
            Some(key.into()),
            into_any_trait(value),
        ))
    }

    pub fn add_keyed_singleton_trait_factory<Trait, F>(&mut self, key: impl Into<ServiceKey>, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>, &ServiceKey) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_keyed_trait_factory(key.into(), Lifetime::Singleton, factory)
    }

    pub fn add_keyed_scoped_trait_factory<Trait, F>(&mut self, key: impl Into<ServiceKey>, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>, &ServiceKey) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_keyed_trait_factory(key.into(), Lifetime::Scoped, factory)
    }

    pub fn add_keyed_transient_trait_factory<Trait, F>(&mut self, key: impl Into<ServiceKey>, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>, &ServiceKey) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_keyed_trait_factory(key.into(), Lifetime::Transient, factory)
    }

    fn add_keyed_trait_factory<Trait, F>(&mut self, key: ServiceKey, lifetime: Lifetime, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>, &ServiceKey) -> Arc<Trait> + Send + Sync + 'static,
    {
        let ctor: KeyedCtor = Arc::new(move |r: &ResolverContext<'_>, key: &ServiceKey| -> DiResult<AnyArc> {
            Ok(into_any_trait(factory(r, key)))
        });
        self.add(ServiceDescriptor::keyed_factory(ServiceType::of_trait::<Trait>(), key, lifetime, ctor))
    }

    // ----- Observer Management -----

    /// Adds a diagnostic observer for DI resolution events.
    ///
    /// Observer calls are made synchronously during resolution. Keep observer
    /// implementations lightweight to avoid impacting performance.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_typed_di::{DiError, DiObserver, Key, Resolver, ServiceCollection};
    /// use std::sync::atomic::{AtomicU64, Ordering};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// struct CountingObserver {
    ///     counter: Arc<AtomicU64>,
    /// }
    ///
    /// impl DiObserver for CountingObserver {
    ///     fn resolving(&self, _key: &Key) {
    ///         self.counter.fetch_add(1, Ordering::Relaxed);
    ///     }
    ///     fn resolved(&self, _key: &Key, _duration: Duration) {}
    ///     fn resolution_failed(&self, _key: &Key, _error: &DiError) {}
    /// }
    ///
    /// let counter = Arc::new(AtomicU64::new(0));
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(1u8);
    /// services.add_observer(Arc::new(CountingObserver { counter: counter.clone() }));
    ///
    /// let provider = services.build();
    /// provider.get_required::<u8>();
    /// assert_eq!(counter.load(Ordering::Relaxed), 1);
    /// ```
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    // ----- Build -----

    /// Builds the service provider with default options.
    ///
    /// Open generic proxy registries are not solidified here; call
    /// [`solidify_open_generic_proxy_registry`](Self::solidify_open_generic_proxy_registry)
    /// first or build through `ProxyServiceProviderFactory`.
    pub fn build(self) -> ServiceProvider {
        ServiceProvider::new(&self.descriptors, self.observers, ServiceProviderOptions::default())
    }

    /// Builds the service provider with explicit options.
    ///
    /// # Errors
    ///
    /// With `validate_on_build`, returns the first error raised while
    /// constructing the singletons.
    pub fn build_with_options(self, options: ServiceProviderOptions) -> DiResult<ServiceProvider> {
        let provider = ServiceProvider::new(&self.descriptors, self.observers, options);
        if options.validate_on_build {
            provider.validate_singletons()?;
        }
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_add_checks_type_and_key() {
        let mut services = ServiceCollection::new();
        services.add_keyed_singleton("a", 1u8);
        assert!(services.try_add(ServiceDescriptor::instance(ServiceType::of::<u8>(), None, into_any(2u8))));
        assert!(!services.try_add(ServiceDescriptor::instance(
            ServiceType::of::<u8>(),
            Some("a".into()),
            into_any(3u8)
        )));
        assert_eq!(services.len(), 2);
    }

    #[test]
    fn remove_all_keeps_other_keys_in_order() {
        let mut services = ServiceCollection::new();
        services.add_singleton(1u8);
        services.add_keyed_singleton("x", 2u8);
        services.add_singleton(3u8);
        services.add_singleton(4u16);

        let removed = services.remove_all(&ServiceType::of::<u8>(), None);
        assert_eq!(removed.len(), 2);
        assert_eq!(services.len(), 2);
        assert!(services.get(0).unwrap().is_keyed());
        assert_eq!(services.get(1).unwrap().service_type(), ServiceType::of::<u16>());
    }

    #[test]
    fn insert_and_remove_by_index() {
        let mut services = ServiceCollection::new();
        services.add_singleton(1u8);
        services.insert(0, ServiceDescriptor::instance(ServiceType::of::<u32>(), None, into_any(2u32)));
        assert_eq!(services.position(|d| d.service_type() == ServiceType::of::<u8>()), Some(1));

        let removed = services.remove(0);
        assert_eq!(removed.service_type(), ServiceType::of::<u32>());
        assert_eq!(services.len(), 1);
    }
}
