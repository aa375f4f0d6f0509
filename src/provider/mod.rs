//! Service provider module for dependency injection.
//!
//! This module contains the ServiceProvider type and related functionality
//! for resolving registered services from the DI container.

use std::sync::Arc;
use std::time::Instant;

use crate::descriptors::ServiceDescriptor;
use crate::error::{DiError, DiResult};
use crate::internal::with_circular_catch;
use crate::key::{Key, ServiceKey};
use crate::lifetime::Lifetime;
use crate::observer::Observers;
use crate::options::ServiceProviderOptions;
use crate::registration::{CallSiteTable, ScopedCache};
use crate::service_type::{AnyArc, ServiceType};
use crate::traits::{Resolver, ResolverCore};

pub mod context;
pub mod factory;
pub mod scope;
pub use context::ResolverContext;
pub use factory::{DefaultServiceProviderFactory, ProxyServiceProviderFactory, ServiceProviderFactory};
pub use scope::Scope;

/// Service provider for resolving dependencies from the DI container.
///
/// The `ServiceProvider` resolves services according to their registered
/// lifetimes (Singleton, Scoped, Transient). Lookups go to the exact call-site
/// table first; a miss on a closed generic type falls back to the typed
/// factories registered for its open definition, and the resulting closed call
/// site is cached for the lifetime of the provider.
///
/// # Thread Safety
///
/// ServiceProvider is fully thread-safe and can be shared across multiple threads.
/// Singleton services are constructed at most once per call site, and the
/// provider can be cloned cheaply (it uses `Arc` internally).
///
/// # Examples
///
/// ```
/// use ferrous_typed_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(Database { url: "postgres://localhost".to_string() });
/// collection.add_transient_factory::<UserService, _>(|resolver| {
///     UserService { db: resolver.get_required::<Database>() }
/// });
///
/// let provider = collection.build();
/// let user_service = provider.get_required::<UserService>();
/// assert_eq!(user_service.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

pub(crate) struct ProviderInner {
    pub(crate) table: CallSiteTable,
    pub(crate) observers: Observers,
    pub(crate) options: ServiceProviderOptions,
    /// Scoped cache of the root provider, used only when scope validation is off
    pub(crate) root_scoped: ScopedCache,
}

impl ServiceProvider {
    /// Create a new ServiceProvider from the collected descriptors.
    /// This is used internally by ServiceCollection.build().
    pub(crate) fn new(
        descriptors: &[ServiceDescriptor],
        observers: Observers,
        options: ServiceProviderOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                table: CallSiteTable::build(descriptors),
                observers,
                options,
                root_scoped: ScopedCache::default(),
            }),
        }
    }

    /// Convenience accessor for the inner provider
    #[inline]
    pub(crate) fn inner(&self) -> &ProviderInner {
        &self.inner
    }

    pub fn options(&self) -> ServiceProviderOptions {
        self.inner.options
    }

    /// Creates a new scope for resolving scoped services.
    ///
    /// Each scope maintains its own cache of scoped services, keyed by call
    /// site, while singletons keep coming from the root provider.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_typed_di::{ServiceCollection, Resolver};
    /// use std::sync::{Arc, Mutex};
    ///
    /// #[derive(Debug)]
    /// struct RequestId(String);
    ///
    /// let mut collection = ServiceCollection::new();
    /// let counter = Arc::new(Mutex::new(0));
    /// let counter_clone = counter.clone();
    ///
    /// collection.add_scoped_factory::<RequestId, _>(move |_| {
    ///     let mut c = counter_clone.lock().unwrap();
    ///     *c += 1;
    ///     RequestId(format!("req-{}", *c))
    /// });
    ///
    /// let provider = collection.build();
    ///
    /// let scope1 = provider.create_scope();
    /// let scope2 = provider.create_scope();
    ///
    /// let req1a = scope1.get_required::<RequestId>();
    /// let req1b = scope1.get_required::<RequestId>(); // Same instance
    /// let req2 = scope2.get_required::<RequestId>(); // Different instance
    ///
    /// assert!(Arc::ptr_eq(&req1a, &req1b));
    /// assert!(!Arc::ptr_eq(&req1a, &req2));
    /// ```
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.clone())
    }

    /// Number of closed call sites created from typed factories so far.
    pub fn closed_call_site_count(&self) -> usize {
        self.inner.table.closed_len()
    }

    /// Constructs every exact singleton, stopping at the first error.
    pub(crate) fn validate_singletons(&self) -> DiResult<()> {
        let singletons: Vec<Key> = self
            .inner
            .table
            .exact_sites()
            .filter(|(_, site)| site.lifetime() == Lifetime::Singleton)
            .map(|(key, _)| key.clone())
            .collect();
        for key in singletons {
            self.resolve(&key.service, key.service_key.as_ref())?;
        }
        Ok(())
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Service Provider Debug ===\n");
        s.push_str("Exact Call Sites:\n");
        for (k, site) in self.inner.table.exact_sites() {
            s.push_str(&format!("  {}: {}\n", k, site.lifetime()));
        }
        s.push_str("Typed Factories:\n");
        for (k, count) in self.inner.table.typed_registrations() {
            s.push_str(&format!("  {}: {} registration(s)\n", k, count));
        }
        s.push_str(&format!("Closed Call Sites: {}\n", self.inner.table.closed_len()));
        s
    }
}

pub(crate) fn not_found(key: &Key) -> DiError {
    match &key.service_key {
        Some(service_key) => DiError::KeyedNotFound {
            service: key.display_name(),
            key: service_key.to_string(),
        },
        None => DiError::NotFound(key.display_name()),
    }
}

/// Resolves `key` against the root provider, or against `scope` when given.
///
/// Singletons always construct against the root; scoped services use the
/// scope cache; transients run the constructor on every call.
pub(crate) fn resolve_key(root: &ServiceProvider, scope: Option<&Scope>, key: &Key) -> DiResult<AnyArc> {
    let inner = root.inner();
    if !inner.observers.has_observers() {
        return with_circular_catch(key, || resolve_call_site(root, scope, key));
    }

    let start = Instant::now();
    inner.observers.resolving(key);
    let result = with_circular_catch(key, || resolve_call_site(root, scope, key));
    match &result {
        Ok(_) => inner.observers.resolved(key, start.elapsed()),
        Err(error) => inner.observers.resolution_failed(key, error),
    }
    result
}

fn resolve_call_site(root: &ServiceProvider, scope: Option<&Scope>, key: &Key) -> DiResult<AnyArc> {
    let inner = root.inner();
    let site = inner
        .table
        .find(key, &inner.observers)
        .ok_or_else(|| not_found(key))?;

    match site.lifetime() {
        Lifetime::Singleton => match site.singleton_cell() {
            Some(cell) => cell
                .get_or_try_init(|| site.invoke(&ResolverContext::new(root)))
                .map(|value| value.clone()),
            None => site.invoke(&ResolverContext::new(root)),
        },
        Lifetime::Scoped => match scope {
            Some(scope) => scope
                .cache()
                .get_or_try_init(site.key(), || site.invoke(&ResolverContext::new(scope))),
            None if inner.options.validate_scopes => {
                Err(DiError::WrongLifetime("Cannot resolve scoped service from root provider"))
            }
            None => inner
                .root_scoped
                .get_or_try_init(site.key(), || site.invoke(&ResolverContext::new(root))),
        },
        Lifetime::Transient => match scope {
            Some(scope) => site.invoke(&ResolverContext::new(scope)),
            None => site.invoke(&ResolverContext::new(root)),
        },
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve(&self, service: &ServiceType, key: Option<&ServiceKey>) -> DiResult<AnyArc> {
        let key = Key::new(*service, key.cloned());
        resolve_key(self, None, &key)
    }

    fn notify_proxy_created(&self, key: &Key) {
        self.inner.observers.proxy_created(key);
    }
}

impl Resolver for ServiceProvider {}
