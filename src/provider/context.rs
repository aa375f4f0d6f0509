//! Resolver context for dependency injection.
//!
//! This module contains the ResolverContext type which provides
//! the interface for factory functions to resolve dependencies.

use crate::error::DiResult;
use crate::key::{Key, ServiceKey};
use crate::service_type::{AnyArc, ServiceType};
use crate::traits::{Resolver, ResolverCore};

/// Context passed to factory functions for resolving dependencies.
///
/// ResolverContext wraps a resolver (ServiceProvider or Scope) and provides
/// the interface that factory functions use to access other services. This
/// allows factory functions to be independent of the specific resolver type.
///
/// Singleton factories always receive a context over the root provider, so a
/// singleton can never capture a scoped service of whichever scope happened
/// to trigger its construction.
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
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database {
///     url: "postgres://localhost".to_string()
/// });
/// services.add_transient_factory::<UserService, _>(|resolver| {
///     // resolver is a ResolverContext that provides access to other services
///     UserService {
///         db: resolver.get_required::<Database>(),
///     }
/// });
/// ```
pub struct ResolverContext<'a> {
    resolver: &'a dyn ResolverCore,
}

impl<'a> ResolverContext<'a> {
    /// Creates a new ResolverContext wrapping the given resolver.
    pub(crate) fn new<T>(resolver: &'a T) -> Self
    where
        T: ResolverCore,
    {
        Self { resolver }
    }
}

impl<'a> ResolverCore for ResolverContext<'a> {
    fn resolve(&self, service: &ServiceType, key: Option<&ServiceKey>) -> DiResult<AnyArc> {
        self.resolver.resolve(service, key)
    }

    fn notify_proxy_created(&self, key: &Key) {
        self.resolver.notify_proxy_created(key);
    }
}

impl<'a> Resolver for ResolverContext<'a> {}
