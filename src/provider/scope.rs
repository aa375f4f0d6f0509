//! Scoped service resolution.
//!
//! This module contains the Scope type for managing request-scoped services.

use crate::error::DiResult;
use crate::key::{Key, ServiceKey};
use crate::registration::ScopedCache;
use crate::service_type::{AnyArc, ServiceType};
use crate::traits::{Resolver, ResolverCore};
use super::{resolve_key, ServiceProvider};

/// Scoped service container for request-scoped dependency resolution.
///
/// A `Scope` provides isolated dependency resolution for scoped services while
/// still accessing singleton services from the root provider.
///
/// # Lifetime Behavior
///
/// - **Singleton**: Resolved and cached in the root provider (shared across all scopes)
/// - **Scoped**: Resolved and cached within this specific scope, per call site.
///   A typed factory therefore yields one instance per closed type per scope.
/// - **Transient**: Created fresh on every resolution (no caching)
///
/// # Examples
///
/// ```
/// use ferrous_typed_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// #[derive(Debug)]
/// struct DatabaseConnection(String);
///
/// #[derive(Debug)]
/// struct UserService {
///     db: Arc<DatabaseConnection>,
/// }
///
/// let mut collection = ServiceCollection::new();
///
/// // Scoped database connection per request
/// collection.add_scoped_factory::<DatabaseConnection, _>(|_| {
///     DatabaseConnection("connection-123".to_string())
/// });
///
/// // Transient user service that uses scoped DB connection
/// collection.add_transient_factory::<UserService, _>(|resolver| {
///     UserService {
///         db: resolver.get_required::<DatabaseConnection>(),
///     }
/// });
///
/// let provider = collection.build();
/// let scope = provider.create_scope();
///
/// // Multiple services in the same scope share the same DB connection
/// let user1 = scope.get_required::<UserService>();
/// let user2 = scope.get_required::<UserService>();
/// assert!(Arc::ptr_eq(&user1.db, &user2.db));
/// ```
pub struct Scope {
    pub(crate) root: ServiceProvider,
    scoped: ScopedCache,
}

impl Scope {
    pub(crate) fn new(root: ServiceProvider) -> Self {
        Self {
            root,
            scoped: ScopedCache::default(),
        }
    }

    pub(crate) fn cache(&self) -> &ScopedCache {
        &self.scoped
    }

    /// The provider this scope was created from.
    pub fn root(&self) -> &ServiceProvider {
        &self.root
    }

    /// Number of scoped instances this scope has constructed.
    pub fn scoped_instance_count(&self) -> usize {
        self.scoped.len()
    }
}

impl Clone for Scope {
    fn clone(&self) -> Self {
        // Create a new scope with the same root but fresh scoped state
        Self::new(self.root.clone())
    }
}

impl ResolverCore for Scope {
    fn resolve(&self, service: &ServiceType, key: Option<&ServiceKey>) -> DiResult<AnyArc> {
        let key = Key::new(*service, key.cloned());
        resolve_key(&self.root, Some(self), &key)
    }

    fn notify_proxy_created(&self, key: &Key) {
        self.root.notify_proxy_created(key);
    }
}

impl Resolver for Scope {}
