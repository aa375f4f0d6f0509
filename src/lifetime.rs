//! Service lifetime definitions.

use std::fmt;

/// Service lifetimes controlling instance caching behavior
///
/// A lifetime decides how often a call site's constructor runs. For typed
/// factories the cache slot belongs to the *closed* requested type, so one
/// open-generic singleton registration yields one instance per closed type.
///
/// # Lifetime Characteristics
///
/// - **Singleton**: one instance per call site in the root provider
/// - **Scoped**: one instance per call site per scope
/// - **Transient**: a fresh instance on every resolution
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{ServiceCollection, Resolver};
///
/// struct Database { url: String }
/// struct Repository { db_url: String }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() });
/// services.add_scoped_factory::<Repository, _>(|r| {
///     let db = r.get_required::<Database>();
///     Repository { db_url: db.url.clone() }
/// });
///
/// let provider = services.build();
///
/// let db1 = provider.get_required::<Database>();
/// let scope1 = provider.create_scope();
/// let db2 = scope1.get_required::<Database>();
/// assert!(std::ptr::eq(&*db1, &*db2));
///
/// let repo1a = scope1.get_required::<Repository>();
/// let repo1b = scope1.get_required::<Repository>();
/// assert!(std::ptr::eq(&*repo1a, &*repo1b));
///
/// let scope2 = provider.create_scope();
/// let repo2 = scope2.get_required::<Repository>();
/// assert!(!std::ptr::eq(&*repo1a, &*repo2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub enum Lifetime {
    /// Single instance per root provider, cached forever
    ///
    /// Singletons resolved from a scope are still created against the root
    /// provider, so they never capture scoped dependencies of that scope.
    Singleton,
    /// Single instance per scope, cached for scope lifetime
    Scoped,
    /// New instance per resolution, never cached
    Transient,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifetime::Singleton => "Singleton",
            Lifetime::Scoped => "Scoped",
            Lifetime::Transient => "Transient",
        };
        f.write_str(name)
    }
}
