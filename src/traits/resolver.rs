//! Resolver traits for service resolution.

use std::any::type_name;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::{Key, ServiceKey};
use crate::service_type::{AnyArc, GenericService, ServiceType};

/// Core resolver trait for object-safe service resolution.
///
/// This trait provides the fundamental service resolution capabilities that are
/// object-safe (can be used as trait objects). It handles the low-level resolution
/// mechanics including circular dependency detection through thread-local stacks.
///
/// Most users should use the [`Resolver`] trait instead, which provides more
/// ergonomic generic methods built on top of this trait.
pub trait ResolverCore: Send + Sync {
    /// Resolves a service by runtime type token and optional key.
    ///
    /// Exact registrations are consulted first. When none matches and the type
    /// is a closed generic, typed factories registered for its open definition
    /// are probed.
    ///
    /// # Returns
    ///
    /// * `Ok(AnyArc)` - The resolved service wrapped in `Arc<dyn Any>`
    /// * `Err(DiError)` - Resolution error (not found, wrong lifetime, circular, etc.)
    fn resolve(&self, service: &ServiceType, key: Option<&ServiceKey>) -> DiResult<AnyArc>;

    /// Reports that a proxy instance was created for `key`.
    #[doc(hidden)]
    fn notify_proxy_created(&self, key: &Key) {
        let _ = key;
    }
}

fn downcast<T: Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(type_name::<T>()))
}

// Handle Arc<Arc<dyn Trait>> storage pattern
fn downcast_trait<T: ?Sized + Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<Arc<T>>()
        .map(|boxed| (*boxed).clone())
        .map_err(|_| DiError::TypeMismatch(type_name::<T>()))
}

/// High-level resolver interface with generic methods for type-safe service resolution.
///
/// This trait provides the main API that users interact with for resolving services.
/// It builds on [`ResolverCore`] to offer type-safe generic methods that handle
/// the complexities of type erasure and casting internally.
///
/// `ServiceProvider`, `Scope` and the `ResolverContext` handed to factories
/// all implement it.
///
/// Closed generic types must be resolved through the `*_generic*` methods:
/// only those carry the link to the open definition that typed factories are
/// registered under.
///
/// # Examples
///
/// ```
/// use ferrous_typed_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str);
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) {
///         println!("LOG: {}", msg);
///     }
/// }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(42usize);
/// collection.add_singleton_trait(Arc::new(ConsoleLogger) as Arc<dyn Logger>);
///
/// let provider = collection.build();
///
/// let number = provider.get_required::<usize>();
/// assert_eq!(*number, 42);
///
/// let logger = provider.get_required_trait::<dyn Logger>();
/// logger.log("Service resolved successfully");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a concrete service type.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_typed_di::{ServiceCollection, Resolver};
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_singleton("configuration".to_string());
    ///
    /// let provider = collection.build();
    /// let config = provider.get::<String>().unwrap();
    /// assert_eq!(&*config, "configuration");
    /// ```
    fn get<T: 'static + Send + Sync>(&self) -> DiResult<Arc<T>> {
        downcast(self.resolve(&ServiceType::of::<T>(), None)?)
    }

    /// Resolves a trait implementation.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_typed_di::{ServiceCollection, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Database: Send + Sync {
    ///     fn connect(&self) -> &str;
    /// }
    ///
    /// struct PostgresDb;
    /// impl Database for PostgresDb {
    ///     fn connect(&self) -> &str { "postgres://..." }
    /// }
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_singleton_trait(Arc::new(PostgresDb) as Arc<dyn Database>);
    ///
    /// let provider = collection.build();
    /// let db = provider.get_trait::<dyn Database>().unwrap();
    /// assert_eq!(db.connect(), "postgres://...");
    /// ```
    fn get_trait<T: ?Sized + 'static + Send + Sync>(&self) -> DiResult<Arc<T>> {
        downcast_trait(self.resolve(&ServiceType::of_trait::<T>(), None)?)
    }

    /// Resolves a keyed concrete service.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_typed_di::{ServiceCollection, Resolver};
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_keyed_singleton("port", 8080u16);
    ///
    /// let provider = collection.build();
    /// assert_eq!(*provider.get_keyed::<u16>("port").unwrap(), 8080);
    /// assert!(provider.get::<u16>().is_err());
    /// ```
    fn get_keyed<T: 'static + Send + Sync>(&self, key: impl Into<ServiceKey>) -> DiResult<Arc<T>> {
        let key = key.into();
        downcast(self.resolve(&ServiceType::of::<T>(), Some(&key))?)
    }

    /// Resolves a keyed trait implementation.
    fn get_keyed_trait<T: ?Sized + 'static + Send + Sync>(&self, key: impl Into<ServiceKey>) -> DiResult<Arc<T>> {
        let key = key.into();
        downcast_trait(self.resolve(&ServiceType::of_trait::<T>(), Some(&key))?)
    }

    /// Resolves a closed generic concrete service.
    fn get_generic<T: GenericService + Send + Sync>(&self) -> DiResult<Arc<T>> {
        downcast(self.resolve(&ServiceType::generic::<T>(), None)?)
    }

    /// Resolves a closed generic trait object.
    fn get_generic_trait<T: ?Sized + GenericService + Send + Sync>(&self) -> DiResult<Arc<T>> {
        downcast_trait(self.resolve(&ServiceType::generic::<T>(), None)?)
    }

    /// Resolves a keyed closed generic concrete service.
    fn get_keyed_generic<T: GenericService + Send + Sync>(&self, key: impl Into<ServiceKey>) -> DiResult<Arc<T>> {
        let key = key.into();
        downcast(self.resolve(&ServiceType::generic::<T>(), Some(&key))?)
    }

    /// Resolves a keyed closed generic trait object.
    fn get_keyed_generic_trait<T: ?Sized + GenericService + Send + Sync>(
        &self,
        key: impl Into<ServiceKey>,
    ) -> DiResult<Arc<T>> {
        let key = key.into();
        downcast_trait(self.resolve(&ServiceType::generic::<T>(), Some(&key))?)
    }

    /// Resolves a concrete service type, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if the service cannot be resolved (not found, wrong lifetime,
    /// circular dependency, etc.).
    fn get_required<T: 'static + Send + Sync>(&self) -> Arc<T> {
        self.get::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {:?}", type_name::<T>(), e))
    }

    /// Resolves a trait implementation, panicking on failure.
    fn get_required_trait<T: ?Sized + 'static + Send + Sync>(&self) -> Arc<T> {
        self.get_trait::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve trait {}: {:?}", type_name::<T>(), e))
    }

    /// Resolves a keyed concrete service, panicking on failure.
    fn get_keyed_required<T: 'static + Send + Sync>(&self, key: impl Into<ServiceKey>) -> Arc<T> {
        let key = key.into();
        self.get_keyed::<T>(key.clone())
            .unwrap_or_else(|e| panic!("Failed to resolve keyed {} ({}): {:?}", type_name::<T>(), key, e))
    }

    /// Resolves a keyed trait implementation, panicking on failure.
    fn get_keyed_trait_required<T: ?Sized + 'static + Send + Sync>(&self, key: impl Into<ServiceKey>) -> Arc<T> {
        let key = key.into();
        self.get_keyed_trait::<T>(key.clone())
            .unwrap_or_else(|e| panic!("Failed to resolve keyed trait {} ({}): {:?}", type_name::<T>(), key, e))
    }

    /// Resolves a closed generic concrete service, panicking on failure.
    fn get_generic_required<T: GenericService + Send + Sync>(&self) -> Arc<T> {
        self.get_generic::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve generic {}: {:?}", type_name::<T>(), e))
    }

    /// Resolves a closed generic trait object, panicking on failure.
    fn get_generic_trait_required<T: ?Sized + GenericService + Send + Sync>(&self) -> Arc<T> {
        self.get_generic_trait::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve generic trait {}: {:?}", type_name::<T>(), e))
    }

    /// Resolves a keyed closed generic concrete service, panicking on failure.
    fn get_keyed_generic_required<T: GenericService + Send + Sync>(&self, key: impl Into<ServiceKey>) -> Arc<T> {
        let key = key.into();
        self.get_keyed_generic::<T>(key.clone())
            .unwrap_or_else(|e| panic!("Failed to resolve keyed generic {} ({}): {:?}", type_name::<T>(), key, e))
    }

    /// Resolves a keyed closed generic trait object, panicking on failure.
    fn get_keyed_generic_trait_required<T: ?Sized + GenericService + Send + Sync>(
        &self,
        key: impl Into<ServiceKey>,
    ) -> Arc<T> {
        let key = key.into();
        self.get_keyed_generic_trait::<T>(key.clone())
            .unwrap_or_else(|e| panic!("Failed to resolve keyed generic trait {} ({}): {:?}", type_name::<T>(), key, e))
    }
}
