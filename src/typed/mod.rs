//! Typed factories: one registration serving a whole open generic family.
//!
//! A typed factory is registered under an open generic definition and is
//! handed the closed [`ServiceType`] that was requested. The provider closes it
//! into an ordinary call site per requested type, so lifetimes apply per closed
//! type: a singleton typed factory yields one instance for `Repo<User>` and
//! another for `Repo<Order>`.

use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::collection::ServiceCollection;
use crate::descriptors::{Ctor, ServiceDescriptor, TypedFactory, TypedKeyedFactory, TypedServiceDescriptor};
use crate::error::{DiError, DiResult};
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;
use crate::service_type::{into_any, into_any_trait, AnyArc, GenericDefinition, GenericService, ServiceType};

mod call_site;
pub use call_site::try_create_typed_factory_call_site;

impl ServiceCollection {
    // ----- Runtime-token registrations -----

    /// Registers a typed factory for an open generic definition given as a token.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::InvalidDescriptor`] when `service_type` is not an open
    /// generic definition.
    pub fn add_typed_factory(
        &mut self,
        service_type: ServiceType,
        lifetime: Lifetime,
        factory: TypedFactory,
    ) -> DiResult<&mut Self> {
        let typed = TypedServiceDescriptor::new(service_type, factory, lifetime)?;
        Ok(self.add(ServiceDescriptor::typed(typed)))
    }

    /// Keyed counterpart of [`add_typed_factory`](Self::add_typed_factory).
    pub fn add_keyed_typed_factory(
        &mut self,
        service_type: ServiceType,
        key: impl Into<ServiceKey>,
        lifetime: Lifetime,
        factory: TypedKeyedFactory,
    ) -> DiResult<&mut Self> {
        let typed = TypedServiceDescriptor::new_keyed(service_type, key.into(), factory, lifetime)?;
        Ok(self.add(ServiceDescriptor::typed(typed)))
    }

    // ----- Definition-typed sugar -----

    /// Registers a singleton typed factory for the definition `D`.
    ///
    /// Every closed type of the family gets its own singleton.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_typed_di::{
    ///     into_any, GenericDefinition, GenericService, Resolver, ResolverContext, ServiceCollection,
    ///     ServiceType, DiError,
    /// };
    /// use std::sync::Arc;
    ///
    /// struct ListDef;
    /// impl GenericDefinition for ListDef {
    ///     const INTERFACE: bool = false;
    /// }
    ///
    /// #[derive(Default)]
    /// struct List<T>(Vec<T>);
    /// impl<T: Send + Sync + 'static> GenericService for List<T> {
    ///     type Definition = ListDef;
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton_typed_factory::<ListDef, _>(|_ctx: &ResolverContext, requested: &ServiceType| {
    ///     if *requested == ServiceType::of::<List<u8>>() {
    ///         Ok(into_any(List::<u8>::default()))
    ///     } else if *requested == ServiceType::of::<List<String>>() {
    ///         Ok(into_any(List::<String>::default()))
    ///     } else {
    ///         Err(DiError::NotFound(requested.name()))
    ///     }
    /// });
    ///
    /// let provider = services.build();
    /// let a = provider.get_generic_required::<List<u8>>();
    /// let b = provider.get_generic_required::<List<u8>>();
    /// let c = provider.get_generic_required::<List<String>>();
    /// assert!(Arc::ptr_eq(&a, &b));
    /// assert_eq!(c.0.len(), 0);
    /// ```
    pub fn add_singleton_typed_factory<D, F>(&mut self, factory: F) -> &mut Self
    where
        D: GenericDefinition,
        F: Fn(&ResolverContext<'_>, &ServiceType) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        self.add_definition_factory::<D, F>(Lifetime::Singleton, factory)
    }

    /// Registers a scoped typed factory for the definition `D`.
    pub fn add_scoped_typed_factory<D, F>(&mut self, factory: F) -> &mut Self
    where
        D: GenericDefinition,
        F: Fn(&ResolverContext<'_>, &ServiceType) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        self.add_definition_factory::<D, F>(Lifetime::Scoped, factory)
    }

    /// Registers a transient typed factory for the definition `D`.
    pub fn add_transient_typed_factory<D, F>(&mut self, factory: F) -> &mut Self
    where
        D: GenericDefinition,
        F: Fn(&ResolverContext<'_>, &ServiceType) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        self.add_definition_factory::<D, F>(Lifetime::Transient, factory)
    }

    /// Registers a keyed singleton typed factory for the definition `D`.
    ///
    /// The factory receives the key it was resolved with.
    pub fn add_keyed_singleton_typed_factory<D, F>(&mut self, key: impl Into<ServiceKey>, factory: F) -> &mut Self
    where
        D: GenericDefinition,
        F: Fn(&ResolverContext<'_>, &ServiceKey, &ServiceType) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        self.add_keyed_definition_factory::<D, F>(key.into(), Lifetime::Singleton, factory)
    }

    pub fn add_keyed_scoped_typed_factory<D, F>(&mut self, key: impl Into<ServiceKey>, factory: F) -> &mut Self
    where
        D: GenericDefinition,
        F: Fn(&ResolverContext<'_>, &ServiceKey, &ServiceType) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        self.add_keyed_definition_factory::<D, F>(key.into(), Lifetime::Scoped, factory)
    }

    pub fn add_keyed_transient_typed_factory<D, F>(&mut self, key: impl Into<ServiceKey>, factory: F) -> &mut Self
    where
        D: GenericDefinition,
        F: Fn(&ResolverContext<'_>, &ServiceKey, &ServiceType) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        self.add_keyed_definition_factory::<D, F>(key.into(), Lifetime::Transient, factory)
    }

    fn add_definition_factory<D, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        D: GenericDefinition,
        F: Fn(&ResolverContext<'_>, &ServiceType) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        let typed = TypedServiceDescriptor::for_definition::<D>(Arc::new(factory), lifetime);
        self.add(ServiceDescriptor::typed(typed))
    }

    fn add_keyed_definition_factory<D, F>(&mut self, key: ServiceKey, lifetime: Lifetime, factory: F) -> &mut Self
    where
        D: GenericDefinition,
        F: Fn(&ResolverContext<'_>, &ServiceKey, &ServiceType) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        let typed = TypedServiceDescriptor::for_keyed_definition::<D>(key, Arc::new(factory), lifetime);
        self.add(ServiceDescriptor::typed(typed))
    }
}

/// Lookup table from closed type to constructor for one generic family.
///
/// Rust cannot instantiate `Repo<T>` for a `T` only known at runtime, so a
/// typed factory has to know the closed types it can build up front. The
/// table collects one constructor per closed type and turns into a typed
/// factory that dispatches on the requested type.
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{GenericDefinition, GenericFactoryTable, GenericService, Resolver, ServiceCollection, DiError};
/// use std::sync::Arc;
///
/// pub trait Repository<T>: Send + Sync {
///     fn table(&self) -> &'static str;
/// }
/// pub struct RepositoryDef;
/// impl GenericDefinition for RepositoryDef {
///     const INTERFACE: bool = true;
/// }
/// impl<T: 'static> GenericService for dyn Repository<T> {
///     type Definition = RepositoryDef;
/// }
///
/// struct Users;
/// impl Repository<u32> for Users {
///     fn table(&self) -> &'static str { "users" }
/// }
///
/// let table = GenericFactoryTable::<RepositoryDef>::new()
///     .interface::<dyn Repository<u32>, _>(|_| Arc::new(Users) as Arc<dyn Repository<u32>>);
///
/// let mut services = ServiceCollection::new();
/// services.add_scoped_typed_factory::<RepositoryDef, _>(table.into_factory());
///
/// let provider = services.build();
/// let scope = provider.create_scope();
/// assert_eq!(scope.get_generic_trait_required::<dyn Repository<u32>>().table(), "users");
/// assert!(matches!(
///     scope.get_generic_trait::<dyn Repository<String>>(),
///     Err(DiError::NotFound(_))
/// ));
/// ```
pub struct GenericFactoryTable<D: GenericDefinition> {
    entries: HashMap<TypeId, Ctor>,
    _definition: PhantomData<fn() -> D>,
}

impl<D: GenericDefinition> GenericFactoryTable<D> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            _definition: PhantomData,
        }
    }

    /// Adds the constructor of a concrete closed type.
    pub fn concrete<T, F>(mut self, factory: F) -> Self
    where
        T: GenericService<Definition = D> + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        let ctor: Ctor = Arc::new(move |ctx: &ResolverContext<'_>| Ok(into_any(factory(ctx))));
        self.entries.insert(TypeId::of::<T>(), ctor);
        self
    }

    /// Adds the constructor of a trait-object closed type.
    pub fn interface<T, F>(mut self, factory: F) -> Self
    where
        T: ?Sized + GenericService<Definition = D> + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> Arc<T> + Send + Sync + 'static,
    {
        let ctor: Ctor = Arc::new(move |ctx: &ResolverContext<'_>| Ok(into_any_trait(factory(ctx))));
        self.entries.insert(TypeId::of::<T>(), ctor);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, service_type: &ServiceType) -> bool {
        self.entries.contains_key(&service_type.type_id())
    }

    /// Typed factory dispatching on the requested type.
    ///
    /// Unknown closed types resolve to [`DiError::NotFound`].
    pub fn into_factory(
        self,
    ) -> impl Fn(&ResolverContext<'_>, &ServiceType) -> DiResult<AnyArc> + Send + Sync + 'static {
        let entries = Arc::new(self.entries);
        move |ctx: &ResolverContext<'_>, requested: &ServiceType| dispatch(&entries, ctx, requested)
    }

    /// Keyed typed factory dispatching on the requested type; the key is ignored.
    pub fn into_keyed_factory(
        self,
    ) -> impl Fn(&ResolverContext<'_>, &ServiceKey, &ServiceType) -> DiResult<AnyArc> + Send + Sync + 'static {
        let entries = Arc::new(self.entries);
        move |ctx: &ResolverContext<'_>, _key: &ServiceKey, requested: &ServiceType| {
            dispatch(&entries, ctx, requested)
        }
    }
}

impl<D: GenericDefinition> Default for GenericFactoryTable<D> {
    fn default() -> Self {
        Self::new()
    }
}

fn dispatch(entries: &HashMap<TypeId, Ctor>, ctx: &ResolverContext<'_>, requested: &ServiceType) -> DiResult<AnyArc> {
    match entries.get(&requested.type_id()) {
        Some(ctor) => ctor(ctx),
        None => Err(DiError::NotFound(requested.name())),
    }
}
