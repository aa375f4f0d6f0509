//! Runtime service type tokens.
//!
//! Rust has no runtime reflection, so the container identifies services by a
//! small `Copy` token built from `TypeId` plus a handful of monomorphised
//! function pointers. The pointers answer the questions a reflective container
//! would ask of a `System.Type`: "what is your open generic definition?",
//! "what are your type arguments?", "how do I build a proxy of you?".

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::proxy::ProxyHooks;

/// Type-erased shared instance, the unit every call site produces.
///
/// Concrete services are stored as `Arc<T>`. Trait-object services are stored
/// as `Arc<Arc<dyn Trait>>` so that the unsized pointer survives the trip
/// through `dyn Any`.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Erases a concrete value into an [`AnyArc`].
#[inline]
pub fn into_any<T: Send + Sync + 'static>(value: T) -> AnyArc {
    Arc::new(value)
}

/// Erases a trait object into an [`AnyArc`] using the `Arc<Arc<dyn Trait>>` layout.
#[inline]
pub fn into_any_trait<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> AnyArc {
    Arc::new(value)
}

/// Marker for an open generic type definition such as `Repository<_>`.
///
/// Implement it on a zero-sized marker type. The marker's `TypeId` is what the
/// typed-factory table and the proxy registry use to group every closed type of
/// the family.
///
/// ```rust
/// use ferrous_typed_di::GenericDefinition;
///
/// pub struct RepositoryDef;
/// impl GenericDefinition for RepositoryDef {
///     const INTERFACE: bool = true;
/// }
/// ```
pub trait GenericDefinition: 'static {
    /// Whether closed types of this definition are trait objects.
    const INTERFACE: bool;
}

/// A closed generic service type, e.g. `dyn Repository<User>` or `Cache<u64>`.
///
/// The implementation ties the closed type to its open definition. Type
/// arguments and proxy hooks are optional; proxy hooks are required only for
/// types that are proxied.
///
/// ```rust
/// use ferrous_typed_di::{GenericDefinition, GenericService, ServiceType};
///
/// pub struct CacheDef;
/// impl GenericDefinition for CacheDef {
///     const INTERFACE: bool = false;
/// }
///
/// pub struct Cache<T>(Vec<T>);
/// impl<T: Send + Sync + 'static> GenericService for Cache<T> {
///     type Definition = CacheDef;
///     fn type_arguments() -> Vec<ServiceType> {
///         vec![ServiceType::of::<T>()]
///     }
/// }
///
/// let closed = ServiceType::generic::<Cache<u64>>();
/// assert!(closed.is_closed_generic());
/// assert_eq!(closed.definition(), Some(ServiceType::open::<CacheDef>()));
/// assert_eq!(closed.type_arguments(), vec![ServiceType::of::<u64>()]);
/// ```
pub trait GenericService: 'static {
    /// The open generic definition this type closes.
    type Definition: GenericDefinition;

    /// The generic arguments that close the definition.
    fn type_arguments() -> Vec<ServiceType> {
        Vec::new()
    }

    /// Proxy hooks for this exact closed type, when it can be proxied.
    fn proxy_hooks() -> Option<ProxyHooks> {
        None
    }
}

/// Structural shape of a [`ServiceType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeShape {
    /// A sized concrete type stored as `Arc<T>`.
    Concrete,
    /// A trait object stored as `Arc<Arc<dyn Trait>>`.
    Interface,
    /// An open generic definition; never instantiated directly.
    OpenGeneric {
        /// Whether the family consists of trait objects.
        interface: bool,
    },
    /// A closed generic type belonging to some definition.
    Closed {
        /// Whether the closed type is a trait object.
        interface: bool,
    },
}

/// Runtime token identifying a service type.
///
/// Equality and hashing use only the `TypeId`, so two tokens for the same Rust
/// type compare equal regardless of which constructor produced them.
#[derive(Clone, Copy)]
pub struct ServiceType {
    id: TypeId,
    name: &'static str,
    shape: TypeShape,
    definition: Option<fn() -> ServiceType>,
    arguments: Option<fn() -> Vec<ServiceType>>,
    proxy: fn() -> Option<ProxyHooks>,
}

fn no_proxy() -> Option<ProxyHooks> {
    None
}

fn definition_of<T: ?Sized + GenericService>() -> ServiceType {
    ServiceType::open::<T::Definition>()
}

fn interface_hooks<T: ?Sized + crate::proxy::InterfaceProxy>() -> Option<ProxyHooks> {
    Some(ProxyHooks::of::<T>())
}

impl ServiceType {
    /// Token for a concrete type.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            shape: TypeShape::Concrete,
            definition: None,
            arguments: None,
            proxy: no_proxy,
        }
    }

    /// Token for a trait object that carries no proxy hooks.
    pub fn of_trait<T: ?Sized + 'static>() -> Self {
        Self {
            shape: TypeShape::Interface,
            ..Self::of::<T>()
        }
    }

    /// Token for a proxyable trait object.
    pub fn interface<T: ?Sized + crate::proxy::InterfaceProxy>() -> Self {
        Self {
            shape: TypeShape::Interface,
            proxy: interface_hooks::<T>,
            ..Self::of::<T>()
        }
    }

    /// Token for an open generic definition.
    pub fn open<D: GenericDefinition>() -> Self {
        Self {
            shape: TypeShape::OpenGeneric { interface: D::INTERFACE },
            ..Self::of::<D>()
        }
    }

    /// Token for a closed generic type.
    pub fn generic<T: ?Sized + GenericService>() -> Self {
        Self {
            shape: TypeShape::Closed {
                interface: <T::Definition as GenericDefinition>::INTERFACE,
            },
            definition: Some(definition_of::<T>),
            arguments: Some(T::type_arguments),
            proxy: T::proxy_hooks,
            ..Self::of::<T>()
        }
    }

    /// The underlying `TypeId`.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// The `std::any::type_name` of the type.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> TypeShape {
        self.shape
    }

    pub fn is_open_generic(&self) -> bool {
        matches!(self.shape, TypeShape::OpenGeneric { .. })
    }

    pub fn is_closed_generic(&self) -> bool {
        matches!(self.shape, TypeShape::Closed { .. })
    }

    /// Whether the type is a trait object (closed, open or plain).
    pub fn is_interface(&self) -> bool {
        matches!(
            self.shape,
            TypeShape::Interface
                | TypeShape::OpenGeneric { interface: true }
                | TypeShape::Closed { interface: true }
        )
    }

    /// Open generic definition of a closed generic type.
    pub fn definition(&self) -> Option<ServiceType> {
        self.definition.map(|f| f())
    }

    /// Generic arguments of a closed generic type; empty otherwise.
    pub fn type_arguments(&self) -> Vec<ServiceType> {
        self.arguments.map(|f| f()).unwrap_or_default()
    }

    /// Proxy hooks for this type, if it was declared proxyable.
    pub fn proxy_hooks(&self) -> Option<ProxyHooks> {
        (self.proxy)()
    }
}

impl PartialEq for ServiceType {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceType")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .finish()
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ListDef;
    impl GenericDefinition for ListDef {
        const INTERFACE: bool = false;
    }

    struct List<T>(Vec<T>);
    impl<T: Send + Sync + 'static> GenericService for List<T> {
        type Definition = ListDef;
        fn type_arguments() -> Vec<ServiceType> {
            vec![ServiceType::of::<T>()]
        }
    }

    trait Shape: Send + Sync {}

    #[test]
    fn identity_ignores_constructor() {
        assert_eq!(ServiceType::of::<List<u8>>(), ServiceType::generic::<List<u8>>());
        assert_ne!(ServiceType::generic::<List<u8>>(), ServiceType::generic::<List<u16>>());
    }

    #[test]
    fn shapes() {
        assert!(ServiceType::open::<ListDef>().is_open_generic());
        assert!(!ServiceType::open::<ListDef>().is_interface());
        assert!(ServiceType::of_trait::<dyn Shape>().is_interface());
        assert!(!ServiceType::of::<u32>().is_interface());
        assert!(ServiceType::of::<u32>().definition().is_none());
        assert!(ServiceType::of::<u32>().type_arguments().is_empty());
        assert!(ServiceType::of_trait::<dyn Shape>().proxy_hooks().is_none());
    }

    #[test]
    fn closed_generic_knows_its_family() {
        let closed = ServiceType::generic::<List<String>>();
        assert!(closed.is_closed_generic());
        assert_eq!(closed.definition(), Some(ServiceType::open::<ListDef>()));
        assert_eq!(closed.type_arguments(), vec![ServiceType::of::<String>()]);
        assert_eq!(closed.to_string(), type_name::<List<String>>());
    }
}
