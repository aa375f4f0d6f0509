//! Service descriptors: the registration records held by a `ServiceCollection`.

use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::{Key, ServiceKey};
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;
use crate::proxy::OriginalServiceKey;
use crate::service_type::{AnyArc, GenericDefinition, ServiceType};

/// Constructor of a non-keyed service.
pub type Ctor = Arc<dyn Fn(&ResolverContext<'_>) -> DiResult<AnyArc> + Send + Sync>;

/// Constructor of a keyed service; receives the key it was resolved with.
pub type KeyedCtor =
    Arc<dyn Fn(&ResolverContext<'_>, &ServiceKey) -> DiResult<AnyArc> + Send + Sync>;

/// Typed factory: receives the closed service type that was requested.
pub type TypedFactory =
    Arc<dyn Fn(&ResolverContext<'_>, &ServiceType) -> DiResult<AnyArc> + Send + Sync>;

/// Keyed typed factory: receives the key and the closed service type that was requested.
pub type TypedKeyedFactory = Arc<
    dyn Fn(&ResolverContext<'_>, &ServiceKey, &ServiceType) -> DiResult<AnyArc> + Send + Sync,
>;

const NOT_KEYED: &str = "This service descriptor is not keyed.";

/// How a descriptor produces its instance.
#[derive(Clone)]
pub enum Implementation {
    /// A pre-built instance
    Instance(AnyArc),
    /// A factory ignoring the service key
    Factory(Ctor),
    /// A factory receiving the service key
    KeyedFactory(KeyedCtor),
    /// A factory receiving the requested closed type
    Typed(TypedServiceDescriptor),
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Implementation::Instance(_) => f.write_str("Instance"),
            Implementation::Factory(_) => f.write_str("Factory"),
            Implementation::KeyedFactory(_) => f.write_str("KeyedFactory"),
            Implementation::Typed(typed) => write!(f, "Typed({})", typed),
        }
    }
}

/// Service descriptor for registration and introspection
///
/// The identity of a descriptor is its service type plus optional service key.
/// A `ServiceCollection` is an ordered list of descriptors; when several share
/// an identity, the last one wins at build time.
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{ServiceCollection, ServiceDescriptor, ServiceType, Lifetime};
///
/// struct Database { url: String }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() });
/// services.add_keyed_singleton("replica", Database { url: "postgres://replica".to_string() });
///
/// let keyed = services.iter().filter(|d| d.is_keyed()).count();
/// assert_eq!(keyed, 1);
///
/// let db = services.iter()
///     .find(|d| d.service_type() == ServiceType::of::<Database>() && !d.is_keyed())
///     .unwrap();
/// assert_eq!(db.lifetime(), Lifetime::Singleton);
/// ```
#[derive(Clone, Debug)]
pub struct ServiceDescriptor {
    service_type: ServiceType,
    service_key: Option<ServiceKey>,
    lifetime: Lifetime,
    implementation: Implementation,
}

impl ServiceDescriptor {
    /// Descriptor for a pre-built singleton instance.
    pub fn instance(service_type: ServiceType, service_key: Option<ServiceKey>, instance: AnyArc) -> Self {
        Self {
            service_type,
            service_key,
            lifetime: Lifetime::Singleton,
            implementation: Implementation::Instance(instance),
        }
    }

    /// Descriptor for an unkeyed factory.
    pub fn factory(service_type: ServiceType, lifetime: Lifetime, ctor: Ctor) -> Self {
        Self {
            service_type,
            service_key: None,
            lifetime,
            implementation: Implementation::Factory(ctor),
        }
    }

    /// Descriptor for a keyed factory.
    pub fn keyed_factory(
        service_type: ServiceType,
        service_key: ServiceKey,
        lifetime: Lifetime,
        ctor: KeyedCtor,
    ) -> Self {
        Self {
            service_type,
            service_key: Some(service_key),
            lifetime,
            implementation: Implementation::KeyedFactory(ctor),
        }
    }

    /// Descriptor wrapping a typed factory.
    pub fn typed(typed: TypedServiceDescriptor) -> Self {
        Self {
            service_type: typed.service_type,
            service_key: typed.service_key.clone(),
            lifetime: typed.lifetime,
            implementation: Implementation::Typed(typed),
        }
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn service_key(&self) -> Option<&ServiceKey> {
        self.service_key.as_ref()
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    pub fn is_keyed(&self) -> bool {
        self.service_key.is_some()
    }

    /// Whether this descriptor carries a typed factory.
    pub fn is_typed(&self) -> bool {
        matches!(self.implementation, Implementation::Typed(_))
    }

    pub fn as_typed(&self) -> Option<&TypedServiceDescriptor> {
        match &self.implementation {
            Implementation::Typed(typed) => Some(typed),
            _ => None,
        }
    }

    /// The lookup identity of this descriptor.
    pub fn key(&self) -> Key {
        Key::new(self.service_type, self.service_key.clone())
    }

    /// Same type, key and lifetime.
    pub(crate) fn matches(&self, service_type: &ServiceType, key: Option<&ServiceKey>, lifetime: Lifetime) -> bool {
        self.service_type == *service_type && self.service_key.as_ref() == key && self.lifetime == lifetime
    }

    /// Re-registers this descriptor under `original_key`.
    ///
    /// Factories keep seeing the key they were registered with: unkeyed factories
    /// ignore the key, keyed factories receive the unwrapped original key.
    pub(crate) fn rekey_as_original(&self, original_key: OriginalServiceKey) -> DiResult<ServiceDescriptor> {
        let new_key = ServiceKey::Original(original_key);
        let lifetime = self.lifetime;
        let descriptor = match &self.implementation {
            Implementation::Instance(instance) => {
                ServiceDescriptor::instance(self.service_type, Some(new_key), instance.clone())
            }
            Implementation::Factory(ctor) => {
                let ctor = ctor.clone();
                let keyed: KeyedCtor = Arc::new(move |ctx: &ResolverContext<'_>, _key: &ServiceKey| ctor(ctx));
                ServiceDescriptor::keyed_factory(self.service_type, new_key, lifetime, keyed)
            }
            Implementation::KeyedFactory(ctor) => {
                let ctor = ctor.clone();
                let keyed: KeyedCtor = Arc::new(move |ctx: &ResolverContext<'_>, key: &ServiceKey| {
                    ctor(ctx, &unwrap_original(key))
                });
                ServiceDescriptor::keyed_factory(self.service_type, new_key, lifetime, keyed)
            }
            Implementation::Typed(typed) => {
                let factory: TypedKeyedFactory = match &typed.factory {
                    TypedFactoryKind::Plain(factory) => {
                        let factory = factory.clone();
                        Arc::new(move |ctx: &ResolverContext<'_>, _key: &ServiceKey, requested: &ServiceType| {
                            factory(ctx, requested)
                        })
                    }
                    TypedFactoryKind::Keyed(factory) => {
                        let factory = factory.clone();
                        Arc::new(move |ctx: &ResolverContext<'_>, key: &ServiceKey, requested: &ServiceType| {
                            factory(ctx, &unwrap_original(key), requested)
                        })
                    }
                };
                let rekeyed = TypedServiceDescriptor::new_keyed(typed.service_type, new_key, factory, lifetime)?;
                ServiceDescriptor::typed(TypedServiceDescriptor {
                    argument_filter: typed.argument_filter,
                    ..rekeyed
                })
            }
        };
        Ok(descriptor)
    }
}

fn unwrap_original(key: &ServiceKey) -> ServiceKey {
    match key {
        ServiceKey::Original(original) => original.original_key().unwrap_or_else(|| key.clone()),
        other => other.clone(),
    }
}

impl TryFrom<ServiceDescriptor> for TypedServiceDescriptor {
    type Error = DiError;

    fn try_from(descriptor: ServiceDescriptor) -> Result<Self, Self::Error> {
        match descriptor.implementation {
            Implementation::Typed(typed) => Ok(typed),
            _ => Err(TypedServiceDescriptor::typed_only()),
        }
    }
}

#[derive(Clone)]
enum TypedFactoryKind {
    Plain(TypedFactory),
    Keyed(TypedKeyedFactory),
}

/// Registration record storing a type-parameterised factory.
///
/// The service type must be an open generic definition. At resolution time the
/// factory is handed the closed type that was asked for, so one descriptor
/// serves every member of the generic family.
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{
///     GenericDefinition, Lifetime, ResolverContext, ServiceType, TypedServiceDescriptor, DiError,
///     into_any,
/// };
/// use std::sync::Arc;
///
/// struct BoxDef;
/// impl GenericDefinition for BoxDef {
///     const INTERFACE: bool = false;
/// }
///
/// let typed = TypedServiceDescriptor::new(
///     ServiceType::open::<BoxDef>(),
///     Arc::new(|_ctx: &ResolverContext, requested: &ServiceType| Ok(into_any(requested.name()))),
///     Lifetime::Transient,
/// ).unwrap();
///
/// assert!(typed.typed_factory().is_some());
/// assert!(matches!(typed.typed_keyed_factory(), Err(DiError::NotKeyed(_))));
///
/// let rejected = TypedServiceDescriptor::new(
///     ServiceType::of::<String>(),
///     Arc::new(|_ctx: &ResolverContext, _requested: &ServiceType| Ok(into_any(()))),
///     Lifetime::Transient,
/// );
/// assert!(matches!(rejected, Err(DiError::InvalidDescriptor(_))));
/// ```
#[derive(Clone)]
pub struct TypedServiceDescriptor {
    service_type: ServiceType,
    service_key: Option<ServiceKey>,
    lifetime: Lifetime,
    factory: TypedFactoryKind,
    argument_filter: Option<ServiceType>,
}

impl TypedServiceDescriptor {
    /// Creates a non-keyed typed descriptor for an open generic definition.
    pub fn new(service_type: ServiceType, factory: TypedFactory, lifetime: Lifetime) -> DiResult<Self> {
        Self::check_open_generic(&service_type)?;
        Ok(Self {
            service_type,
            service_key: None,
            lifetime,
            factory: TypedFactoryKind::Plain(factory),
            argument_filter: None,
        })
    }

    /// Creates a keyed typed descriptor for an open generic definition.
    pub fn new_keyed(
        service_type: ServiceType,
        service_key: ServiceKey,
        factory: TypedKeyedFactory,
        lifetime: Lifetime,
    ) -> DiResult<Self> {
        Self::check_open_generic(&service_type)?;
        Ok(Self {
            service_type,
            service_key: Some(service_key),
            lifetime,
            factory: TypedFactoryKind::Keyed(factory),
            argument_filter: None,
        })
    }

    /// Non-keyed descriptor for a definition known at compile time.
    pub(crate) fn for_definition<D: GenericDefinition>(factory: TypedFactory, lifetime: Lifetime) -> Self {
        Self {
            service_type: ServiceType::open::<D>(),
            service_key: None,
            lifetime,
            factory: TypedFactoryKind::Plain(factory),
            argument_filter: None,
        }
    }

    pub(crate) fn for_keyed_definition<D: GenericDefinition>(
        service_key: ServiceKey,
        factory: TypedKeyedFactory,
        lifetime: Lifetime,
    ) -> Self {
        Self {
            service_type: ServiceType::open::<D>(),
            service_key: Some(service_key),
            lifetime,
            factory: TypedFactoryKind::Keyed(factory),
            argument_filter: None,
        }
    }

    /// Instances cannot back a typed descriptor.
    pub fn from_instance(_service_type: ServiceType, _instance: AnyArc) -> DiResult<Self> {
        Err(Self::typed_only())
    }

    /// Plain factories cannot back a typed descriptor.
    pub fn from_factory(_service_type: ServiceType, _ctor: Ctor, _lifetime: Lifetime) -> DiResult<Self> {
        Err(Self::typed_only())
    }

    fn typed_only() -> DiError {
        DiError::InvalidDescriptor(
            "TypedServiceDescriptor only use for typed factory".to_string(),
        )
    }

    fn check_open_generic(service_type: &ServiceType) -> DiResult<()> {
        if service_type.is_open_generic() {
            Ok(())
        } else {
            Err(DiError::InvalidDescriptor(format!(
                "Typed factory for {} is only used for generic type definition(open generic type)",
                service_type.name()
            )))
        }
    }

    /// Restricts the descriptor to closed types whose first type argument
    /// belongs to `definition`; other requests fall through to the next candidate.
    pub(crate) fn restrict_to_argument(mut self, definition: ServiceType) -> Self {
        self.argument_filter = Some(definition);
        self
    }

    /// Whether this descriptor can serve `requested`.
    pub(crate) fn accepts(&self, requested: &ServiceType) -> bool {
        match self.argument_filter {
            None => true,
            Some(filter) => requested
                .type_arguments()
                .first()
                .and_then(|argument| argument.definition())
                .map_or(false, |definition| definition == filter),
        }
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn service_key(&self) -> Option<&ServiceKey> {
        self.service_key.as_ref()
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn is_keyed(&self) -> bool {
        self.service_key.is_some()
    }

    /// The non-keyed typed factory; `None` when the descriptor is keyed.
    pub fn typed_factory(&self) -> Option<&TypedFactory> {
        match (&self.service_key, &self.factory) {
            (None, TypedFactoryKind::Plain(factory)) => Some(factory),
            _ => None,
        }
    }

    /// The keyed typed factory.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::NotKeyed`] when the descriptor is not keyed.
    pub fn typed_keyed_factory(&self) -> DiResult<&TypedKeyedFactory> {
        match (&self.service_key, &self.factory) {
            (Some(_), TypedFactoryKind::Keyed(factory)) => Ok(factory),
            _ => Err(DiError::NotKeyed(NOT_KEYED)),
        }
    }

    fn factory_ptr(&self) -> *const () {
        match &self.factory {
            TypedFactoryKind::Plain(factory) => Arc::as_ptr(factory) as *const (),
            TypedFactoryKind::Keyed(factory) => Arc::as_ptr(factory) as *const (),
        }
    }
}

impl fmt::Display for TypedServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lifetime = {}, ServiceType = \"{}\"", self.lifetime, self.service_type)?;
        if let Some(key) = &self.service_key {
            write!(f, ", ServiceKey = \"{}\"", key)?;
        }
        write!(f, ", TypedFactory = {:p}", self.factory_ptr())
    }
}

impl fmt::Debug for TypedServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
