//! Registry of open generic definitions that have a proxy registered.
//!
//! Registration appends to a [`StartupProxyRegistry`] kept as a singleton
//! instance in the collection. Before build,
//! [`ServiceCollection::solidify_open_generic_proxy_registry`] swaps every
//! startup registry for an immutable [`FrozenProxyRegistry`], which is what
//! proxy activation consults.

use std::collections::HashSet;

use crate::collection::ServiceCollection;
use crate::descriptors::{Implementation, ServiceDescriptor};
use crate::error::{DiError, DiResult};
use crate::key::ServiceKey;
use crate::service_type::{into_any, ServiceType};

/// Collecting-phase registry: ordered, deduplicated, mutable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupProxyRegistry {
    types: Vec<ServiceType>,
}

impl StartupProxyRegistry {
    pub fn new() -> Self {
        Self { types: Vec::new() }
    }

    /// Appends an open generic definition; returns `false` if it was already present.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::InvalidDescriptor`] for anything but an open generic definition.
    pub fn append(&mut self, service_type: ServiceType) -> DiResult<bool> {
        if !service_type.is_open_generic() {
            return Err(DiError::InvalidDescriptor(format!(
                "Proxy registry only holds generic type definitions(open generic type), got {}",
                service_type.name()
            )));
        }
        if self.types.contains(&service_type) {
            return Ok(false);
        }
        self.types.push(service_type);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ServiceType> {
        self.types.iter()
    }

    pub fn freeze(&self) -> FrozenProxyRegistry {
        FrozenProxyRegistry::from(self)
    }
}

/// Query-phase registry: an immutable set of open generic definitions.
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{FrozenProxyRegistry, GenericDefinition, ServiceType, StartupProxyRegistry};
///
/// struct ADef;
/// impl GenericDefinition for ADef { const INTERFACE: bool = true; }
/// struct BDef;
/// impl GenericDefinition for BDef { const INTERFACE: bool = true; }
///
/// let mut startup = StartupProxyRegistry::new();
/// startup.append(ServiceType::open::<ADef>()).unwrap();
/// let frozen = startup.freeze();
///
/// let a = ServiceType::open::<ADef>();
/// let b = ServiceType::open::<BDef>();
/// assert!(frozen.contains(&a));
/// assert!(frozen.is_proper_subset_of([a, b]));
/// assert!(frozen.set_equals([a]));
/// assert!(!frozen.overlaps([b]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrozenProxyRegistry {
    types: HashSet<ServiceType>,
}

impl FrozenProxyRegistry {
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn contains(&self, service_type: &ServiceType) -> bool {
        self.types.contains(service_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceType> {
        self.types.iter()
    }

    pub fn is_subset_of<I: IntoIterator<Item = ServiceType>>(&self, other: I) -> bool {
        let other = collect(other);
        self.types.is_subset(&other)
    }

    pub fn is_superset_of<I: IntoIterator<Item = ServiceType>>(&self, other: I) -> bool {
        let other = collect(other);
        self.types.is_superset(&other)
    }

    pub fn is_proper_subset_of<I: IntoIterator<Item = ServiceType>>(&self, other: I) -> bool {
        let other = collect(other);
        self.types.len() < other.len() && self.types.is_subset(&other)
    }

    pub fn is_proper_superset_of<I: IntoIterator<Item = ServiceType>>(&self, other: I) -> bool {
        let other = collect(other);
        self.types.len() > other.len() && self.types.is_superset(&other)
    }

    pub fn overlaps<I: IntoIterator<Item = ServiceType>>(&self, other: I) -> bool {
        other.into_iter().any(|service_type| self.types.contains(&service_type))
    }

    pub fn set_equals<I: IntoIterator<Item = ServiceType>>(&self, other: I) -> bool {
        self.types == collect(other)
    }

    pub(crate) fn union(&self, other: &FrozenProxyRegistry) -> FrozenProxyRegistry {
        FrozenProxyRegistry {
            types: self.types.union(&other.types).copied().collect(),
        }
    }
}

fn collect<I: IntoIterator<Item = ServiceType>>(types: I) -> HashSet<ServiceType> {
    types.into_iter().collect()
}

impl From<&StartupProxyRegistry> for FrozenProxyRegistry {
    fn from(startup: &StartupProxyRegistry) -> Self {
        startup.iter().copied().collect()
    }
}

impl FromIterator<ServiceType> for FrozenProxyRegistry {
    fn from_iter<I: IntoIterator<Item = ServiceType>>(iter: I) -> Self {
        Self { types: collect(iter) }
    }
}

fn registry_instance<T: Clone + Send + Sync + 'static>(descriptor: &ServiceDescriptor) -> Option<T> {
    match descriptor.implementation() {
        Implementation::Instance(instance) => instance.downcast_ref::<T>().cloned(),
        _ => None,
    }
}

fn is_registry_of<T: 'static>(descriptor: &ServiceDescriptor, key: Option<&ServiceKey>) -> bool {
    descriptor.service_type() == ServiceType::of::<T>() && descriptor.service_key() == key
}

impl ServiceCollection {
    /// Appends `definition` to the startup proxy registry for `key`, creating it on first use.
    pub(crate) fn append_to_proxy_registry(
        &mut self,
        key: Option<&ServiceKey>,
        definition: ServiceType,
    ) -> DiResult<()> {
        let position = self.position(|d| is_registry_of::<StartupProxyRegistry>(d, key));
        let mut registry = position
            .and_then(|index| self.iter().nth(index).and_then(registry_instance::<StartupProxyRegistry>))
            .unwrap_or_default();
        registry.append(definition)?;

        let descriptor = ServiceDescriptor::instance(
            ServiceType::of::<StartupProxyRegistry>(),
            key.cloned(),
            into_any(registry),
        );
        match position {
            Some(index) => {
                self.remove(index);
                self.insert(index, descriptor);
            }
            None => {
                self.add(descriptor);
            }
        }
        Ok(())
    }

    /// Freezes every startup proxy registry.
    ///
    /// Each startup registration is removed and replaced by a frozen one with
    /// the same key. An existing frozen registration for that key is replaced
    /// by the union of both, so calling this again neither duplicates nor
    /// drops definitions.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_typed_di::{FrozenProxyRegistry, ServiceCollection, ServiceType, StartupProxyRegistry};
    ///
    /// let mut services = ServiceCollection::new();
    /// services.solidify_open_generic_proxy_registry();
    /// services.solidify_open_generic_proxy_registry();
    /// assert!(services.iter().all(|d| d.service_type() != ServiceType::of::<StartupProxyRegistry>()));
    /// ```
    pub fn solidify_open_generic_proxy_registry(&mut self) -> &mut Self {
        while let Some(index) = self.position(|d| d.service_type() == ServiceType::of::<StartupProxyRegistry>()) {
            let startup = self.remove(index);
            let key = startup.service_key().cloned();
            let mut frozen = registry_instance::<StartupProxyRegistry>(&startup)
                .map(|registry| registry.freeze())
                .unwrap_or_default();

            if let Some(existing) = self.position(|d| is_registry_of::<FrozenProxyRegistry>(d, key.as_ref())) {
                let existing = self.remove(existing);
                if let Some(previous) = registry_instance::<FrozenProxyRegistry>(&existing) {
                    frozen = previous.union(&frozen);
                }
            }

            self.add(ServiceDescriptor::instance(
                ServiceType::of::<FrozenProxyRegistry>(),
                key,
                into_any(frozen),
            ));
        }
        self
    }
}
