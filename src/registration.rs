//! Call sites and the call-site table compiled from a service collection.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};

use crate::descriptors::{Ctor, Implementation, ServiceDescriptor};
use crate::error::DiResult;
use crate::key::{Key, ServiceKey};
use crate::lifetime::Lifetime;
use crate::observer::Observers;
use crate::provider::ResolverContext;
use crate::service_type::{AnyArc, ServiceType};
use crate::typed::try_create_typed_factory_call_site;

/// Cache identity of a call site.
///
/// For typed factories `service` is the *closed* requested type, never the open
/// definition the factory was registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSiteKey {
    /// Requested service type
    pub service: ServiceType,
    /// Service key the call site answers to
    pub key: Option<ServiceKey>,
    /// Lifetime of the registration
    pub lifetime: Lifetime,
}

/// Executable recipe for one service: constructor plus singleton slot.
pub struct CallSite {
    key: CallSiteKey,
    ctor: Ctor,
    /// Singleton cache - OnceCell for lock-free access after initialization
    singleton: Option<OnceCell<AnyArc>>,
}

impl CallSite {
    pub(crate) fn new(key: CallSiteKey, ctor: Ctor) -> Self {
        let singleton = match key.lifetime {
            Lifetime::Singleton => Some(OnceCell::new()),
            _ => None,
        };
        Self { key, ctor, singleton }
    }

    pub fn key(&self) -> &CallSiteKey {
        &self.key
    }

    pub fn lifetime(&self) -> Lifetime {
        self.key.lifetime
    }

    /// Runs the constructor without touching any cache.
    pub fn invoke(&self, ctx: &ResolverContext<'_>) -> DiResult<AnyArc> {
        (self.ctor)(ctx)
    }

    pub(crate) fn singleton_cell(&self) -> Option<&OnceCell<AnyArc>> {
        self.singleton.as_ref()
    }
}

fn exact_call_site(descriptor: &ServiceDescriptor) -> Option<CallSite> {
    let key = CallSiteKey {
        service: descriptor.service_type(),
        key: descriptor.service_key().cloned(),
        lifetime: descriptor.lifetime(),
    };
    let ctor: Ctor = match descriptor.implementation() {
        Implementation::Instance(instance) => {
            let instance = instance.clone();
            Arc::new(move |_: &ResolverContext<'_>| -> DiResult<AnyArc> { Ok(instance.clone()) })
        }
        Implementation::Factory(ctor) => ctor.clone(),
        Implementation::KeyedFactory(ctor) => {
            let ctor = ctor.clone();
            // Keyed descriptors always carry a key
            let service_key = descriptor.service_key()?.clone();
            Arc::new(move |ctx: &ResolverContext<'_>| ctor(ctx, &service_key))
        }
        Implementation::Typed(_) => return None,
    };
    Some(CallSite::new(key, ctor))
}

/// Call-site table held by a provider.
///
/// Exact registrations are compiled eagerly; the last descriptor for an identity
/// wins. Typed descriptors are grouped by `(open definition, key)` and turned
/// into closed call sites on first request.
pub(crate) struct CallSiteTable {
    exact: HashMap<Key, Arc<CallSite>>,
    typed: HashMap<Key, Vec<ServiceDescriptor>>,
    closed: RwLock<HashMap<CallSiteKey, Arc<CallSite>>>,
}

impl CallSiteTable {
    pub(crate) fn build(descriptors: &[ServiceDescriptor]) -> Self {
        let mut exact = HashMap::new();
        let mut typed: HashMap<Key, Vec<ServiceDescriptor>> = HashMap::new();

        for descriptor in descriptors {
            if descriptor.is_typed() {
                typed.entry(descriptor.key()).or_default().push(descriptor.clone());
            } else if let Some(site) = exact_call_site(descriptor) {
                exact.insert(descriptor.key(), Arc::new(site));
            }
        }

        Self {
            exact,
            typed,
            closed: RwLock::new(HashMap::new()),
        }
    }

    /// Exact lookup, then the typed-factory probe for closed generic requests.
    pub(crate) fn find(&self, key: &Key, observers: &Observers) -> Option<Arc<CallSite>> {
        if let Some(site) = self.exact.get(key) {
            return Some(site.clone());
        }

        let definition = key.service.definition()?;
        let candidates = self.typed.get(&Key::new(definition, key.service_key.clone()))?;

        for descriptor in candidates.iter().rev() {
            let cache_key = CallSiteKey {
                service: key.service,
                key: key.service_key.clone(),
                lifetime: descriptor.lifetime(),
            };
            if let Some(site) = self.closed.read().get(&cache_key) {
                return Some(site.clone());
            }
            if let Some(site) = try_create_typed_factory_call_site(descriptor.lifetime(), Some(descriptor), &key.service) {
                let mut closed = self.closed.write();
                // Another thread may have inserted it between the read and the write lock
                let site = closed
                    .entry(cache_key)
                    .or_insert_with(|| {
                        observers.call_site_created(site.key());
                        Arc::new(site)
                    })
                    .clone();
                return Some(site);
            }
        }
        None
    }

    pub(crate) fn exact_sites(&self) -> impl Iterator<Item = (&Key, &Arc<CallSite>)> {
        self.exact.iter()
    }

    #[cfg(feature = "diagnostics")]
    pub(crate) fn typed_registrations(&self) -> impl Iterator<Item = (&Key, usize)> {
        self.typed.iter().map(|(key, descriptors)| (key, descriptors.len()))
    }

    pub(crate) fn closed_len(&self) -> usize {
        self.closed.read().len()
    }
}

/// Per-scope cache of scoped instances.
///
/// The lock is held only while fetching the cell; construction runs outside it,
/// so factories can resolve further scoped services.
#[derive(Default)]
pub(crate) struct ScopedCache {
    cells: Mutex<HashMap<CallSiteKey, Arc<OnceCell<AnyArc>>>>,
}

impl ScopedCache {
    pub(crate) fn get_or_try_init<F>(&self, key: &CallSiteKey, init: F) -> DiResult<AnyArc>
    where
        F: FnOnce() -> DiResult<AnyArc>,
    {
        let cell = {
            let mut cells = self.cells.lock();
            cells
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        cell.get_or_try_init(init).map(|value| value.clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.lock().iter().filter(|(_, cell)| cell.get().is_some()).count()
    }
}
