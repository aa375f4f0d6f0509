//! Closing typed factories over a requested type.

use std::sync::Arc;

use crate::descriptors::{Ctor, ServiceDescriptor};
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;
use crate::registration::{CallSite, CallSiteKey};
use crate::service_type::ServiceType;

/// Builds the call site for `requested` out of a typed descriptor.
///
/// The descriptor's factory is curried over the requested closed type (and the
/// descriptor's key, when keyed), producing an ordinary constructor that the
/// provider caches under `(requested, key, lifetime)`.
///
/// Returns `None` when there is no descriptor, when the descriptor carries no
/// typed factory of the matching keyed-ness, or when the descriptor declines
/// the requested type.
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{
///     try_create_typed_factory_call_site, into_any, GenericDefinition, GenericService, Lifetime,
///     ServiceDescriptor, ServiceType, TypedServiceDescriptor, ResolverContext,
/// };
/// use std::sync::Arc;
///
/// struct SlotDef;
/// impl GenericDefinition for SlotDef {
///     const INTERFACE: bool = false;
/// }
/// struct Slot<T>(Option<T>);
/// impl<T: Send + Sync + 'static> GenericService for Slot<T> {
///     type Definition = SlotDef;
/// }
///
/// let typed = TypedServiceDescriptor::new(
///     ServiceType::open::<SlotDef>(),
///     Arc::new(|_ctx: &ResolverContext, requested: &ServiceType| Ok(into_any(requested.name()))),
///     Lifetime::Singleton,
/// ).unwrap();
/// let descriptor = ServiceDescriptor::typed(typed);
///
/// let requested = ServiceType::generic::<Slot<u8>>();
/// let site = try_create_typed_factory_call_site(Lifetime::Singleton, Some(&descriptor), &requested).unwrap();
/// assert_eq!(site.key().service, requested);
///
/// assert!(try_create_typed_factory_call_site(Lifetime::Singleton, None, &requested).is_none());
/// ```
pub fn try_create_typed_factory_call_site(
    lifetime: Lifetime,
    descriptor: Option<&ServiceDescriptor>,
    requested: &ServiceType,
) -> Option<CallSite> {
    let typed = descriptor?.as_typed()?;
    if !typed.accepts(requested) {
        return None;
    }

    let requested = *requested;
    let ctor: Ctor = match typed.service_key() {
        Some(service_key) => {
            let factory = typed.typed_keyed_factory().ok()?.clone();
            let service_key = service_key.clone();
            Arc::new(move |ctx: &ResolverContext<'_>| factory(ctx, &service_key, &requested))
        }
        None => {
            let factory = typed.typed_factory()?.clone();
            Arc::new(move |ctx: &ResolverContext<'_>| factory(ctx, &requested))
        }
    };

    let key = CallSiteKey {
        service: requested,
        key: typed.service_key().cloned(),
        lifetime,
    };
    Some(CallSite::new(key, ctor))
}
