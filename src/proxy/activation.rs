//! Building proxy instances at resolution time.

use crate::error::{DiError, DiResult};
use crate::key::{Key, ServiceKey};
use crate::provider::ResolverContext;
use crate::service_type::{AnyArc, ServiceType};
use crate::traits::{Resolver, ResolverCore};

use super::original_key::OriginalServiceKey;
use super::registration::Interceptors;
use super::registry::{FrozenProxyRegistry, StartupProxyRegistry};
use super::service::ProxyHooks;

fn hooks_of(service: &ServiceType) -> DiResult<ProxyHooks> {
    service
        .proxy_hooks()
        .ok_or(DiError::NotInterface(service.name()))
}

/// Resolves `service` under `key` and wraps it in a `ProxyService` carrier.
///
/// Interceptors are resolved under the same key.
pub(crate) fn explicit_proxy(
    ctx: &ResolverContext<'_>,
    service: &ServiceType,
    key: Option<&ServiceKey>,
    interceptors: &Interceptors,
) -> DiResult<AnyArc> {
    let hooks = hooks_of(service)?;
    let target = ctx.resolve(service, key)?;
    let chain = interceptors.resolve_chain(ctx, key, *service)?;
    let proxy = hooks.create_carrier(target, chain)?;
    ctx.notify_proxy_created(&Key::new(*service, key.cloned()));
    Ok(proxy)
}

/// Resolves the original registration of `service` and wraps it in a proxy
/// of the same type.
///
/// Both the target and the interceptors are resolved under `original`.
pub(crate) fn implicit_proxy(
    ctx: &ResolverContext<'_>,
    service: &ServiceType,
    original: &OriginalServiceKey,
    interceptors: &Interceptors,
) -> DiResult<AnyArc> {
    let hooks = hooks_of(service)?;
    let original = ServiceKey::Original(original.clone());
    let target = ctx.resolve(service, Some(&original))?;
    let chain = interceptors.resolve_chain(ctx, Some(&original), *service)?;
    let proxy = hooks.create(target, chain)?;
    ctx.notify_proxy_created(&Key::new(*service, Some(original)));
    Ok(proxy)
}

/// Checks that the definition of `requested` was registered for proxying under `key`.
///
/// # Errors
///
/// - [`DiError::RegistryNotSolidified`] when no frozen registry exists for `key`, or when the
///   definition is only in a startup registry appended after the last solidify.
/// - [`DiError::NotFound`] when the definition is not in the registry.
pub(crate) fn ensure_proxy_registered(
    ctx: &ResolverContext<'_>,
    key: Option<&ServiceKey>,
    requested: &ServiceType,
) -> DiResult<()> {
    let lookup = match key {
        Some(key) => ctx.get_keyed::<FrozenProxyRegistry>(key.clone()),
        None => ctx.get::<FrozenProxyRegistry>(),
    };
    let registry = lookup.map_err(|error| match error {
        DiError::NotFound(_) | DiError::KeyedNotFound { .. } => not_solidified(requested),
        other => other,
    })?;

    let definition = requested.definition().ok_or(DiError::NotFound(requested.name()))?;
    if registry.contains(&definition) {
        return Ok(());
    }
    // Appended after the last solidify
    if pending_in_startup_registry(ctx, key, &definition) {
        return Err(not_solidified(requested));
    }
    Err(DiError::NotFound(requested.name()))
}

fn pending_in_startup_registry(ctx: &ResolverContext<'_>, key: Option<&ServiceKey>, definition: &ServiceType) -> bool {
    let startup = match key {
        Some(key) => ctx.get_keyed::<StartupProxyRegistry>(key.clone()),
        None => ctx.get::<StartupProxyRegistry>(),
    };
    startup.map_or(false, |registry| registry.iter().any(|t| t == definition))
}

fn not_solidified(requested: &ServiceType) -> DiError {
    DiError::RegistryNotSolidified(format!(
        "Open generic proxy registry for {} was not solidified. Call \
         ServiceCollection::solidify_open_generic_proxy_registry() before building the provider \
         (or build through ProxyServiceProviderFactory).",
        requested.name()
    ))
}

/// Closed proxied type behind a `ProxyService<_>` request.
pub(crate) fn carried_type(requested: &ServiceType) -> DiResult<ServiceType> {
    requested
        .type_arguments()
        .first()
        .copied()
        .ok_or(DiError::NotFound(requested.name()))
}
