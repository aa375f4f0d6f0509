//! Proxy registrations on a `ServiceCollection`.

use std::sync::Arc;

use crate::collection::ServiceCollection;
use crate::descriptors::{ServiceDescriptor, TypedServiceDescriptor};
use crate::error::{DiError, DiResult};
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;
use crate::service_type::{into_any, ServiceType};
use crate::traits::Resolver;

use super::activation::{carried_type, ensure_proxy_registered, explicit_proxy, implicit_proxy};
use super::interceptor::{AsyncInterceptor, Interceptor, InterceptorChain, InterceptorKind};
use super::original_key::OriginalServiceKey;
use super::service::ProxyServiceDefinition;

type ResolveInterceptor = fn(&ResolverContext<'_>, Option<&ServiceKey>) -> DiResult<InterceptorKind>;
type RegisterInterceptor = fn(&mut ServiceCollection, Option<&ServiceKey>, Lifetime);

#[derive(Clone, Copy)]
struct InterceptorEntry {
    service: ServiceType,
    resolve: ResolveInterceptor,
    register: Option<RegisterInterceptor>,
}

/// Ordered list of interceptor types for one proxy registration.
///
/// Interceptors are resolved from the container each time a proxy instance is
/// built, under the proxy's key. `with`/`with_async` also register a
/// `Default` instance with the proxy's lifetime unless one is already
/// registered; `resolved`/`resolved_async` expect the caller to register it.
///
/// Whether an interceptor is async-aware is decided by which method adds it,
/// so adding a type that is not an interceptor does not compile.
#[derive(Clone, Default)]
pub struct Interceptors {
    entries: Vec<InterceptorEntry>,
}

impl Interceptors {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Adds a synchronous interceptor, registering `T::default()` if absent.
    pub fn with<T: Interceptor + Default>(mut self) -> Self {
        self.entries.push(InterceptorEntry {
            service: ServiceType::of::<T>(),
            resolve: resolve_synchronous::<T>,
            register: Some(register_default::<T>),
        });
        self
    }

    /// Adds an async-aware interceptor, registering `T::default()` if absent.
    pub fn with_async<T: AsyncInterceptor + Default>(mut self) -> Self {
        self.entries.push(InterceptorEntry {
            service: ServiceType::of::<T>(),
            resolve: resolve_async_aware::<T>,
            register: Some(register_default::<T>),
        });
        self
    }

    /// Adds a synchronous interceptor registered by the caller.
    pub fn resolved<T: Interceptor>(mut self) -> Self {
        self.entries.push(InterceptorEntry {
            service: ServiceType::of::<T>(),
            resolve: resolve_synchronous::<T>,
            register: None,
        });
        self
    }

    /// Adds an async-aware interceptor registered by the caller.
    pub fn resolved_async<T: AsyncInterceptor>(mut self) -> Self {
        self.entries.push(InterceptorEntry {
            service: ServiceType::of::<T>(),
            resolve: resolve_async_aware::<T>,
            register: None,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Interceptor types in chain order.
    pub fn service_types(&self) -> impl Iterator<Item = ServiceType> + '_ {
        self.entries.iter().map(|entry| entry.service)
    }

    /// Resolves and normalises every interceptor under `key`.
    pub(crate) fn resolve_chain(
        &self,
        ctx: &ResolverContext<'_>,
        key: Option<&ServiceKey>,
        service: ServiceType,
    ) -> DiResult<InterceptorChain> {
        let interceptors = self
            .entries
            .iter()
            .map(|entry| (entry.resolve)(ctx, key).map(InterceptorKind::normalize))
            .collect::<DiResult<Vec<_>>>()?;
        Ok(InterceptorChain::new(service, interceptors))
    }

    /// Registers the default-constructed interceptors that are not registered yet.
    pub(crate) fn try_register(&self, services: &mut ServiceCollection, key: Option<&ServiceKey>, lifetime: Lifetime) {
        for register in self.entries.iter().filter_map(|entry| entry.register) {
            register(services, key, lifetime);
        }
    }
}

fn resolve_instance<T: Send + Sync + 'static>(ctx: &ResolverContext<'_>, key: Option<&ServiceKey>) -> DiResult<Arc<T>> {
    match key {
        Some(key) => ctx.get_keyed::<T>(key.clone()),
        None => ctx.get::<T>(),
    }
}

fn resolve_synchronous<T: Interceptor>(ctx: &ResolverContext<'_>, key: Option<&ServiceKey>) -> DiResult<InterceptorKind> {
    let interceptor: Arc<dyn Interceptor> = resolve_instance::<T>(ctx, key)?;
    Ok(InterceptorKind::Synchronous(interceptor))
}

fn resolve_async_aware<T: AsyncInterceptor>(ctx: &ResolverContext<'_>, key: Option<&ServiceKey>) -> DiResult<InterceptorKind> {
    let interceptor: Arc<dyn AsyncInterceptor> = resolve_instance::<T>(ctx, key)?;
    Ok(InterceptorKind::AsyncAware(interceptor))
}

fn register_default<T: Default + Send + Sync + 'static>(
    services: &mut ServiceCollection,
    key: Option<&ServiceKey>,
    lifetime: Lifetime,
) {
    let descriptor = match key {
        Some(key) => ServiceDescriptor::keyed_factory(
            ServiceType::of::<T>(),
            key.clone(),
            lifetime,
            Arc::new(|_ctx: &ResolverContext<'_>, _key: &ServiceKey| Ok(into_any(T::default()))),
        ),
        None => ServiceDescriptor::factory(
            ServiceType::of::<T>(),
            lifetime,
            Arc::new(|_ctx: &ResolverContext<'_>| Ok(into_any(T::default()))),
        ),
    };
    services.try_add(descriptor);
}

/// Whether the proxy sits next to the original or replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMode {
    /// Proxy reachable as `ProxyService<T>`; `T` stays untouched
    Explicit,
    /// Proxy replaces `T`; the original moves under an [`OriginalServiceKey`]
    Implicit,
}

/// Everything `ServiceCollection::add_proxy` needs to know.
///
/// `service` is a proxyable interface token (`ServiceType::interface`), a
/// closed generic token with proxy hooks, or an open generic definition whose
/// closed types carry proxy hooks.
#[derive(Clone)]
pub struct ProxyRegistration {
    service: ServiceType,
    key: Option<ServiceKey>,
    lifetime: Lifetime,
    mode: ProxyMode,
    interceptors: Interceptors,
}

impl ProxyRegistration {
    pub fn explicit(service: ServiceType, lifetime: Lifetime) -> Self {
        Self::new(service, lifetime, ProxyMode::Explicit)
    }

    pub fn implicit(service: ServiceType, lifetime: Lifetime) -> Self {
        Self::new(service, lifetime, ProxyMode::Implicit)
    }

    fn new(service: ServiceType, lifetime: Lifetime, mode: ProxyMode) -> Self {
        Self {
            service,
            key: None,
            lifetime,
            mode,
            interceptors: Interceptors::new(),
        }
    }

    pub fn keyed(mut self, key: impl Into<ServiceKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_interceptors(mut self, interceptors: Interceptors) -> Self {
        self.interceptors = interceptors;
        self
    }

    pub fn service(&self) -> ServiceType {
        self.service
    }

    pub fn key(&self) -> Option<&ServiceKey> {
        self.key.as_ref()
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn mode(&self) -> ProxyMode {
        self.mode
    }

    pub fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }

    fn validate(&self) -> DiResult<()> {
        let proxyable = if self.service.is_open_generic() {
            self.service.is_interface()
        } else {
            self.service.is_interface() && self.service.proxy_hooks().is_some()
        };
        if proxyable {
            Ok(())
        } else {
            Err(DiError::NotInterface(self.service.name()))
        }
    }

    fn original_key(&self) -> OriginalServiceKey {
        match &self.key {
            None => OriginalServiceKey::string_default(),
            Some(key) => OriginalServiceKey::create_original_service_key(Some(key.clone())),
        }
    }

    fn original_not_found(&self) -> DiError {
        let message = match &self.key {
            None => format!(
                "Not found registered \"{}\" service of type {}.",
                self.lifetime,
                self.service.name()
            ),
            Some(key) => format!(
                "Not found registered keyed(key value: {}) \"{}\" service of type {}.",
                key,
                self.lifetime,
                self.service.name()
            ),
        };
        DiError::OriginalNotFound(message)
    }
}

impl ServiceCollection {
    /// Registers a proxy.
    ///
    /// # Errors
    ///
    /// - [`DiError::NotInterface`] when the service type cannot be proxied.
    /// - [`DiError::OriginalNotFound`] when an implicit proxy finds no
    ///   registration with the same type, key and lifetime.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_typed_di::{
    ///     Interceptor, InterceptorChain, Interceptors, InterfaceProxy, Invocation, Lifetime,
    ///     OriginalServiceKey, ProxyRegistration, Resolver, ServiceCollection, ServiceType,
    /// };
    /// use std::sync::Arc;
    ///
    /// pub trait Greeter: Send + Sync {
    ///     fn greet(&self, name: &str) -> String;
    /// }
    ///
    /// struct Plain;
    /// impl Greeter for Plain {
    ///     fn greet(&self, name: &str) -> String {
    ///         format!("hello {}", name)
    ///     }
    /// }
    ///
    /// struct GreeterProxy { target: Arc<dyn Greeter>, chain: InterceptorChain }
    /// impl Greeter for GreeterProxy {
    ///     fn greet(&self, name: &str) -> String {
    ///         self.chain.invoke("greet", || self.target.greet(name))
    ///     }
    /// }
    /// impl InterfaceProxy for dyn Greeter {
    ///     fn create_proxy(target: Arc<Self>, chain: InterceptorChain) -> Arc<Self> {
    ///         Arc::new(GreeterProxy { target, chain })
    ///     }
    /// }
    ///
    /// #[derive(Default)]
    /// struct Shout;
    /// impl Interceptor for Shout {
    ///     fn intercept(&self, invocation: &mut Invocation<'_>) {
    ///         invocation.proceed();
    ///         if let Some(text) = invocation.return_value_mut::<String>() {
    ///             *text = text.to_uppercase();
    ///         }
    ///     }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton_trait(Arc::new(Plain) as Arc<dyn Greeter>);
    /// services
    ///     .add_proxy(
    ///         ProxyRegistration::implicit(ServiceType::interface::<dyn Greeter>(), Lifetime::Singleton)
    ///             .with_interceptors(Interceptors::new().with::<Shout>()),
    ///     )
    ///     .unwrap();
    ///
    /// let provider = services.build();
    /// assert_eq!(provider.get_required_trait::<dyn Greeter>().greet("ann"), "HELLO ANN");
    ///
    /// let original = provider.get_keyed_trait_required::<dyn Greeter>(OriginalServiceKey::string_default());
    /// assert_eq!(original.greet("ann"), "hello ann");
    /// ```
    pub fn add_proxy(&mut self, registration: ProxyRegistration) -> DiResult<&mut Self> {
        registration.validate()?;
        match (registration.mode, registration.service.is_open_generic()) {
            (ProxyMode::Explicit, false) => self.add_explicit_proxy(&registration),
            (ProxyMode::Explicit, true) => self.add_explicit_generic_proxy(&registration)?,
            (ProxyMode::Implicit, false) => self.add_implicit_proxy(&registration)?,
            (ProxyMode::Implicit, true) => self.add_implicit_generic_proxy(&registration)?,
        }
        Ok(self)
    }

    fn add_explicit_proxy(&mut self, registration: &ProxyRegistration) {
        let service = registration.service;
        let lifetime = registration.lifetime;
        // validate() guarantees hooks for non-generic services
        let carrier = match service.proxy_hooks() {
            Some(hooks) => hooks.carrier(),
            None => return,
        };
        let interceptors = registration.interceptors.clone();
        let descriptor = match &registration.key {
            None => ServiceDescriptor::factory(
                carrier,
                lifetime,
                Arc::new(move |ctx: &ResolverContext<'_>| explicit_proxy(ctx, &service, None, &interceptors)),
            ),
            Some(key) => ServiceDescriptor::keyed_factory(
                carrier,
                key.clone(),
                lifetime,
                Arc::new(move |ctx: &ResolverContext<'_>, key: &ServiceKey| {
                    explicit_proxy(ctx, &service, Some(key), &interceptors)
                }),
            ),
        };
        self.add(descriptor);
        registration.interceptors.try_register(self, registration.key.as_ref(), lifetime);
    }

    fn add_explicit_generic_proxy(&mut self, registration: &ProxyRegistration) -> DiResult<()> {
        let definition = registration.service;
        let lifetime = registration.lifetime;
        let interceptors = registration.interceptors.clone();
        let typed = match &registration.key {
            None => TypedServiceDescriptor::for_definition::<ProxyServiceDefinition>(
                Arc::new(move |ctx: &ResolverContext<'_>, requested: &ServiceType| {
                    let closed = carried_type(requested)?;
                    ensure_proxy_registered(ctx, None, &closed)?;
                    explicit_proxy(ctx, &closed, None, &interceptors)
                }),
                lifetime,
            ),
            Some(key) => TypedServiceDescriptor::for_keyed_definition::<ProxyServiceDefinition>(
                key.clone(),
                Arc::new(move |ctx: &ResolverContext<'_>, key: &ServiceKey, requested: &ServiceType| {
                    let closed = carried_type(requested)?;
                    ensure_proxy_registered(ctx, Some(key), &closed)?;
                    explicit_proxy(ctx, &closed, Some(key), &interceptors)
                }),
                lifetime,
            ),
        };
        self.add(ServiceDescriptor::typed(typed.restrict_to_argument(definition)));
        self.append_to_proxy_registry(registration.key.as_ref(), definition)?;
        registration.interceptors.try_register(self, registration.key.as_ref(), lifetime);
        Ok(())
    }

    /// Moves the last matching registration under `original_key`, keeping its position.
    fn rekey_original(&mut self, registration: &ProxyRegistration, original_key: &OriginalServiceKey) -> DiResult<()> {
        let index = self
            .iter()
            .rposition(|d| d.matches(&registration.service, registration.key.as_ref(), registration.lifetime))
            .ok_or_else(|| registration.original_not_found())?;
        let rekeyed = match self.get(index) {
            Some(original) => original.rekey_as_original(original_key.clone())?,
            None => return Err(registration.original_not_found()),
        };
        self.insert(index, rekeyed);
        self.remove(index + 1);
        Ok(())
    }

    fn add_implicit_proxy(&mut self, registration: &ProxyRegistration) -> DiResult<()> {
        let service = registration.service;
        let lifetime = registration.lifetime;
        let original_key = registration.original_key();
        self.rekey_original(registration, &original_key)?;

        let interceptors = registration.interceptors.clone();
        let original = original_key.clone();
        let descriptor = match &registration.key {
            None => ServiceDescriptor::factory(
                service,
                lifetime,
                Arc::new(move |ctx: &ResolverContext<'_>| implicit_proxy(ctx, &service, &original, &interceptors)),
            ),
            Some(key) => ServiceDescriptor::keyed_factory(
                service,
                key.clone(),
                lifetime,
                Arc::new(move |ctx: &ResolverContext<'_>, _key: &ServiceKey| {
                    implicit_proxy(ctx, &service, &original, &interceptors)
                }),
            ),
        };
        self.add(descriptor);
        registration
            .interceptors
            .try_register(self, Some(&ServiceKey::Original(original_key)), lifetime);
        Ok(())
    }

    fn add_implicit_generic_proxy(&mut self, registration: &ProxyRegistration) -> DiResult<()> {
        let definition = registration.service;
        let lifetime = registration.lifetime;
        let original_key = registration.original_key();
        self.rekey_original(registration, &original_key)?;

        let interceptors = registration.interceptors.clone();
        let original = original_key.clone();
        let typed = match &registration.key {
            None => TypedServiceDescriptor::new(
                definition,
                Arc::new(move |ctx: &ResolverContext<'_>, requested: &ServiceType| {
                    ensure_proxy_registered(ctx, None, requested)?;
                    implicit_proxy(ctx, requested, &original, &interceptors)
                }),
                lifetime,
            )?,
            Some(key) => TypedServiceDescriptor::new_keyed(
                definition,
                key.clone(),
                Arc::new(move |ctx: &ResolverContext<'_>, key: &ServiceKey, requested: &ServiceType| {
                    ensure_proxy_registered(ctx, Some(key), requested)?;
                    implicit_proxy(ctx, requested, &original, &interceptors)
                }),
                lifetime,
            )?,
        };
        self.add(ServiceDescriptor::typed(typed));
        self.append_to_proxy_registry(registration.key.as_ref(), definition)?;
        registration
            .interceptors
            .try_register(self, Some(&ServiceKey::Original(original_key)), lifetime);
        Ok(())
    }

    // ----- Explicit proxy sugar -----

    /// Adds a singleton explicit proxy, reachable as `ProxyService<T>`.
    ///
    /// `service` may be an interface token, a closed generic token or an open
    /// generic definition.
    pub fn add_singleton_explicit_proxy(&mut self, service: ServiceType, interceptors: Interceptors) -> DiResult<&mut Self> {
        self.add_proxy(ProxyRegistration::explicit(service, Lifetime::Singleton).with_interceptors(interceptors))
    }

    pub fn add_scoped_explicit_proxy(&mut self, service: ServiceType, interceptors: Interceptors) -> DiResult<&mut Self> {
        self.add_proxy(ProxyRegistration::explicit(service, Lifetime::Scoped).with_interceptors(interceptors))
    }

    pub fn add_transient_explicit_proxy(&mut self, service: ServiceType, interceptors: Interceptors) -> DiResult<&mut Self> {
        self.add_proxy(ProxyRegistration::explicit(service, Lifetime::Transient).with_interceptors(interceptors))
    }

    pub fn add_keyed_singleton_explicit_proxy(
        &mut self,
        service: ServiceType,
        key: impl Into<ServiceKey>,
        interceptors: Interceptors,
    ) -> DiResult<&mut Self> {
        self.add_proxy(
            ProxyRegistration::explicit(service, Lifetime::Singleton)
                .keyed(key)
                .with_interceptors(interceptors),
        )
    }

    pub fn add_keyed_scoped_explicit_proxy(
        &mut self,
        service: ServiceType,
        key: impl Into<ServiceKey>,
        interceptors: Interceptors,
    ) -> DiResult<&mut Self> {
        self.add_proxy(
            ProxyRegistration::explicit(service, Lifetime::Scoped)
                .keyed(key)
                .with_interceptors(interceptors),
        )
    }

    pub fn add_keyed_transient_explicit_proxy(
        &mut self,
        service: ServiceType,
        key: impl Into<ServiceKey>,
        interceptors: Interceptors,
    ) -> DiResult<&mut Self> {
        self.add_proxy(
            ProxyRegistration::explicit(service, Lifetime::Transient)
                .keyed(key)
                .with_interceptors(interceptors),
        )
    }

    // ----- Implicit proxy sugar -----

    /// Replaces the singleton registration of `service` with a proxy.
    ///
    /// The original stays reachable under its [`OriginalServiceKey`].
    pub fn add_singleton_implicit_proxy(&mut self, service: ServiceType, interceptors: Interceptors) -> DiResult<&mut Self> {
        self.add_proxy(ProxyRegistration::implicit(service, Lifetime::Singleton).with_interceptors(interceptors))
    }

    pub fn add_scoped_implicit_proxy(&mut self, service: ServiceType, interceptors: Interceptors) -> DiResult<&mut Self> {
        self.add_proxy(ProxyRegistration::implicit(service, Lifetime::Scoped).with_interceptors(interceptors))
    }

    pub fn add_transient_implicit_proxy(&mut self, service: ServiceType, interceptors: Interceptors) -> DiResult<&mut Self> {
        self.add_proxy(ProxyRegistration::implicit(service, Lifetime::Transient).with_interceptors(interceptors))
    }

    pub fn add_keyed_singleton_implicit_proxy(
        &mut self,
        service: ServiceType,
        key: impl Into<ServiceKey>,
        interceptors: Interceptors,
    ) -> DiResult<&mut Self> {
        self.add_proxy(
            ProxyRegistration::implicit(service, Lifetime::Singleton)
                .keyed(key)
                .with_interceptors(interceptors),
        )
    }

    pub fn add_keyed_scoped_implicit_proxy(
        &mut self,
        service: ServiceType,
        key: impl Into<ServiceKey>,
        interceptors: Interceptors,
    ) -> DiResult<&mut Self> {
        self.add_proxy(
            ProxyRegistration::implicit(service, Lifetime::Scoped)
                .keyed(key)
                .with_interceptors(interceptors),
        )
    }

    pub fn add_keyed_transient_implicit_proxy(
        &mut self,
        service: ServiceType,
        key: impl Into<ServiceKey>,
        interceptors: Interceptors,
    ) -> DiResult<&mut Self> {
        self.add_proxy(
            ProxyRegistration::implicit(service, Lifetime::Transient)
                .keyed(key)
                .with_interceptors(interceptors),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::Invocation;

    #[derive(Default)]
    struct Passthrough;
    impl Interceptor for Passthrough {
        fn intercept(&self, invocation: &mut Invocation<'_>) {
            invocation.proceed();
        }
    }

    trait Plain: Send + Sync {}

    #[test]
    fn non_interface_is_rejected() {
        let mut services = ServiceCollection::new();
        let err = services
            .add_singleton_explicit_proxy(ServiceType::of::<u32>(), Interceptors::new())
            .err()
            .unwrap();
        assert_eq!(err, DiError::NotInterface("u32"));

        // A trait object without proxy hooks cannot be proxied either
        let err = services
            .add_singleton_explicit_proxy(ServiceType::of_trait::<dyn Plain>(), Interceptors::new())
            .err()
            .unwrap();
        assert!(matches!(err, DiError::NotInterface(_)));
        assert!(services.is_empty());
    }

    #[test]
    fn default_interceptors_register_once() {
        let mut services = ServiceCollection::new();
        let interceptors = Interceptors::new().with::<Passthrough>();
        interceptors.try_register(&mut services, None, Lifetime::Transient);
        interceptors.try_register(&mut services, None, Lifetime::Transient);
        assert_eq!(services.len(), 1);

        let key = ServiceKey::from("k");
        interceptors.try_register(&mut services, Some(&key), Lifetime::Transient);
        assert_eq!(services.len(), 2);
    }

    #[test]
    fn resolved_interceptors_are_not_registered() {
        let mut services = ServiceCollection::new();
        Interceptors::new()
            .resolved::<Passthrough>()
            .try_register(&mut services, None, Lifetime::Singleton);
        assert!(services.is_empty());
    }

    #[test]
    fn original_not_found_messages() {
        let unkeyed = ProxyRegistration::implicit(ServiceType::of::<u8>(), Lifetime::Scoped);
        assert_eq!(
            unkeyed.original_not_found(),
            DiError::OriginalNotFound("Not found registered \"Scoped\" service of type u8.".to_string())
        );
        let keyed = unkeyed.keyed(3i64);
        assert_eq!(
            keyed.original_not_found(),
            DiError::OriginalNotFound(
                "Not found registered keyed(key value: 3) \"Scoped\" service of type u8.".to_string()
            )
        );
    }
}
