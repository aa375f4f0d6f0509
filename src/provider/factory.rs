//! Build wrappers turning a `ServiceCollection` into a `ServiceProvider`.

use crate::collection::ServiceCollection;
use crate::error::DiResult;
use crate::options::ServiceProviderOptions;

use super::ServiceProvider;

/// Two-step provider construction: prepare the collection, then build.
///
/// Hosts that own the collection call `create_builder` when configuration
/// starts and `create_service_provider` once every registration is in.
pub trait ServiceProviderFactory {
    /// Starts from an existing collection.
    fn create_builder(&self, services: ServiceCollection) -> ServiceCollection {
        services
    }

    /// Builds the provider from the finished collection.
    fn create_service_provider(&self, services: ServiceCollection) -> DiResult<ServiceProvider>;
}

/// Builds the provider as is, with the configured options.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultServiceProviderFactory {
    options: ServiceProviderOptions,
}

impl DefaultServiceProviderFactory {
    pub fn new(options: ServiceProviderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ServiceProviderOptions {
        self.options
    }
}

impl ServiceProviderFactory for DefaultServiceProviderFactory {
    fn create_service_provider(&self, services: ServiceCollection) -> DiResult<ServiceProvider> {
        services.build_with_options(self.options)
    }
}

/// Solidifies the open-generic proxy registries, then builds.
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{ServiceCollection, ProxyServiceProviderFactory, ServiceProviderFactory, Resolver};
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(5u8);
///
/// let factory = ProxyServiceProviderFactory::default();
/// let provider = factory.create_service_provider(factory.create_builder(services)).unwrap();
/// assert_eq!(*provider.get_required::<u8>(), 5);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyServiceProviderFactory {
    inner: DefaultServiceProviderFactory,
}

impl ProxyServiceProviderFactory {
    pub fn new(options: ServiceProviderOptions) -> Self {
        Self {
            inner: DefaultServiceProviderFactory::new(options),
        }
    }
}

impl ServiceProviderFactory for ProxyServiceProviderFactory {
    fn create_service_provider(&self, mut services: ServiceCollection) -> DiResult<ServiceProvider> {
        services.solidify_open_generic_proxy_registry();
        self.inner.create_service_provider(services)
    }
}
