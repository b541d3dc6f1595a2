//! Providers whose delegate can be swapped at runtime
//!
//! The delegate lives in a concurrently-readable single slot: readers
//! always observe one complete provider value, and a swap affects only
//! queries started afterwards.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::filter::FilterSpec;
use crate::model::{ServiceType, ServiceUrl};
use crate::registration::ServiceRegistration;
use crate::spi::{
    DiscoveryProvider, DiscoveryRequest, DiscoveryResult, RegistryProvider, empty_provider,
    empty_registry_provider,
};

/// A discovery provider whose delegate may be replaced at runtime.
pub struct MutableDiscoveryProvider {
    delegate: RwLock<Arc<dyn DiscoveryProvider>>,
}

impl MutableDiscoveryProvider {
    /// Construct a new instance with the given initial delegate.
    pub fn new(initial: Arc<dyn DiscoveryProvider>) -> MutableDiscoveryProvider {
        MutableDiscoveryProvider {
            delegate: RwLock::new(initial),
        }
    }

    /// Replace the delegate provider.
    pub fn set_provider(&self, provider: Arc<dyn DiscoveryProvider>) {
        *self.delegate.write().expect("provider slot poisoned") = provider;
    }

    fn current(&self) -> Arc<dyn DiscoveryProvider> {
        self.delegate.read().expect("provider slot poisoned").clone()
    }
}

impl Default for MutableDiscoveryProvider {
    fn default() -> Self {
        MutableDiscoveryProvider::new(empty_provider())
    }
}

#[async_trait]
impl DiscoveryProvider for MutableDiscoveryProvider {
    async fn discover(
        &self,
        service_type: &ServiceType,
        filter_spec: Option<&FilterSpec>,
        result: Arc<dyn DiscoveryResult>,
    ) -> Box<dyn DiscoveryRequest> {
        self.current().discover(service_type, filter_spec, result).await
    }
}

/// A registry provider whose delegate may be replaced at runtime.
pub struct MutableRegistryProvider {
    delegate: RwLock<Arc<dyn RegistryProvider>>,
}

impl MutableRegistryProvider {
    /// Construct a new instance with the given initial delegate.
    pub fn new(initial: Arc<dyn RegistryProvider>) -> MutableRegistryProvider {
        MutableRegistryProvider {
            delegate: RwLock::new(initial),
        }
    }

    /// Replace the delegate provider.
    pub fn set_provider(&self, provider: Arc<dyn RegistryProvider>) {
        *self.delegate.write().expect("provider slot poisoned") = provider;
    }

    fn current(&self) -> Arc<dyn RegistryProvider> {
        self.delegate.read().expect("provider slot poisoned").clone()
    }
}

impl Default for MutableRegistryProvider {
    fn default() -> Self {
        MutableRegistryProvider::new(empty_registry_provider())
    }
}

impl RegistryProvider for MutableRegistryProvider {
    fn register_service(&self, service_url: ServiceUrl) -> Box<dyn ServiceRegistration> {
        self.current().register_service(service_url)
    }

    fn register_services(&self, service_urls: Vec<ServiceUrl>) -> Box<dyn ServiceRegistration> {
        self.current().register_services(service_urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Discovery;
    use crate::provider::StaticDiscoveryProvider;
    use url::Url;

    #[smol_potat::test]
    async fn swapping_the_delegate_affects_later_queries() {
        let provider = Arc::new(MutableDiscoveryProvider::default());
        let discovery = Discovery::new(provider.clone());
        let service_type = ServiceType::of("http", None);

        let mut queue = discovery.discover(&service_type, None).await;
        assert_eq!(queue.take_service().await, None);

        let advertised = ServiceUrl::builder()
            .uri(Url::parse("http://swapped.example.com/").unwrap())
            .build()
            .unwrap();
        provider.set_provider(Arc::new(StaticDiscoveryProvider::new(vec![advertised])));

        let mut queue = discovery.discover(&service_type, None).await;
        assert!(queue.take_service().await.is_some());
        assert_eq!(queue.take_service().await, None);
    }
}
