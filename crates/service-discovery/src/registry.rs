//! The service registry entry point

use std::sync::Arc;

use tracing::debug;

use crate::model::ServiceUrl;
use crate::registration::ServiceRegistration;
use crate::spi::RegistryProvider;

/// The service registration API. Each instance is associated with the
/// registry provider which records its registrations.
pub struct ServiceRegistry {
    provider: Arc<dyn RegistryProvider>,
}

impl ServiceRegistry {
    /// Create a new service registry backed by the given provider.
    pub fn new(provider: Arc<dyn RegistryProvider>) -> ServiceRegistry {
        ServiceRegistry { provider }
    }

    /// Register a service URL. The registration lasts until the returned
    /// handle is closed; unsupported URLs yield the empty handle.
    pub fn register_service(&self, service_url: ServiceUrl) -> Box<dyn ServiceRegistration> {
        debug!("registering {service_url}");
        self.provider.register_service(service_url)
    }

    /// Register a group of service URLs controlled with a single handle.
    pub fn register_services(
        &self,
        service_urls: Vec<ServiceUrl>,
    ) -> Box<dyn ServiceRegistration> {
        debug!("registering {} services", service_urls.len());
        self.provider.register_services(service_urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Discovery;
    use crate::model::ServiceType;
    use crate::provider::LocalRegistryAndDiscoveryProvider;
    use url::Url;

    #[smol_potat::test]
    async fn registrations_flow_through_to_the_provider() {
        let local = Arc::new(LocalRegistryAndDiscoveryProvider::new());
        let registry = ServiceRegistry::new(local.clone());
        let _handle = registry.register_service(
            ServiceUrl::builder()
                .uri(Url::parse("http://h/").unwrap())
                .build()
                .unwrap(),
        );
        let discovery = Discovery::new(local);
        let mut queue = discovery
            .discover(&ServiceType::of("http", None), None)
            .await;
        assert!(queue.take_service().await.is_some());
    }
}
