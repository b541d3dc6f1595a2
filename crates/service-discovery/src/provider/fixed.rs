//! A discovery provider answering from a fixed advertisement list

use std::sync::Arc;

use async_trait::async_trait;

use crate::filter::FilterSpec;
use crate::model::{ServiceType, ServiceUrl};
use crate::spi::{DiscoveryProvider, DiscoveryRequest, DiscoveryResult, null_request};

/// A discovery provider which answers every query from a static list of
/// service URLs, completing synchronously.
pub struct StaticDiscoveryProvider {
    services: Vec<ServiceUrl>,
}

impl StaticDiscoveryProvider {
    /// Construct a new instance advertising the given services.
    pub fn new(services: Vec<ServiceUrl>) -> StaticDiscoveryProvider {
        StaticDiscoveryProvider { services }
    }
}

#[async_trait]
impl DiscoveryProvider for StaticDiscoveryProvider {
    async fn discover(
        &self,
        service_type: &ServiceType,
        filter_spec: Option<&FilterSpec>,
        result: Arc<dyn DiscoveryResult>,
    ) -> Box<dyn DiscoveryRequest> {
        for service in &self.services {
            if service_type.implies_url(service) && service.satisfies(filter_spec) {
                result.add_match(service.clone());
            }
        }
        result.complete();
        null_request()
    }
}
