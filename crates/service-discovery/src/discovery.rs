//! The service discovery entry point
//!
//! A [`Discovery`] instance wraps one discovery provider (possibly an
//! aggregate over several) and turns its asynchronous match/problem/complete
//! callbacks into a [`ServicesQueue`] the caller drains.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::filter::FilterSpec;
use crate::model::{ServiceDescription, ServiceType};
use crate::provider::AggregateDiscoveryProvider;
use crate::queue::{QueueDiscoveryResult, ServicesQueue};
use crate::spi::{DiscoveryProvider, DiscoveryResult, empty_provider};

/// The service discovery API. Each instance is associated with the discovery
/// provider which answers its queries.
pub struct Discovery {
    provider: Arc<dyn DiscoveryProvider>,
    cancel_delay: Duration,
}

impl Discovery {
    /// Create a discovery object backed by the given provider.
    pub fn new(provider: Arc<dyn DiscoveryProvider>) -> Discovery {
        Discovery {
            provider,
            cancel_delay: Duration::ZERO,
        }
    }

    /// Create a discovery object backed by the given providers: none yields
    /// the empty provider, one is used directly, and several are aggregated.
    pub fn with_providers(mut providers: Vec<Arc<dyn DiscoveryProvider>>) -> Discovery {
        let provider: Arc<dyn DiscoveryProvider> = match providers.len() {
            0 => empty_provider(),
            1 => providers.remove(0),
            _ => Arc::new(AggregateDiscoveryProvider::new(providers)),
        };
        Discovery::new(provider)
    }

    /// Set the grace period between closing an unfinished queue and
    /// requesting cancellation from the provider. Zero (the default) cancels
    /// immediately; a small delay tolerates fast in-flight completions.
    pub fn with_cancel_delay(mut self, cancel_delay: Duration) -> Discovery {
        self.cancel_delay = cancel_delay;
        self
    }

    /// Perform a service discovery.
    ///
    /// The returned queue is populated as answers become available; answer
    /// order is not significant and can vary from call to call. An absent
    /// filter matches every service of the given type. The queue may be
    /// closed (or dropped) to indicate no further interest.
    pub async fn discover(
        &self,
        service_type: &ServiceType,
        filter_spec: Option<&FilterSpec>,
    ) -> ServicesQueue {
        self.run_query(service_type, filter_spec, None).await
    }

    /// Perform a service discovery whose unbounded waits are capped.
    ///
    /// Every [`ServicesQueue::await_ready`] and
    /// [`ServicesQueue::take_service`] call on the returned queue waits no
    /// longer than `timeout` before reporting nothing.
    pub async fn discover_with_timeout(
        &self,
        service_type: &ServiceType,
        filter_spec: Option<&FilterSpec>,
        timeout: Duration,
    ) -> ServicesQueue {
        self.run_query(service_type, filter_spec, Some(timeout)).await
    }

    /// Perform a service discovery for a service description.
    pub async fn discover_description(&self, description: &ServiceDescription) -> ServicesQueue {
        self.discover(description.service_type(), Some(description.filter_spec()))
            .await
    }

    async fn run_query(
        &self,
        service_type: &ServiceType,
        filter_spec: Option<&FilterSpec>,
        default_timeout: Option<Duration>,
    ) -> ServicesQueue {
        let (sender, receiver) = async_channel::unbounded();
        let problems = Arc::new(Mutex::new(Vec::new()));
        let completed = Arc::new(AtomicBool::new(false));
        let result: Arc<dyn DiscoveryResult> = Arc::new(QueueDiscoveryResult::new(
            sender,
            problems.clone(),
            completed.clone(),
        ));
        debug!(
            "discovering {service_type} with filter {}",
            filter_spec.map_or_else(|| "<none>".to_string(), FilterSpec::to_string),
        );
        let request = self.provider.discover(service_type, filter_spec, result).await;
        ServicesQueue::new(
            receiver,
            problems,
            request,
            completed,
            self.cancel_delay,
            default_timeout,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[smol_potat::test]
    async fn empty_discovery_finishes_immediately() {
        let discovery = Discovery::with_providers(Vec::new());
        let mut queue = discovery
            .discover(&ServiceType::of("ejb", Some("jboss")), None)
            .await;
        assert_eq!(queue.take_service().await, None);
        assert!(queue.is_finished());
        assert!(queue.problems().is_empty());
    }
}
