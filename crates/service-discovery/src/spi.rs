//! The provider service programming interface
//!
//! Discovery backends implement [`DiscoveryProvider`]; registration backends
//! implement [`RegistryProvider`]. A provider receives a query and a result
//! sink, returns a cancellation handle, and reports matches, problems, and
//! completion asynchronously through the sink. Every provider must
//! eventually call [`DiscoveryResult::complete`] exactly once, even on
//! internal failure; a provider that never completes hangs any consumer
//! performing an unbounded wait.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::error::Error;
use crate::filter::FilterSpec;
use crate::model::{ServiceType, ServiceUrl};
use crate::registration::{ServiceRegistration, aggregate, empty_registration};

/// The sink a discovery provider reports into.
///
/// [`complete`](Self::complete) is idempotent; once it has been called,
/// further matches and problems are silently dropped.
pub trait DiscoveryResult: Send + Sync {
    /// Report a matching service URL.
    fn add_match(&self, service_url: ServiceUrl);

    /// Report a problem encountered during the query. Problems accumulate
    /// alongside matches and never abort the query.
    fn report_problem(&self, problem: Error);

    /// Indicate that this provider's discovery is complete.
    fn complete(&self);
}

/// A cancellation handle for an in-progress discovery query.
///
/// Cancellation is advisory and best-effort: a provider may still deliver
/// matches after it is requested. Idempotent.
pub trait DiscoveryRequest: Send + Sync {
    /// Request cancellation of the query.
    fn cancel(&self);
}

struct NullRequest;

impl DiscoveryRequest for NullRequest {
    fn cancel(&self) {}
}

/// A request handle for queries that have nothing to cancel.
pub fn null_request() -> Box<dyn DiscoveryRequest> {
    Box::new(NullRequest)
}

/// A pluggable discovery backend.
#[async_trait]
pub trait DiscoveryProvider: Send + Sync {
    /// Attempt to discover services of the given type.
    ///
    /// Matches are written to `result` as they are found; an absent filter
    /// matches every candidate. The provider must arrange for
    /// `result.complete()` to be called exactly once, directly or
    /// transitively, even when discovery fails. Implementations should
    /// return quickly and continue asynchronously where possible.
    async fn discover(
        &self,
        service_type: &ServiceType,
        filter_spec: Option<&FilterSpec>,
        result: Arc<dyn DiscoveryResult>,
    ) -> Box<dyn DiscoveryRequest>;
}

struct EmptyDiscoveryProvider;

#[async_trait]
impl DiscoveryProvider for EmptyDiscoveryProvider {
    async fn discover(
        &self,
        _service_type: &ServiceType,
        _filter_spec: Option<&FilterSpec>,
        result: Arc<dyn DiscoveryResult>,
    ) -> Box<dyn DiscoveryRequest> {
        result.complete();
        null_request()
    }
}

/// The discovery provider that finds nothing and completes immediately.
pub fn empty_provider() -> Arc<dyn DiscoveryProvider> {
    Arc::new(EmptyDiscoveryProvider)
}

/// A pluggable registration backend.
pub trait RegistryProvider: Send + Sync {
    /// Register a service with this provider. Unsupported service URLs are
    /// ignored, yielding the empty registration handle rather than an error.
    fn register_service(&self, service_url: ServiceUrl) -> Box<dyn ServiceRegistration>;

    /// Register multiple services at once, controlled by a single handle.
    fn register_services(&self, service_urls: Vec<ServiceUrl>) -> Box<dyn ServiceRegistration> {
        aggregate(
            service_urls
                .into_iter()
                .map(|url| self.register_service(url))
                .collect(),
        )
    }
}

struct EmptyRegistryProvider;

impl RegistryProvider for EmptyRegistryProvider {
    fn register_service(&self, service_url: ServiceUrl) -> Box<dyn ServiceRegistration> {
        debug!("ignoring registration of {service_url}");
        empty_registration()
    }
}

/// The registry provider that ignores all registrations.
pub fn empty_registry_provider() -> Arc<dyn RegistryProvider> {
    Arc::new(EmptyRegistryProvider)
}

/// A shared flag through which a blocking discovery body observes
/// cancellation requests.
#[derive(Debug, Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
}

impl CancellationToken {
    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A synchronous discovery backend.
///
/// The blocking body should poll the token between units of work and bail
/// out early once it reports cancellation. Wrap with
/// [`blocking_provider`] to obtain an asynchronous [`DiscoveryProvider`].
pub trait BlockingDiscoveryProvider: Send + Sync + 'static {
    /// Discover services synchronously, reporting matches to `result`.
    ///
    /// The adapter completes the sink after this method returns, so
    /// implementations need not call `complete` themselves.
    fn discover_blocking(
        &self,
        service_type: &ServiceType,
        filter_spec: Option<&FilterSpec>,
        result: &dyn DiscoveryResult,
        cancel: &CancellationToken,
    );
}

struct BlockingAdapter<P> {
    inner: Arc<P>,
}

struct TokenRequest(Arc<CancellationToken>);

impl DiscoveryRequest for TokenRequest {
    fn cancel(&self) {
        self.0.cancel();
    }
}

#[async_trait]
impl<P: BlockingDiscoveryProvider> DiscoveryProvider for BlockingAdapter<P> {
    async fn discover(
        &self,
        service_type: &ServiceType,
        filter_spec: Option<&FilterSpec>,
        result: Arc<dyn DiscoveryResult>,
    ) -> Box<dyn DiscoveryRequest> {
        let inner = self.inner.clone();
        let service_type = service_type.clone();
        let filter_spec = filter_spec.cloned();
        let token = Arc::new(CancellationToken::default());
        let thread_token = token.clone();
        std::thread::spawn(move || {
            inner.discover_blocking(
                &service_type,
                filter_spec.as_ref(),
                result.as_ref(),
                &thread_token,
            );
            result.complete();
        });
        Box::new(TokenRequest(token))
    }
}

/// Adapt a blocking provider into an asynchronous one which dispatches each
/// query onto its own thread.
pub fn blocking_provider<P: BlockingDiscoveryProvider>(provider: P) -> Arc<dyn DiscoveryProvider> {
    Arc::new(BlockingAdapter {
        inner: Arc::new(provider),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Discovery;
    use crate::model::ServiceUrl;
    use std::time::Duration;

    struct SlowLister {
        services: Vec<ServiceUrl>,
    }

    impl BlockingDiscoveryProvider for SlowLister {
        fn discover_blocking(
            &self,
            service_type: &ServiceType,
            filter_spec: Option<&FilterSpec>,
            result: &dyn DiscoveryResult,
            cancel: &CancellationToken,
        ) {
            for service in &self.services {
                if cancel.is_cancelled() {
                    return;
                }
                std::thread::sleep(Duration::from_millis(5));
                if service_type.implies_url(service) && service.satisfies(filter_spec) {
                    result.add_match(service.clone());
                }
            }
        }
    }

    fn url(name: &str) -> ServiceUrl {
        ServiceUrl::builder()
            .uri(url::Url::parse(&format!("http://{name}/")).unwrap())
            .build()
            .unwrap()
    }

    #[smol_potat::test]
    async fn blocking_adapter_completes_the_sink() {
        let provider = blocking_provider(SlowLister {
            services: vec![url("a"), url("b")],
        });
        let discovery = Discovery::new(provider);
        let mut queue = discovery
            .discover(&ServiceType::of("http", None), None)
            .await;
        let mut found = 0;
        while queue.take_service().await.is_some() {
            found += 1;
        }
        assert_eq!(found, 2);
        assert!(queue.is_finished());
    }

    #[smol_potat::test]
    async fn blocking_adapter_honours_cancellation() {
        let services: Vec<ServiceUrl> = (0..50).map(|i| url(&format!("node{i}"))).collect();
        let provider = blocking_provider(SlowLister { services });
        let discovery = Discovery::new(provider);
        let mut queue = discovery
            .discover(&ServiceType::of("http", None), None)
            .await;
        queue.take_service().await;
        queue.close();
        // the worker observes the token and bails out, completing early
        let start = std::time::Instant::now();
        while !queue.is_finished() {
            if queue.take_service_for(Duration::from_millis(50)).await.is_none() && start.elapsed() > Duration::from_secs(5) {
                panic!("cancelled blocking discovery never completed");
            }
        }
    }
}
