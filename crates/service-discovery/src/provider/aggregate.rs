//! Fan-out combinators over multiple providers
//!
//! An aggregate forwards one query or registration to N delegates and fans
//! the N completions or handles back into one. The aggregate discovery
//! request is complete exactly when every delegate request is.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::Error;
use crate::filter::FilterSpec;
use crate::model::{ServiceType, ServiceUrl};
use crate::registration::{ServiceRegistration, aggregate};
use crate::spi::{
    DiscoveryProvider, DiscoveryRequest, DiscoveryResult, RegistryProvider, null_request,
};

/// A discovery provider which aggregates multiple other providers together.
pub struct AggregateDiscoveryProvider {
    delegates: Vec<Arc<dyn DiscoveryProvider>>,
}

impl AggregateDiscoveryProvider {
    /// Construct a new instance over the given delegates.
    pub fn new(delegates: Vec<Arc<dyn DiscoveryProvider>>) -> AggregateDiscoveryProvider {
        AggregateDiscoveryProvider { delegates }
    }
}

#[async_trait]
impl DiscoveryProvider for AggregateDiscoveryProvider {
    async fn discover(
        &self,
        service_type: &ServiceType,
        filter_spec: Option<&FilterSpec>,
        result: Arc<dyn DiscoveryResult>,
    ) -> Box<dyn DiscoveryRequest> {
        if self.delegates.is_empty() {
            result.complete();
            return null_request();
        }
        let outstanding = Arc::new(AtomicUsize::new(self.delegates.len()));
        let mut requests = Vec::with_capacity(self.delegates.len());
        for delegate in &self.delegates {
            let counting: Arc<dyn DiscoveryResult> = Arc::new(CountingResult {
                delegate: result.clone(),
                outstanding: outstanding.clone(),
                done: AtomicBool::new(false),
            });
            requests.push(delegate.discover(service_type, filter_spec, counting).await);
        }
        Box::new(AggregateRequest { requests })
    }
}

struct AggregateRequest {
    requests: Vec<Box<dyn DiscoveryRequest>>,
}

impl DiscoveryRequest for AggregateRequest {
    fn cancel(&self) {
        for request in &self.requests {
            request.cancel();
        }
    }
}

/// Per-delegate decorator: forwards answers until its delegate completes,
/// and performs the shared completion on the last outstanding delegate.
struct CountingResult {
    delegate: Arc<dyn DiscoveryResult>,
    outstanding: Arc<AtomicUsize>,
    done: AtomicBool,
}

impl DiscoveryResult for CountingResult {
    fn add_match(&self, service_url: ServiceUrl) {
        if !self.done.load(Ordering::Acquire) {
            self.delegate.add_match(service_url);
        }
    }

    fn report_problem(&self, problem: Error) {
        if !self.done.load(Ordering::Acquire) {
            self.delegate.report_problem(problem);
        }
    }

    fn complete(&self) {
        if self
            .done
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            && self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1
        {
            self.delegate.complete();
        }
    }
}

/// A registry provider which aggregates multiple other providers together.
pub struct AggregateRegistryProvider {
    delegates: Vec<Arc<dyn RegistryProvider>>,
}

impl AggregateRegistryProvider {
    /// Construct a new instance over the given delegates.
    pub fn new(delegates: Vec<Arc<dyn RegistryProvider>>) -> AggregateRegistryProvider {
        AggregateRegistryProvider { delegates }
    }
}

impl RegistryProvider for AggregateRegistryProvider {
    fn register_service(&self, service_url: ServiceUrl) -> Box<dyn ServiceRegistration> {
        aggregate(
            self.delegates
                .iter()
                .map(|delegate| delegate.register_service(service_url.clone()))
                .collect(),
        )
    }

    fn register_services(&self, service_urls: Vec<ServiceUrl>) -> Box<dyn ServiceRegistration> {
        aggregate(
            self.delegates
                .iter()
                .map(|delegate| delegate.register_services(service_urls.clone()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingResult {
        matches: Mutex<Vec<ServiceUrl>>,
        completions: AtomicUsize,
    }

    impl DiscoveryResult for RecordingResult {
        fn add_match(&self, service_url: ServiceUrl) {
            self.matches.lock().unwrap().push(service_url);
        }

        fn report_problem(&self, _problem: Error) {}

        fn complete(&self) {
            self.completions.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn url(name: &str) -> ServiceUrl {
        ServiceUrl::builder()
            .uri(url::Url::parse(&format!("http://{name}/")).unwrap())
            .build()
            .unwrap()
    }

    #[smol_potat::test]
    async fn empty_delegate_list_completes_immediately() {
        let sink = Arc::new(RecordingResult::default());
        let provider = AggregateDiscoveryProvider::new(Vec::new());
        provider
            .discover(&ServiceType::of("http", None), None, sink.clone())
            .await;
        assert_eq!(sink.completions.load(Ordering::SeqCst), 1);
    }

    #[smol_potat::test]
    async fn misbehaving_delegate_cannot_complete_twice() {
        // a delegate completing repeatedly, or answering after its own
        // completion, must not disturb the shared sink
        let sink: Arc<RecordingResult> = Arc::new(RecordingResult::default());
        let shared: Arc<dyn DiscoveryResult> = sink.clone();
        let outstanding = Arc::new(AtomicUsize::new(2));

        let first = CountingResult {
            delegate: shared.clone(),
            outstanding: outstanding.clone(),
            done: AtomicBool::new(false),
        };
        first.add_match(url("early"));
        first.complete();
        first.complete();
        first.add_match(url("late"));
        assert_eq!(sink.completions.load(Ordering::SeqCst), 0);
        assert_eq!(sink.matches.lock().unwrap().len(), 1);

        let second = CountingResult {
            delegate: shared,
            outstanding,
            done: AtomicBool::new(false),
        };
        second.complete();
        assert_eq!(sink.completions.load(Ordering::SeqCst), 1);
    }
}
