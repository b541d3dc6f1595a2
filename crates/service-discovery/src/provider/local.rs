//! A local in-memory registry and discovery provider
//!
//! Services registered with this provider can be discovered through it;
//! all operations happen in memory, so queries complete synchronously.
//! Each registration carries one atomically updated state word:
//!
//! ```text
//! bit 63      closed (terminal)
//! bit 62      deactivated
//! bits 0..62  expiry stamp, microseconds on a process-local monotonic
//!             epoch; 0 means indefinitely active
//! ```
//!
//! Every transition is a compare-and-swap retry loop; the backing entry
//! list tolerates registration and close racing an in-progress scan, which
//! simply sees a snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use crate::filter::FilterSpec;
use crate::model::{ServiceType, ServiceUrl};
use crate::registration::ServiceRegistration;
use crate::spi::{
    DiscoveryProvider, DiscoveryRequest, DiscoveryResult, RegistryProvider, null_request,
};

const FLAG_CLOSED: u64 = 1 << 63;
const FLAG_DEACTIVATED: u64 = 1 << 62;
const TIME_MASK: u64 = (1 << 62) - 1;

fn now_micros() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = *EPOCH.get_or_init(Instant::now);
    Instant::now()
        .duration_since(epoch)
        .as_micros()
        .min(TIME_MASK as u128) as u64
}

type EntryList = Arc<RwLock<Vec<Arc<Entry>>>>;

/// A local in-memory service registry which is simultaneously a discovery
/// provider.
#[derive(Default)]
pub struct LocalRegistryAndDiscoveryProvider {
    entries: EntryList,
}

impl LocalRegistryAndDiscoveryProvider {
    /// Construct a new, empty instance.
    pub fn new() -> LocalRegistryAndDiscoveryProvider {
        LocalRegistryAndDiscoveryProvider::default()
    }
}

impl RegistryProvider for LocalRegistryAndDiscoveryProvider {
    fn register_service(&self, service_url: ServiceUrl) -> Box<dyn ServiceRegistration> {
        debug!("registering {service_url} with local registry");
        let entry = Arc::new(Entry {
            state: AtomicU64::new(0),
            service_url,
        });
        self.entries
            .write()
            .expect("registry lock poisoned")
            .push(entry.clone());
        Box::new(Handle {
            entries: self.entries.clone(),
            handles: vec![entry],
        })
    }

    fn register_services(&self, service_urls: Vec<ServiceUrl>) -> Box<dyn ServiceRegistration> {
        debug!("registering {} services with local registry", service_urls.len());
        let handles: Vec<Arc<Entry>> = service_urls
            .into_iter()
            .map(|service_url| {
                Arc::new(Entry {
                    state: AtomicU64::new(0),
                    service_url,
                })
            })
            .collect();
        self.entries
            .write()
            .expect("registry lock poisoned")
            .extend(handles.iter().cloned());
        Box::new(Handle {
            entries: self.entries.clone(),
            handles,
        })
    }
}

#[async_trait]
impl DiscoveryProvider for LocalRegistryAndDiscoveryProvider {
    async fn discover(
        &self,
        service_type: &ServiceType,
        filter_spec: Option<&FilterSpec>,
        result: Arc<dyn DiscoveryResult>,
    ) -> Box<dyn DiscoveryRequest> {
        let snapshot: Vec<Arc<Entry>> =
            self.entries.read().expect("registry lock poisoned").clone();
        for entry in snapshot {
            if !entry.is_open_and_active() {
                continue;
            }
            let service_url = &entry.service_url;
            if service_type.implies_url(service_url) && service_url.satisfies(filter_spec) {
                result.add_match(service_url.clone());
            }
        }
        result.complete();
        null_request()
    }
}

struct Entry {
    state: AtomicU64,
    service_url: ServiceUrl,
}

impl Entry {
    fn close(&self) {
        self.state.store(FLAG_CLOSED, Ordering::Release);
    }

    fn deactivate(&self) {
        let mut old = self.state.load(Ordering::Acquire);
        loop {
            if old & (FLAG_CLOSED | FLAG_DEACTIVATED) != 0 {
                return;
            }
            match self.state.compare_exchange_weak(
                old,
                FLAG_DEACTIVATED,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(current) => old = current,
            }
        }
    }

    fn activate(&self) {
        let mut old = self.state.load(Ordering::Acquire);
        loop {
            if old & FLAG_CLOSED != 0 || old == 0 {
                return;
            }
            match self
                .state
                .compare_exchange_weak(old, 0, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(current) => old = current,
            }
        }
    }

    fn activate_for(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        let micros = duration.as_micros();
        if micros > TIME_MASK as u128 {
            return self.activate();
        }
        let stamp = match now_micros().checked_add(micros as u64) {
            Some(stamp) if stamp <= TIME_MASK => stamp,
            _ => return self.activate(),
        };
        let mut old = self.state.load(Ordering::Acquire);
        loop {
            if old & FLAG_CLOSED != 0 || old == stamp {
                return;
            }
            match self.state.compare_exchange_weak(
                old,
                stamp,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(current) => old = current,
            }
        }
    }

    fn is_open_and_active(&self) -> bool {
        let state = self.state.load(Ordering::Acquire);
        if state & (FLAG_CLOSED | FLAG_DEACTIVATED) != 0 {
            return false;
        }
        let stamp = state & TIME_MASK;
        stamp == 0 || now_micros() < stamp
    }
}

/// A handle over one registered entry or a batch of them.
struct Handle {
    entries: EntryList,
    handles: Vec<Arc<Entry>>,
}

impl ServiceRegistration for Handle {
    fn close(&self) {
        self.entries
            .write()
            .expect("registry lock poisoned")
            .retain(|entry| !self.handles.iter().any(|own| Arc::ptr_eq(entry, own)));
        for entry in &self.handles {
            entry.close();
        }
    }

    fn deactivate(&self) {
        for entry in &self.handles {
            entry.deactivate();
        }
    }

    fn activate(&self) {
        for entry in &self.handles {
            entry.activate();
        }
    }

    fn activate_for(&self, duration: Duration) {
        for entry in &self.handles {
            entry.activate_for(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Discovery;
    use url::Url;

    fn service(name: &str) -> ServiceUrl {
        ServiceUrl::builder()
            .uri(Url::parse(&format!("http://{name}.example.com")).unwrap())
            .abstract_type("ejb")
            .abstract_type_authority("jboss")
            .build()
            .unwrap()
    }

    async fn count_matches(registry: &Arc<LocalRegistryAndDiscoveryProvider>) -> usize {
        let discovery = Discovery::new(registry.clone());
        let mut queue = discovery
            .discover(&ServiceType::of("ejb", Some("jboss")), None)
            .await;
        let mut count = 0;
        while queue.take_service().await.is_some() {
            count += 1;
        }
        count
    }

    #[smol_potat::test]
    async fn register_and_discover() {
        let registry = Arc::new(LocalRegistryAndDiscoveryProvider::new());
        let handle = registry.register_service(service("a"));
        assert_eq!(count_matches(&registry).await, 1);

        // the wrong type finds nothing
        let discovery = Discovery::new(registry.clone() as Arc<dyn DiscoveryProvider>);
        let mut queue = discovery
            .discover(&ServiceType::of("jms", Some("jboss")), None)
            .await;
        assert_eq!(queue.take_service().await, None);

        handle.close();
        assert_eq!(count_matches(&registry).await, 0);
    }

    #[smol_potat::test]
    async fn deactivate_and_activate() {
        let registry = Arc::new(LocalRegistryAndDiscoveryProvider::new());
        let handle = registry.register_service(service("a"));
        handle.deactivate();
        assert_eq!(count_matches(&registry).await, 0);
        handle.activate();
        assert_eq!(count_matches(&registry).await, 1);
        // double deactivate is harmless
        handle.deactivate();
        handle.deactivate();
        assert_eq!(count_matches(&registry).await, 0);
    }

    #[smol_potat::test]
    async fn activation_window_expires() {
        let registry = Arc::new(LocalRegistryAndDiscoveryProvider::new());
        let handle = registry.register_service(service("a"));
        handle.activate_for(Duration::from_millis(60));
        assert_eq!(count_matches(&registry).await, 1);
        std::thread::sleep(Duration::from_millis(90));
        assert_eq!(count_matches(&registry).await, 0);
        // re-activating revives the entry indefinitely
        handle.activate();
        assert_eq!(count_matches(&registry).await, 1);
    }

    #[smol_potat::test]
    async fn oversized_window_degrades_to_indefinite() {
        let registry = Arc::new(LocalRegistryAndDiscoveryProvider::new());
        let handle = registry.register_service(service("a"));
        handle.activate_for(Duration::from_secs(u64::MAX));
        assert_eq!(count_matches(&registry).await, 1);
    }

    #[smol_potat::test]
    async fn closed_is_terminal() {
        let registry = Arc::new(LocalRegistryAndDiscoveryProvider::new());
        let handle = registry.register_service(service("a"));
        handle.close();
        handle.activate();
        handle.activate_for(Duration::from_secs(60));
        assert_eq!(count_matches(&registry).await, 0);
    }

    #[smol_potat::test]
    async fn batch_registration_closes_together() {
        let registry = Arc::new(LocalRegistryAndDiscoveryProvider::new());
        let batch = registry.register_services(vec![service("a"), service("b"), service("c")]);
        assert_eq!(count_matches(&registry).await, 3);
        batch.close();
        assert_eq!(count_matches(&registry).await, 0);
    }
}
