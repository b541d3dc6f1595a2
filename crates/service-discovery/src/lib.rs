//! Attribute-filtered service discovery and registration
//!
//! This crate lets a process describe what attribute-value filters a
//! service must satisfy, fan a discovery query out to one or more pluggable
//! backends concurrently, and consume the resulting matches through a
//! cancellable, timeout-aware queue; independently it registers services
//! with one or more backend registries and controls their active window.
//!
//! # Architecture
//!
//! The crate is runtime-agnostic, working with any async runtime (tokio,
//! async-std, smol, etc). It uses:
//!
//! - `async-trait` for the provider SPI
//! - `async-channel` for the per-query result queue
//! - `async-io` for timeout timers
//! - Standard `futures` traits
//!
//! Queries are LDAP-style filter expressions over named attribute values,
//! exchanged as strings with a bit-exact textual grammar (see
//! [`filter`]). The only built-in backends are in-process:
//! [`LocalRegistryAndDiscoveryProvider`] (an in-memory registry which
//! answers its own discovery queries) and [`StaticDiscoveryProvider`]
//! (a fixed advertisement list); everything else plugs in through
//! [`DiscoveryProvider`] and [`RegistryProvider`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use service_discovery::{
//!     AttributeValue, Discovery, FilterSpec, LocalRegistryAndDiscoveryProvider,
//!     RegistryProvider, ServiceType, ServiceUrl,
//! };
//!
//! # async fn example() -> service_discovery::Result<()> {
//! let registry = Arc::new(LocalRegistryAndDiscoveryProvider::new());
//! let url = ServiceUrl::builder()
//!     .uri(url::Url::parse("http://node1.example.com:8080").unwrap())
//!     .abstract_type("ejb")
//!     .attribute("cluster", AttributeValue::from_string("c"))
//!     .build()?;
//! let _registration = registry.register_service(url);
//!
//! let discovery = Discovery::new(registry);
//! let filter: FilterSpec = "(cluster=c)".parse()?;
//! let mut queue = discovery
//!     .discover(&ServiceType::of("ejb", None), Some(&filter))
//!     .await;
//! while let Some(service) = queue.take_service().await {
//!     println!("found {service}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod attribute;
pub mod discovery;
pub mod error;
pub mod filter;
pub mod model;
pub mod provider;
pub mod queue;
pub mod registration;
pub mod registry;
pub mod spi;

pub use attribute::{AttributeValue, Kind};
pub use discovery::Discovery;
pub use error::{Error, ParseError, Result};
pub use filter::{AttributeMap, FilterSpec, MultiAttributeMap};
pub use model::{ServiceDescription, ServiceType, ServiceUrl, ServiceUrlBuilder};
pub use provider::{
    AggregateDiscoveryProvider, AggregateRegistryProvider, LocalRegistryAndDiscoveryProvider,
    MutableDiscoveryProvider, MutableRegistryProvider, StaticDiscoveryProvider,
};
pub use queue::ServicesQueue;
pub use registration::{ServiceRegistration, aggregate, empty_registration};
pub use registry::ServiceRegistry;
pub use spi::{
    BlockingDiscoveryProvider, CancellationToken, DiscoveryProvider, DiscoveryRequest,
    DiscoveryResult, RegistryProvider, blocking_provider, empty_provider,
    empty_registry_provider, null_request,
};

/// Re-export key types for convenience
pub mod prelude {
    pub use crate::{
        AttributeValue, Discovery, DiscoveryProvider, Error, FilterSpec,
        LocalRegistryAndDiscoveryProvider, RegistryProvider, Result, ServiceRegistration,
        ServiceRegistry, ServiceType, ServiceUrl, ServicesQueue,
    };
}
