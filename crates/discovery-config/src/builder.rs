//! Assembling providers from a parsed configuration

use std::collections::HashMap;
use std::sync::Arc;

use service_discovery::{
    AggregateDiscoveryProvider, AggregateRegistryProvider, AttributeValue, DiscoveryProvider,
    LocalRegistryAndDiscoveryProvider, RegistryProvider, ServiceUrl, StaticDiscoveryProvider,
    empty_provider, empty_registry_provider,
};
use tracing::debug;
use url::Url;

use crate::{
    AttributeEntry, Config, ConfigError, DiscoveryProviderSpec, RegistryProviderSpec, Result,
    ServiceEntry,
};

type DiscoveryFactory =
    Box<dyn Fn(&serde_yaml::Value) -> Result<Arc<dyn DiscoveryProvider>> + Send + Sync>;
type RegistryFactory =
    Box<dyn Fn(&serde_yaml::Value) -> Result<Arc<dyn RegistryProvider>> + Send + Sync>;

/// Named constructors for `custom` providers, supplied by the host
/// application.
#[derive(Default)]
pub struct ProviderRegistry {
    discovery: HashMap<String, DiscoveryFactory>,
    registry: HashMap<String, RegistryFactory>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> ProviderRegistry {
        ProviderRegistry::default()
    }

    /// Register a named discovery provider constructor.
    pub fn register_discovery<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&serde_yaml::Value) -> Result<Arc<dyn DiscoveryProvider>> + Send + Sync + 'static,
    {
        self.discovery.insert(name.into(), Box::new(factory));
    }

    /// Register a named registry provider constructor.
    pub fn register_registry<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&serde_yaml::Value) -> Result<Arc<dyn RegistryProvider>> + Send + Sync + 'static,
    {
        self.registry.insert(name.into(), Box::new(factory));
    }
}

/// The provider pair assembled from one configuration.
pub struct BuiltProviders {
    /// The root discovery provider
    pub discovery: Arc<dyn DiscoveryProvider>,
    /// The root registry provider
    pub registry: Arc<dyn RegistryProvider>,
}

impl std::fmt::Debug for BuiltProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltProviders").finish_non_exhaustive()
    }
}

impl Config {
    /// Assemble the configured provider pair.
    ///
    /// Every mention of `local-registry` within one configuration resolves
    /// to the same in-memory instance, so services registered through the
    /// registry side become discoverable through the discovery side. A
    /// missing section yields the respective empty provider.
    pub fn build(&self, providers: &ProviderRegistry) -> Result<BuiltProviders> {
        let local = Arc::new(LocalRegistryAndDiscoveryProvider::new());
        let discovery = match &self.discovery {
            Some(section) => build_discovery(&section.provider, &local, providers)?,
            None => empty_provider(),
        };
        let registry = match &self.registry {
            Some(section) => build_registry(&section.provider, &local, providers)?,
            None => empty_registry_provider(),
        };
        debug!("assembled discovery configuration");
        Ok(BuiltProviders {
            discovery,
            registry,
        })
    }
}

fn build_discovery(
    spec: &DiscoveryProviderSpec,
    local: &Arc<LocalRegistryAndDiscoveryProvider>,
    providers: &ProviderRegistry,
) -> Result<Arc<dyn DiscoveryProvider>> {
    match spec {
        DiscoveryProviderSpec::LocalRegistry => Ok(local.clone()),
        DiscoveryProviderSpec::Static { services } => {
            let services = services
                .iter()
                .map(build_service_url)
                .collect::<Result<Vec<_>>>()?;
            Ok(Arc::new(StaticDiscoveryProvider::new(services)))
        }
        DiscoveryProviderSpec::Aggregate { providers: nested } => {
            let delegates = nested
                .iter()
                .map(|spec| build_discovery(spec, local, providers))
                .collect::<Result<Vec<_>>>()?;
            Ok(Arc::new(AggregateDiscoveryProvider::new(delegates)))
        }
        DiscoveryProviderSpec::Custom { name, params } => providers
            .discovery
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProvider(name.clone()))?(
            params
        ),
    }
}

fn build_registry(
    spec: &RegistryProviderSpec,
    local: &Arc<LocalRegistryAndDiscoveryProvider>,
    providers: &ProviderRegistry,
) -> Result<Arc<dyn RegistryProvider>> {
    match spec {
        RegistryProviderSpec::LocalRegistry => Ok(local.clone()),
        RegistryProviderSpec::Aggregate { providers: nested } => {
            let delegates = nested
                .iter()
                .map(|spec| build_registry(spec, local, providers))
                .collect::<Result<Vec<_>>>()?;
            Ok(Arc::new(AggregateRegistryProvider::new(delegates)))
        }
        RegistryProviderSpec::Custom { name, params } => providers
            .registry
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProvider(name.clone()))?(
            params
        ),
    }
}

fn build_service_url(entry: &ServiceEntry) -> Result<ServiceUrl> {
    let uri = Url::parse(&entry.uri)
        .map_err(|e| ConfigError::Validation(format!("service uri '{}': {e}", entry.uri)))?;
    let mut builder = ServiceUrl::builder().uri(uri);
    if let Some(abstract_type) = &entry.abstract_type {
        builder = builder.abstract_type(abstract_type.clone());
    }
    if let Some(authority) = &entry.abstract_type_authority {
        builder = builder.abstract_type_authority(authority.clone());
    }
    if let Some(authority) = &entry.uri_scheme_authority {
        builder = builder.uri_scheme_authority(authority.clone());
    }
    for (name, value) in &entry.attributes {
        builder = match value {
            AttributeEntry::Flag => builder.flag_attribute(name.clone()),
            AttributeEntry::Value(scalar) => builder.attribute(
                name.clone(),
                AttributeValue::from_string(&scalar.to_literal()),
            ),
            AttributeEntry::Values(scalars) => {
                scalars.iter().fold(builder, |builder, scalar| {
                    builder.attribute(
                        name.clone(),
                        AttributeValue::from_string(&scalar.to_literal()),
                    )
                })
            }
        };
    }
    Ok(builder.build()?)
}
