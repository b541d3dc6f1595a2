//! Configuration parsing and validation

use std::path::Path;

use tracing::debug;

use crate::{Config, ConfigError, DiscoveryProviderSpec, RegistryProviderSpec, Result};

/// Parse a YAML configuration file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Config> {
    debug!("loading discovery configuration from {:?}", path.as_ref());
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parse YAML configuration from a string.
pub fn parse_str(content: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation(format!(
            "Unsupported version: {}, expected 1.0",
            config.version
        )));
    }
    if config.discovery.is_none() && config.registry.is_none() {
        return Err(ConfigError::Validation(
            "configuration declares neither a discovery nor a registry provider".to_string(),
        ));
    }
    if let Some(discovery) = &config.discovery {
        validate_discovery(&discovery.provider)?;
    }
    if let Some(registry) = &config.registry {
        validate_registry(&registry.provider)?;
    }
    Ok(())
}

fn validate_discovery(spec: &DiscoveryProviderSpec) -> Result<()> {
    match spec {
        DiscoveryProviderSpec::LocalRegistry => Ok(()),
        DiscoveryProviderSpec::Static { services } => {
            for service in services {
                if service.uri.trim().is_empty() {
                    return Err(ConfigError::Validation(
                        "static service entry with an empty uri".to_string(),
                    ));
                }
                if service.abstract_type.is_none() && service.abstract_type_authority.is_some() {
                    return Err(ConfigError::Validation(format!(
                        "service '{}' has an abstract-type-authority without an abstract-type",
                        service.uri
                    )));
                }
            }
            Ok(())
        }
        DiscoveryProviderSpec::Aggregate { providers } => {
            providers.iter().try_for_each(validate_discovery)
        }
        DiscoveryProviderSpec::Custom { name, .. } => {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "custom provider with an empty name".to_string(),
                ));
            }
            Ok(())
        }
    }
}

fn validate_registry(spec: &RegistryProviderSpec) -> Result<()> {
    match spec {
        RegistryProviderSpec::LocalRegistry => Ok(()),
        RegistryProviderSpec::Aggregate { providers } => {
            providers.iter().try_for_each(validate_registry)
        }
        RegistryProviderSpec::Custom { name, .. } => {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "custom provider with an empty name".to_string(),
                ));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_document() {
        let config = parse_str(
            r#"
version: "1.0"
discovery:
  provider:
    type: aggregate
    providers:
      - type: local-registry
      - type: static
        services:
          - uri: "http://node1.example.com:8080"
            abstract-type: ejb
            abstract-type-authority: jboss
            attributes:
              cluster: c
              port: 8080
              secure: true
              tags: [a, b]
              flagged: ~
registry:
  provider:
    type: local-registry
"#,
        )
        .unwrap();
        let discovery = config.discovery.expect("discovery section");
        match discovery.provider {
            DiscoveryProviderSpec::Aggregate { providers } => {
                assert_eq!(providers.len(), 2);
                match &providers[1] {
                    DiscoveryProviderSpec::Static { services } => {
                        assert_eq!(services.len(), 1);
                        assert_eq!(services[0].abstract_type.as_deref(), Some("ejb"));
                        assert_eq!(services[0].attributes.len(), 5);
                    }
                    other => panic!("expected static, got {other:?}"),
                }
            }
            other => panic!("expected aggregate, got {other:?}"),
        }
        assert!(matches!(
            config.registry.unwrap().provider,
            RegistryProviderSpec::LocalRegistry
        ));
    }

    #[test]
    fn rejects_wrong_version() {
        let err = parse_str("version: \"2.0\"\ndiscovery:\n  provider:\n    type: local-registry\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_empty_document() {
        let err = parse_str("version: \"1.0\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_unknown_provider_type() {
        let err = parse_str(
            "version: \"1.0\"\ndiscovery:\n  provider:\n    type: carrier-pigeon\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn rejects_authority_without_abstract_type() {
        let err = parse_str(
            r#"
version: "1.0"
discovery:
  provider:
    type: static
    services:
      - uri: "http://h/"
        abstract-type-authority: jboss
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn parse_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("discovery.yaml");
        std::fs::write(
            &path,
            "version: \"1.0\"\nregistry:\n  provider:\n    type: local-registry\n",
        )
        .unwrap();
        let config = parse_file(&path).unwrap();
        assert!(config.discovery.is_none());
        assert!(config.registry.is_some());
    }
}
