//! Configuration data model

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A parsed configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Document format version; currently always `"1.0"`
    pub version: String,

    /// Discovery side, if configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery: Option<DiscoverySection>,

    /// Registry side, if configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistrySection>,
}

/// The discovery half of a configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySection {
    /// The root discovery provider
    pub provider: DiscoveryProviderSpec,
}

/// The registry half of a configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySection {
    /// The root registry provider
    pub provider: RegistryProviderSpec,
}

/// A declared discovery provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DiscoveryProviderSpec {
    /// The configuration's shared in-memory registry
    LocalRegistry,
    /// A fixed advertisement list
    Static {
        /// The advertised services
        #[serde(default)]
        services: Vec<ServiceEntry>,
    },
    /// A fan-out over nested providers
    Aggregate {
        /// The nested providers
        providers: Vec<DiscoveryProviderSpec>,
    },
    /// A host-registered named constructor
    Custom {
        /// The registered constructor name
        name: String,
        /// Free-form parameters passed to the constructor
        #[serde(default)]
        params: serde_yaml::Value,
    },
}

/// A declared registry provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RegistryProviderSpec {
    /// The configuration's shared in-memory registry
    LocalRegistry,
    /// A fan-out over nested providers
    Aggregate {
        /// The nested providers
        providers: Vec<RegistryProviderSpec>,
    },
    /// A host-registered named constructor
    Custom {
        /// The registered constructor name
        name: String,
        /// Free-form parameters passed to the constructor
        #[serde(default)]
        params: serde_yaml::Value,
    },
}

/// One advertised service in a `static` provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServiceEntry {
    /// The concrete location URI (required)
    pub uri: String,

    /// The abstract service type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_type: Option<String>,

    /// The abstract type naming authority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_type_authority: Option<String>,

    /// The URI scheme authority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri_scheme_authority: Option<String>,

    /// Attribute name to value(s); a null value declares a valueless
    /// attribute
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeEntry>,
}

/// The value side of one declared attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeEntry {
    /// Several values
    Values(Vec<Scalar>),
    /// A single value
    Value(Scalar),
    /// No value at all; matches presence filters only
    Flag,
}

/// A scalar attribute value as written in YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// A boolean literal
    Bool(bool),
    /// An integer literal
    Int(i64),
    /// Any other text
    Text(String),
}

impl Scalar {
    /// Render this scalar as the literal handed to the attribute-value
    /// classifier.
    pub fn to_literal(&self) -> String {
        match self {
            Scalar::Bool(value) => value.to_string(),
            Scalar::Int(value) => value.to_string(),
            Scalar::Text(value) => value.clone(),
        }
    }
}
