//! YAML configuration for assembling service discovery providers
//!
//! A configuration document declares which discovery and registry providers
//! an application uses, out of:
//!
//! - `local-registry`: the in-memory registry; naming it in both the
//!   discovery and the registry position yields one shared instance, so
//!   locally registered services are locally discoverable
//! - `static`: a fixed list of advertised service URLs (discovery only)
//! - `aggregate`: a fan-out over nested providers
//! - `custom`: a named constructor registered by the host through
//!   [`ProviderRegistry`]
//!
//! ```yaml
//! version: "1.0"
//! discovery:
//!   provider:
//!     type: aggregate
//!     providers:
//!       - type: local-registry
//!       - type: static
//!         services:
//!           - uri: "http://node1.example.com:8080"
//!             abstract-type: ejb
//!             abstract-type-authority: jboss
//!             attributes:
//!               cluster: c
//! registry:
//!   provider:
//!     type: local-registry
//! ```
//!
//! Parsing and validation failures all surface as [`ConfigError`].

#![warn(missing_docs)]

pub mod builder;
pub mod model;
pub mod parser;

use thiserror::Error;

pub use builder::{BuiltProviders, ProviderRegistry};
pub use model::{
    AttributeEntry, Config, DiscoveryProviderSpec, DiscoverySection, RegistryProviderSpec,
    RegistrySection, Scalar, ServiceEntry,
};
pub use parser::{parse_file, parse_str};

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error reading the configuration file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML syntax or structure error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document is well-formed but invalid
    #[error("validation error: {0}")]
    Validation(String),

    /// A `custom` provider names no registered constructor
    #[error("unknown custom provider: {0}")]
    UnknownProvider(String),

    /// A declared service URL failed to build
    #[error("invalid service definition: {0}")]
    Service(#[from] service_discovery::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ConfigError>;
