//! Provider implementations

mod aggregate;
mod fixed;
mod local;
mod mutable;

pub use aggregate::{AggregateDiscoveryProvider, AggregateRegistryProvider};
pub use fixed::StaticDiscoveryProvider;
pub use local::LocalRegistryAndDiscoveryProvider;
pub use mutable::{MutableDiscoveryProvider, MutableRegistryProvider};
