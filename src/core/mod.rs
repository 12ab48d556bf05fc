//! Core data structures for extbuild.
//!
//! This module contains the foundational types used throughout extbuild:
//! - Extension descriptors and the ordered descriptor set
//! - The Extbuild.toml manifest
//! - Capability providers and build requirements
//! - The per-invocation environment

pub mod descriptor;
pub mod environment;
pub mod manifest;
pub mod provider;
pub mod requirement;

pub use descriptor::{Define, DescriptorSet, ExtensionDescriptor, Language};
pub use environment::EnvironmentContext;
pub use manifest::{Manifest, MANIFEST_NAME};
pub use provider::{Provider, ProviderInfo, ProviderRegistry};
pub use requirement::Requirement;
