//! extbuild - conditional build orchestration for native extension modules
//!
//! This crate decides which extension modules a package builds, from which
//! source form, and with which optional compiler features, and wraps the
//! packaging commands whose behaviour depends on the build environment.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

pub use crate::core::{
    descriptor::{DescriptorSet, ExtensionDescriptor},
    environment::EnvironmentContext,
    manifest::Manifest,
};

pub use builder::probe::ToolchainState;
pub use ops::session::Session;
pub use util::context::GlobalContext;
