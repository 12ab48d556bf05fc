//! Shared utilities

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod errors;
pub mod fs;
pub mod process;

pub use config::{Config, FeatureSwitch, ToolchainConfig};
pub use context::GlobalContext;
pub use diagnostic::Diagnostic;
pub use errors::ExtError;
