//! Command implementations

pub mod build;
pub mod clean;
pub mod completions;
pub mod install;
pub mod probe;
pub mod sdist;
