//! Extension-list construction.
//!
//! This module probes the toolchain, resolves source forms, injects the
//! parallel-compute flags and defers the whole pipeline until the list is
//! read.

pub mod features;
pub mod lazy;
pub mod pipeline;
pub mod probe;
pub mod sources;
pub mod toolchain;
pub mod translator;

pub use lazy::{ExtModules, LazyExtensions, LazyList};
pub use probe::{ParallelSupport, ProbeSettings, ToolchainState};
pub use toolchain::{
    detect_toolchain, CommandSpec, GccToolchain, MsvcToolchain, ParallelFlags, Toolchain,
    ToolchainPlatform,
};
pub use translator::{CythonTranslator, Translator};
