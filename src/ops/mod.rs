//! High-level operations.
//!
//! This module contains the invocation session and the packaging command
//! overrides used by the `extbuild` commands.

pub mod commands;
pub mod invocation;
pub mod plan;
pub mod session;
pub mod submodules;

pub use commands::{
    archive_build, around, delegate, install, test_run, CommandRun, CommandState, HookOutcome,
    Outcome,
};
pub use invocation::{classify, InvocationKind};
pub use plan::{default_plan_path, write_plan, BuildPlan};
pub use session::Session;
