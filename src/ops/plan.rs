//! The JSON build plan consumed by the compile step.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::builder::probe::ToolchainState;
use crate::core::descriptor::{DescriptorSet, ExtensionDescriptor};
use crate::core::requirement::Requirement;
use crate::util::context::GlobalContext;
use crate::util::fs;
use crate::util::Config;

/// File name of the plan inside the plan directory.
pub const PLAN_FILE: &str = "extensions.json";

/// Resolved extension list plus the capabilities it was resolved against.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub package: String,
    /// Packages that must be installed before the compile step runs
    pub requires: Vec<Requirement>,
    pub toolchain: ToolchainState,
    pub extensions: DescriptorSet,
}

impl BuildPlan {
    pub fn new(
        package: impl Into<String>,
        toolchain: ToolchainState,
        extensions: &[ExtensionDescriptor],
    ) -> Self {
        BuildPlan {
            package: package.into(),
            requires: Vec::new(),
            toolchain,
            extensions: extensions.iter().cloned().collect(),
        }
    }

    /// Declare the build requirements.
    pub fn with_requires(mut self, requires: Vec<Requirement>) -> Self {
        self.requires = requires;
        self
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize build plan")
    }
}

/// Directory holding the plan: `[build] plan-dir` from config, relative to
/// the project root, or `.extbuild/plan`.
pub fn plan_dir(root: &Path, config: &Config) -> PathBuf {
    match &config.build.plan_dir {
        Some(dir) => root.join(dir),
        None => GlobalContext::project_dir(root).join("plan"),
    }
}

/// Default plan path for a project.
pub fn default_plan_path(root: &Path, config: &Config) -> PathBuf {
    plan_dir(root, config).join(PLAN_FILE)
}

/// Write the plan, creating parent directories.
pub fn write_plan(path: &Path, plan: &BuildPlan) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::ensure_dir(parent)?;
    }
    fs::write_string(path, &plan.to_json()?)?;
    tracing::debug!("wrote build plan to {}", path.display());
    Ok(())
}
