//! Global context for extbuild operations.
//!
//! Provides centralized access to configuration and paths.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::manifest::MANIFEST_NAME;
use crate::util::config::{
    global_config_dir, load_config, load_toolchain_config, Config, ToolchainConfig,
};
use crate::util::errors::ExtError;

/// Name of the project-local state directory.
pub const PROJECT_DIR_NAME: &str = ".extbuild";

/// Global context containing configuration paths and the working directory.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global extbuild settings (~/.extbuild/)
    home: PathBuf,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = global_config_dir().unwrap_or_else(|| PathBuf::from(PROJECT_DIR_NAME));

        Ok(GlobalContext { cwd, home })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the extbuild home directory (~/.extbuild/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Get the global toolchain configuration file path.
    pub fn toolchain_config_path(&self) -> PathBuf {
        self.home.join("toolchain.toml")
    }

    /// Get the project-local extbuild directory.
    pub fn project_dir(root: &Path) -> PathBuf {
        root.join(PROJECT_DIR_NAME)
    }

    /// Load the merged global + project configuration.
    pub fn load_config(&self, root: &Path) -> Config {
        load_config(
            &self.config_path(),
            &Self::project_dir(root).join("config.toml"),
        )
    }

    /// Load the merged global + project toolchain configuration.
    pub fn load_toolchain_config(&self, root: &Path) -> ToolchainConfig {
        load_toolchain_config(
            &self.toolchain_config_path(),
            &Self::project_dir(root).join("toolchain.toml"),
        )
    }

    /// Find `Extbuild.toml` starting from cwd and searching upward.
    pub fn find_manifest(&self) -> Result<PathBuf, ExtError> {
        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(MANIFEST_NAME);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !current.pop() {
                return Err(ExtError::ManifestNotFound {
                    dir: self.cwd.clone(),
                });
            }
        }
    }

    /// Find the project root (directory containing Extbuild.toml).
    pub fn find_project_root(&self) -> Result<PathBuf, ExtError> {
        let manifest = self.find_manifest()?;
        Ok(manifest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.cwd.clone()))
    }
}
