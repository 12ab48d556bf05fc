//! Configuration file support for extbuild.
//!
//! extbuild supports two configuration file locations:
//! - Global: `~/.extbuild/config.toml` - User-wide defaults
//! - Project: `.extbuild/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.
//!
//! Toolchain overrides are stored separately:
//! - Global: `~/.extbuild/toolchain.toml`
//! - Project: `.extbuild/toolchain.toml`

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// extbuild configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,
}

/// Whether an optional capability may be used when it is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSwitch {
    /// Use the capability if the probe finds it
    #[default]
    Auto,
    /// Never use the capability, skip probing
    Off,
}

impl FeatureSwitch {
    pub fn is_off(self) -> bool {
        self == FeatureSwitch::Off
    }
}

impl fmt::Display for FeatureSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureSwitch::Auto => write!(f, "auto"),
            FeatureSwitch::Off => write!(f, "off"),
        }
    }
}

impl std::str::FromStr for FeatureSwitch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(FeatureSwitch::Auto),
            "off" => Ok(FeatureSwitch::Off),
            _ => Err(format!(
                "invalid feature switch '{}'; expected 'auto' or 'off'",
                s
            )),
        }
    }
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Translator usage (auto, off)
    pub translator: Option<FeatureSwitch>,

    /// Parallel-compute support (auto, off)
    pub parallel: Option<FeatureSwitch>,

    /// Where `extbuild build` writes the plan, relative to the project root
    pub plan_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.translator.is_some() {
            self.build.translator = other.build.translator;
        }
        if other.build.parallel.is_some() {
            self.build.parallel = other.build.parallel;
        }
        if other.build.plan_dir.is_some() {
            self.build.plan_dir = other.build.plan_dir;
        }
    }

    /// Effective translator switch.
    pub fn translator(&self) -> FeatureSwitch {
        self.build.translator.unwrap_or_default()
    }

    /// Effective parallel-compute switch.
    pub fn parallel(&self) -> FeatureSwitch {
        self.build.parallel.unwrap_or_default()
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.extbuild/config.toml)
/// 2. Global config (~/.extbuild/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Toolchain configuration for compiler overrides.
///
/// Stored in a separate file (`toolchain.toml`) so switching compilers
/// does not touch other settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Toolchain settings
    pub toolchain: ToolchainSettings,
}

/// Compiler used by the parallel-compute probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Path to the C compiler (e.g., /usr/bin/clang)
    pub cc: Option<PathBuf>,

    /// Additional compiler flags passed to the probe
    pub cflags: Vec<String>,

    /// Additional linker flags passed to the probe
    pub ldflags: Vec<String>,
}

impl ToolchainConfig {
    /// Load toolchain configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read toolchain config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse toolchain config: {}", path.display()))
    }

    /// Load toolchain configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!(
                    "Failed to load toolchain config from {}: {:#}",
                    path.display(),
                    e
                );
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: ToolchainConfig) {
        if other.toolchain.cc.is_some() {
            self.toolchain.cc = other.toolchain.cc;
        }
        if !other.toolchain.cflags.is_empty() {
            self.toolchain.cflags = other.toolchain.cflags;
        }
        if !other.toolchain.ldflags.is_empty() {
            self.toolchain.ldflags = other.toolchain.ldflags;
        }
    }
}

/// Load merged toolchain configuration from global and project locations.
pub fn load_toolchain_config(global_path: &Path, project_path: &Path) -> ToolchainConfig {
    let mut config = ToolchainConfig::default();

    if global_path.exists() {
        config.merge(ToolchainConfig::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(ToolchainConfig::load_or_default(project_path));
    }

    config
}

/// Get the global extbuild config directory (~/.extbuild).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".extbuild"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.translator(), FeatureSwitch::Auto);
        assert_eq!(config.parallel(), FeatureSwitch::Auto);
        assert!(config.build.plan_dir.is_none());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[build]
translator = "off"
parallel = "auto"
plan-dir = "out/plan"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.translator(), FeatureSwitch::Off);
        assert_eq!(config.parallel(), FeatureSwitch::Auto);
        assert_eq!(config.build.plan_dir, Some(PathBuf::from("out/plan")));
    }

    #[test]
    fn test_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(&global_path, "[build]\ntranslator = \"off\"\nparallel = \"off\"\n")
            .unwrap();
        std::fs::write(&project_path, "[build]\nparallel = \"auto\"\n").unwrap();

        let config = load_config(&global_path, &project_path);

        // Global translator survives, project parallel wins
        assert_eq!(config.translator(), FeatureSwitch::Off);
        assert_eq!(config.parallel(), FeatureSwitch::Auto);
    }

    #[test]
    fn test_invalid_config_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[build]\nparallel = \"sometimes\"\n").unwrap();

        let config = Config::load_or_default(&path);
        assert_eq!(config.parallel(), FeatureSwitch::Auto);
    }

    #[test]
    fn test_feature_switch_parse() {
        assert_eq!("OFF".parse::<FeatureSwitch>(), Ok(FeatureSwitch::Off));
        assert_eq!("auto".parse::<FeatureSwitch>(), Ok(FeatureSwitch::Auto));
        assert!("on".parse::<FeatureSwitch>().is_err());
    }

    #[test]
    fn test_toolchain_config_merge() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            "[toolchain]\ncc = \"/usr/bin/gcc\"\ncflags = [\"-O2\"]\n",
        )
        .unwrap();
        std::fs::write(&project_path, "[toolchain]\ncc = \"/usr/bin/clang\"\n").unwrap();

        let config = load_toolchain_config(&global_path, &project_path);
        assert_eq!(config.toolchain.cc, Some(PathBuf::from("/usr/bin/clang")));
        assert_eq!(config.toolchain.cflags, vec!["-O2"]);
        assert!(config.toolchain.ldflags.is_empty());
    }
}
