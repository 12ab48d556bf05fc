//! Capability providers.
//!
//! A provider contributes include directories, library directories and
//! libraries to the descriptors that name it: a numeric-array library's
//! include path, a trajectory library's native include/lib directories, a
//! bundled header-only library. Providers are external; querying one may
//! run a program that is not installed, so queries happen only while the
//! extension list is being built, and each provider is queried at most once
//! per invocation.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::util::errors::ExtError;
use crate::util::process::ProcessBuilder;

/// What a provider contributes to a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderInfo {
    pub include_dirs: Vec<PathBuf>,
    pub library_dirs: Vec<PathBuf>,
    pub libraries: Vec<String>,
}

/// How to interpret a command provider's stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderOutput {
    /// A single include directory on the first non-empty line
    #[default]
    IncludeDir,
    /// A JSON object shaped like [`ProviderInfo`]
    Json,
}

/// A declared provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// Run an external command and parse its output.
    Command {
        argv: Vec<String>,
        output: ProviderOutput,
    },
    /// A header-only directory shipped with the project.
    Bundled { dir: PathBuf },
    /// Fixed values from the manifest.
    Static(ProviderInfo),
}

/// Registry of declared providers with a per-invocation cache.
#[derive(Debug)]
pub struct ProviderRegistry {
    root: PathBuf,
    providers: BTreeMap<String, Provider>,
    resolved: RefCell<BTreeMap<String, ProviderInfo>>,
    queries: Cell<usize>,
}

impl ProviderRegistry {
    /// Create a registry rooted at the project directory.
    pub fn new(root: impl Into<PathBuf>, providers: BTreeMap<String, Provider>) -> Self {
        ProviderRegistry {
            root: root.into(),
            providers,
            resolved: RefCell::new(BTreeMap::new()),
            queries: Cell::new(0),
        }
    }

    /// Whether a provider with this name is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Number of providers actually queried so far.
    pub fn query_count(&self) -> usize {
        self.queries.get()
    }

    /// Resolve a provider for the extension `requested_by`, querying it on
    /// first use.
    pub fn query(&self, name: &str, requested_by: &str) -> Result<ProviderInfo, ExtError> {
        if let Some(info) = self.resolved.borrow().get(name) {
            return Ok(info.clone());
        }

        let provider = self
            .providers
            .get(name)
            .ok_or_else(|| ExtError::UnknownProvider {
                extension: requested_by.to_string(),
                provider: name.to_string(),
            })?;

        self.queries.set(self.queries.get() + 1);
        let info = match provider {
            Provider::Command { argv, output } => run_command(&self.root, name, argv, *output)?,
            Provider::Bundled { dir } => bundled(&self.root, name, dir)?,
            Provider::Static(info) => info.clone(),
        };

        tracing::debug!(
            "provider `{}`: {} include dir(s), {} library dir(s), {} librar(ies)",
            name,
            info.include_dirs.len(),
            info.library_dirs.len(),
            info.libraries.len()
        );

        self.resolved
            .borrow_mut()
            .insert(name.to_string(), info.clone());
        Ok(info)
    }
}

fn run_command(
    root: &Path,
    name: &str,
    argv: &[String],
    output: ProviderOutput,
) -> Result<ProviderInfo, ExtError> {
    let failed = |message: String| ExtError::ProviderFailed {
        provider: name.to_string(),
        message,
    };
    let invalid = |message: String| ExtError::ProviderOutputInvalid {
        provider: name.to_string(),
        message,
    };

    let pb = ProcessBuilder::from_argv(argv)
        .ok_or_else(|| failed("empty command".to_string()))?
        .cwd(root);

    tracing::debug!("querying provider `{}`: {}", name, pb.display_command());
    let out = pb.exec_and_check().map_err(|e| failed(format!("{:#}", e)))?;
    let stdout = String::from_utf8_lossy(&out.stdout);

    match output {
        ProviderOutput::IncludeDir => {
            let dir = stdout
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .ok_or_else(|| invalid("command printed no include directory".to_string()))?;
            Ok(ProviderInfo {
                include_dirs: vec![PathBuf::from(dir)],
                ..ProviderInfo::default()
            })
        }
        ProviderOutput::Json => serde_json::from_str(stdout.trim())
            .map_err(|e| invalid(format!("invalid JSON output: {}", e))),
    }
}

fn bundled(root: &Path, name: &str, dir: &Path) -> Result<ProviderInfo, ExtError> {
    let path = root.join(dir);
    if !path.is_dir() {
        return Err(ExtError::MissingBundledDir {
            provider: name.to_string(),
            path,
        });
    }
    Ok(ProviderInfo {
        include_dirs: vec![path],
        ..ProviderInfo::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry(root: &Path, entries: Vec<(&str, Provider)>) -> ProviderRegistry {
        ProviderRegistry::new(
            root,
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_static_provider() {
        let info = ProviderInfo {
            include_dirs: vec![PathBuf::from("/opt/mdtraj/include")],
            library_dirs: vec![PathBuf::from("/opt/mdtraj/lib")],
            libraries: vec!["theobald".to_string()],
        };
        let reg = registry(Path::new("."), vec![("mdtraj", Provider::Static(info.clone()))]);
        assert_eq!(reg.query("mdtraj", "pkg._ext").unwrap(), info);
    }

    #[test]
    fn test_bundled_provider_requires_directory() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(
            tmp.path(),
            vec![(
                "pybind11",
                Provider::Bundled {
                    dir: PathBuf::from("pybind11/include"),
                },
            )],
        );

        let err = reg.query("pybind11", "pkg._ext").unwrap_err();
        assert!(matches!(err, ExtError::MissingBundledDir { .. }));

        std::fs::create_dir_all(tmp.path().join("pybind11/include")).unwrap();
        let info = reg.query("pybind11", "pkg._ext").unwrap();
        assert_eq!(info.include_dirs, vec![tmp.path().join("pybind11/include")]);
    }

    #[test]
    fn test_unknown_provider() {
        let reg = registry(Path::new("."), vec![]);
        assert!(matches!(
            reg.query("numpy", "pkg._ext"),
            Err(ExtError::UnknownProvider { .. })
        ));
        assert!(!reg.contains("numpy"));
    }

    #[test]
    fn test_missing_command_is_provider_failure() {
        let reg = registry(
            Path::new("."),
            vec![(
                "numpy",
                Provider::Command {
                    argv: vec!["extbuild-no-such-python".to_string()],
                    output: ProviderOutput::IncludeDir,
                },
            )],
        );
        let err = reg.query("numpy", "pkg._ext").unwrap_err();
        assert!(err.is_capability_absence());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_provider_is_cached() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(
            tmp.path(),
            vec![(
                "numpy",
                Provider::Command {
                    argv: vec!["echo".to_string(), "/opt/numpy/include".to_string()],
                    output: ProviderOutput::IncludeDir,
                },
            )],
        );

        let first = reg.query("numpy", "pkg._ext").unwrap();
        let second = reg.query("numpy", "pkg._ext").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.include_dirs, vec![PathBuf::from("/opt/numpy/include")]);
        assert_eq!(reg.query_count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_json_provider() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(
            tmp.path(),
            vec![(
                "mdtraj",
                Provider::Command {
                    argv: vec![
                        "echo".to_string(),
                        r#"{"include_dirs": ["/m/include"], "library_dirs": ["/m/lib"], "libraries": ["theobald"]}"#
                            .to_string(),
                    ],
                    output: ProviderOutput::Json,
                },
            )],
        );

        let info = reg.query("mdtraj", "pkg._ext").unwrap();
        assert_eq!(info.library_dirs, vec![PathBuf::from("/m/lib")]);
        assert_eq!(info.libraries, vec!["theobald"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unusable_output_is_not_absence() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(
            tmp.path(),
            vec![
                (
                    "mdtraj",
                    Provider::Command {
                        argv: vec!["echo".to_string(), "not json".to_string()],
                        output: ProviderOutput::Json,
                    },
                ),
                (
                    "numpy",
                    Provider::Command {
                        argv: vec!["true".to_string()],
                        output: ProviderOutput::IncludeDir,
                    },
                ),
            ],
        );

        for name in ["mdtraj", "numpy"] {
            let err = reg.query(name, "pkg._ext").unwrap_err();
            assert!(matches!(err, ExtError::ProviderOutputInvalid { .. }));
            assert!(!err.is_capability_absence());
        }
    }
}
