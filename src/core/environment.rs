//! Build environment facts used for branching.
//!
//! Marker-directory checks and host detection happen once, here, and are
//! passed around as an explicit [`EnvironmentContext`] value so the resolver
//! and command overrides can be exercised without a real checkout.

use std::path::{Path, PathBuf};

/// Environment of one build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentContext {
    root: PathBuf,
    checkout: bool,
    os: String,
}

impl EnvironmentContext {
    /// Inspect the project root for the version-control marker.
    pub fn detect(root: &Path, vcs_marker: &str) -> Self {
        let checkout = root.join(vcs_marker).exists();
        tracing::debug!(
            "project root {} ({})",
            root.display(),
            if checkout {
                "version-control checkout"
            } else {
                "source archive"
            }
        );
        EnvironmentContext {
            root: root.to_path_buf(),
            checkout,
            os: std::env::consts::OS.to_string(),
        }
    }

    /// Construct an environment from explicit facts.
    pub fn new(root: impl Into<PathBuf>, checkout: bool, os: impl Into<String>) -> Self {
        EnvironmentContext {
            root: root.into(),
            checkout,
            os: os.into(),
        }
    }

    /// The project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the project is a version-control checkout.
    pub fn is_checkout(&self) -> bool {
        self.checkout
    }

    /// Host operating system (`std::env::consts::OS` naming).
    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_checkout() {
        let tmp = TempDir::new().unwrap();
        assert!(!EnvironmentContext::detect(tmp.path(), ".git").is_checkout());

        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        let env = EnvironmentContext::detect(tmp.path(), ".git");
        assert!(env.is_checkout());
        assert_eq!(env.root(), tmp.path());
    }

    #[test]
    fn test_custom_marker() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join(".hg")).unwrap();
        assert!(EnvironmentContext::detect(tmp.path(), ".hg").is_checkout());
        assert!(!EnvironmentContext::detect(tmp.path(), ".git").is_checkout());
    }

    #[test]
    fn test_explicit_windows() {
        let env = EnvironmentContext::new("/src", false, "windows");
        assert!(env.is_windows());
        assert!(!EnvironmentContext::new("/src", false, "linux").is_windows());
    }
}
