//! Source translators (intermediate source to compilable C/C++).
//!
//! The translator is an external tool. Detection locates it on `PATH`,
//! reads its version and checks it against the manifest's minimum
//! requirement; a missing or too-old translator is reported as
//! [`ExtError::TranslatorUnavailable`] so callers can fall back to the
//! pre-generated sources.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

use crate::core::descriptor::Language;
use crate::core::manifest::TranslatorSpec;
use crate::core::requirement::Requirement;
use crate::util::errors::ExtError;
use crate::util::process::ProcessBuilder;

/// A detected translator installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorInfo {
    /// Resolved program path
    pub path: PathBuf,
    /// Reported version, when it could be parsed
    pub version: Option<Version>,
}

/// An external source translator.
pub trait Translator {
    /// Program name, for messages.
    fn program(&self) -> &str;

    /// Locate the translator and check that it is usable.
    fn detect(&self) -> Result<TranslatorInfo, ExtError>;

    /// Translate `input` into `output`.
    fn translate(&self, input: &Path, output: &Path, language: Language) -> Result<(), ExtError>;
}

/// Cython-style translator: `<program> [args] [--cplus] <input> -o <output>`.
#[derive(Debug, Clone)]
pub struct CythonTranslator {
    program: String,
    requirement: Option<Requirement>,
    args: Vec<String>,
    cwd: PathBuf,
}

impl CythonTranslator {
    /// Create a translator that runs from the project root.
    pub fn new(spec: &TranslatorSpec, root: &Path) -> Self {
        CythonTranslator {
            program: spec.program.clone(),
            requirement: spec.requirement.clone(),
            args: spec.args.clone(),
            cwd: root.to_path_buf(),
        }
    }

    fn unavailable(&self, reason: impl Into<String>) -> ExtError {
        ExtError::TranslatorUnavailable {
            program: self.program.clone(),
            reason: reason.into(),
        }
    }
}

impl Translator for CythonTranslator {
    fn program(&self) -> &str {
        &self.program
    }

    fn detect(&self) -> Result<TranslatorInfo, ExtError> {
        let path = which::which(&self.program)
            .map_err(|_| self.unavailable("not found on PATH"))?;

        let output = ProcessBuilder::new(&path)
            .arg("--version")
            .exec()
            .map_err(|e| self.unavailable(format!("{:#}", e)))?;
        if !output.status.success() {
            return Err(self.unavailable("`--version` exited with an error"));
        }

        // Older releases print the version on stderr
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let version = parse_version(&text);

        if let Some(req) = &self.requirement {
            match &version {
                Some(v) if !req.matches(v) => {
                    return Err(self.unavailable(format!(
                        "version {} does not satisfy `{}`",
                        v, req
                    )));
                }
                Some(_) => {}
                None => {
                    tracing::debug!(
                        "could not read a version from `{} --version`; assuming it satisfies `{}`",
                        self.program,
                        req
                    );
                }
            }
        }

        tracing::debug!(
            "found translator {} ({})",
            path.display(),
            version
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unknown version".to_string())
        );

        Ok(TranslatorInfo { path, version })
    }

    fn translate(&self, input: &Path, output: &Path, language: Language) -> Result<(), ExtError> {
        let mut pb = ProcessBuilder::new(&self.program)
            .args(&self.args)
            .cwd(&self.cwd);
        if language == Language::Cxx {
            pb = pb.arg("--cplus");
        }
        pb = pb.arg(input).arg("-o").arg(output);

        tracing::info!("translating {}", input.display());
        pb.exec_and_check()
            .map_err(|e| ExtError::TranslationFailed {
                input: input.to_path_buf(),
                message: format!("{:#}", e),
            })?;
        Ok(())
    }
}

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("valid version regex"));

/// Extract the first `major.minor[.patch]` version from tool output.
pub fn parse_version(text: &str) -> Option<Version> {
    let caps = VERSION_RE.captures(text)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    let patch = caps
        .get(3)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    Some(Version::new(major, minor, patch))
}
