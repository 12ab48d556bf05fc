//! Build requirements such as `numpy>=1.7.0` or `cython>=0.22`.
//!
//! Requirements are written in the packaging ecosystem's notation and parsed
//! into a [`semver::VersionReq`] so detected tool versions can be checked.

use std::fmt;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

/// A named requirement with an optional version constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Requirement {
    name: String,
    spec: String,
    version: Option<VersionReq>,
}

impl Requirement {
    /// The distribution name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The version constraint as written (e.g. `>=1.7.0,<2`).
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// Check whether a version satisfies this requirement.
    ///
    /// Requirements without a constraint accept any version.
    pub fn matches(&self, version: &Version) -> bool {
        self.version.as_ref().map_or(true, |req| req.matches(version))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.spec)
    }
}

impl std::str::FromStr for Requirement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| matches!(c, '<' | '>' | '=' | '!' | '~'))
            .unwrap_or(s.len());
        let (name, spec) = s.split_at(split);
        let name = name.trim();
        let spec = spec.trim();

        let valid_name = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid_name {
            return Err(format!("invalid requirement '{}': missing package name", s));
        }

        let version = if spec.is_empty() {
            None
        } else {
            Some(parse_constraint(spec).map_err(|e| format!("invalid requirement '{}': {}", s, e))?)
        };

        Ok(Requirement {
            name: name.to_string(),
            spec: spec.to_string(),
            version,
        })
    }
}

impl TryFrom<String> for Requirement {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Requirement> for String {
    fn from(req: Requirement) -> String {
        req.to_string()
    }
}

/// Translate a comma-separated constraint list into semver syntax.
fn parse_constraint(spec: &str) -> Result<VersionReq, String> {
    let mut comparators = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.starts_with("!=") || part.starts_with("~=") || part.starts_with("===") {
            return Err(format!("unsupported operator in '{}'", part));
        }
        // Exact pins use `==` in requirement notation and `=` in semver
        let part = match part.strip_prefix("==") {
            Some(rest) => format!("={}", rest.trim()),
            None => part.to_string(),
        };
        comparators.push(part);
    }
    VersionReq::parse(&comparators.join(", ")).map_err(|e| e.to_string())
}
