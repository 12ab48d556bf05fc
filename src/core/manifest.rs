//! Extbuild.toml manifest parsing and schema.
//!
//! The manifest declares the package, its extension modules, the capability
//! providers those extensions consume, the translator, and the base
//! packaging commands that the command overrides wrap.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::descriptor::{Define, ExtensionDescriptor, Language};
use crate::core::environment::EnvironmentContext;
use crate::core::provider::{Provider, ProviderInfo, ProviderOutput, ProviderRegistry};
use crate::core::requirement::Requirement;

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "Extbuild.toml";

/// The parsed and validated Extbuild.toml manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Package metadata
    pub package: PackageMetadata,

    /// Requirements declared for building (not for metadata-only runs)
    pub build_requires: Vec<Requirement>,

    /// Translator configuration
    pub translator: TranslatorSpec,

    /// Intermediate and generated source suffixes
    pub sources: SourceForms,

    /// Version-control settings
    pub vcs: VcsSpec,

    /// Declared capability providers, by name
    pub providers: BTreeMap<String, Provider>,

    /// Extension declarations, in build order
    pub extensions: Vec<ExtensionSpec>,

    /// Base packaging commands
    pub commands: CommandsSpec,

    /// The directory containing this manifest
    pub manifest_dir: PathBuf,
}

/// Package metadata from the [package] section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Package name
    pub name: String,

    /// Package version (informational, derived elsewhere)
    #[serde(default)]
    pub version: Option<String>,

    /// Root namespace, the default test-runner argument
    #[serde(default)]
    pub namespace: Option<String>,
}

impl PackageMetadata {
    /// The namespace tests run against by default.
    pub fn test_namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(&self.name)
    }
}

/// Translator settings from the [translator] section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TranslatorSpec {
    /// Program name or path
    #[serde(default = "default_translator")]
    pub program: String,

    /// Minimum acceptable translator version, e.g. `cython>=0.22`
    #[serde(default)]
    pub requirement: Option<Requirement>,

    /// Extra arguments for every translation
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_translator() -> String {
    "cython".to_string()
}

impl Default for TranslatorSpec {
    fn default() -> Self {
        TranslatorSpec {
            program: default_translator(),
            requirement: None,
            args: Vec::new(),
        }
    }
}

/// File suffixes of the two source forms, without the leading dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceForms {
    /// Suffix of translator input (e.g. `pyx`)
    #[serde(default = "default_intermediate")]
    pub intermediate: String,

    /// Suffix of pre-generated lower-level source (e.g. `c`)
    #[serde(default = "default_generated")]
    pub generated: String,

    /// Suffix of pre-generated source for C++ extensions (e.g. `cpp`)
    #[serde(default = "default_generated_cxx", rename = "generated-cxx")]
    pub generated_cxx: String,
}

impl SourceForms {
    /// Generated suffix for an extension of the given language.
    pub fn generated_for(&self, language: Language) -> &str {
        match language {
            Language::Cxx => &self.generated_cxx,
            Language::Default => &self.generated,
        }
    }
}

fn default_intermediate() -> String {
    "pyx".to_string()
}

fn default_generated() -> String {
    "c".to_string()
}

fn default_generated_cxx() -> String {
    "cpp".to_string()
}

impl Default for SourceForms {
    fn default() -> Self {
        SourceForms {
            intermediate: default_intermediate(),
            generated: default_generated(),
            generated_cxx: default_generated_cxx(),
        }
    }
}

/// Version-control settings from the [vcs] section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VcsSpec {
    /// Marker directory whose presence means "checkout"
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Submodules holding bundled libraries, initialised on checkouts
    #[serde(default)]
    pub submodules: Vec<String>,
}

fn default_marker() -> String {
    ".git".to_string()
}

impl Default for VcsSpec {
    fn default() -> Self {
        VcsSpec {
            marker: default_marker(),
            submodules: Vec::new(),
        }
    }
}

/// Base packaging commands from the [commands] section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CommandsSpec {
    /// Base archive-build command
    #[serde(default)]
    pub sdist: Option<Vec<String>>,

    /// Base install command
    #[serde(default)]
    pub install: Option<Vec<String>>,

    /// External test-runner entry point
    #[serde(default = "default_test_runner")]
    pub test_runner: Vec<String>,
}

fn default_test_runner() -> Vec<String> {
    vec!["python".to_string(), "-m".to_string(), "pytest".to_string()]
}

impl Default for CommandsSpec {
    fn default() -> Self {
        CommandsSpec {
            sdist: None,
            install: None,
            test_runner: default_test_runner(),
        }
    }
}

/// One `[[extension]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ExtensionSpec {
    pub name: String,
    pub sources: Vec<PathBuf>,
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub libraries: Vec<String>,
    /// Prefix `libraries` with `lib` when building on Windows
    #[serde(default)]
    pub lib_prefix_on_windows: bool,
    #[serde(default)]
    pub library_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub extra_compile_args: Vec<String>,
    #[serde(default)]
    pub extra_link_args: Vec<String>,
    #[serde(default)]
    pub defines: Vec<String>,
    /// Capability providers consumed, in order
    #[serde(default)]
    pub providers: Vec<String>,
}

impl ExtensionSpec {
    /// Build the descriptor from the declaration alone, without providers.
    pub fn to_descriptor(&self, env: &EnvironmentContext) -> Result<ExtensionDescriptor> {
        let mut ext = ExtensionDescriptor::new(&self.name, self.sources.iter().cloned())
            .with_language(self.language);

        for dir in &self.include_dirs {
            ext.add_include_dir(dir);
        }
        for lib in &self.libraries {
            if self.lib_prefix_on_windows && env.is_windows() {
                ext.add_library(format!("lib{}", lib));
            } else {
                ext.add_library(lib);
            }
        }
        for dir in &self.library_dirs {
            ext.add_library_dir(dir);
        }
        ext.extra_compile_args = self.extra_compile_args.clone();
        ext.extra_link_args = self.extra_link_args.clone();
        for raw in &self.defines {
            let define: Define = raw
                .parse()
                .map_err(|e: String| anyhow::anyhow!("extension `{}`: {}", self.name, e))?;
            ext.add_define(define);
        }

        Ok(ext)
    }
}

/// Provider declaration as written in `[providers.<name>]`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawProvider {
    command: Option<Vec<String>>,
    output: Option<ProviderOutput>,
    bundled: Option<PathBuf>,
    #[serde(default)]
    include_dirs: Vec<PathBuf>,
    #[serde(default)]
    library_dirs: Vec<PathBuf>,
    #[serde(default)]
    libraries: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuild {
    #[serde(default)]
    requires: Vec<Requirement>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    package: PackageMetadata,
    #[serde(default)]
    build: RawBuild,
    #[serde(default)]
    translator: TranslatorSpec,
    #[serde(default)]
    sources: SourceForms,
    #[serde(default)]
    vcs: VcsSpec,
    #[serde(default)]
    providers: BTreeMap<String, RawProvider>,
    #[serde(default, rename = "extension")]
    extensions: Vec<ExtensionSpec>,
    #[serde(default)]
    commands: CommandsSpec,
}

impl Manifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        Self::parse(&content, path)
    }

    /// Parse manifest content.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawManifest = toml::from_str(content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let manifest_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        if raw.package.name.trim().is_empty() {
            bail!("manifest at {}: package name is empty", path.display());
        }

        let mut providers = BTreeMap::new();
        for (name, raw_provider) in raw.providers {
            let provider = Self::convert_provider(&name, raw_provider)?;
            providers.insert(name, provider);
        }

        Self::validate_extensions(&raw.extensions, &providers, &raw.sources)?;

        Ok(Manifest {
            package: raw.package,
            build_requires: raw.build.requires,
            translator: raw.translator,
            sources: raw.sources,
            vcs: raw.vcs,
            providers,
            extensions: raw.extensions,
            commands: raw.commands,
            manifest_dir,
        })
    }

    /// Create the provider registry for one invocation.
    pub fn provider_registry(&self) -> ProviderRegistry {
        ProviderRegistry::new(self.manifest_dir.clone(), self.providers.clone())
    }

    fn convert_provider(name: &str, raw: RawProvider) -> Result<Provider> {
        let has_static =
            !raw.include_dirs.is_empty() || !raw.library_dirs.is_empty() || !raw.libraries.is_empty();

        match (raw.command, raw.bundled) {
            (Some(_), Some(_)) => {
                bail!("provider `{}`: `command` and `bundled` are mutually exclusive", name)
            }
            (Some(argv), None) => {
                if argv.is_empty() {
                    bail!("provider `{}`: `command` must not be empty", name);
                }
                if has_static {
                    bail!(
                        "provider `{}`: a command provider takes its paths from the command output",
                        name
                    );
                }
                Ok(Provider::Command {
                    argv,
                    output: raw.output.unwrap_or_default(),
                })
            }
            (None, Some(dir)) => {
                if has_static || raw.output.is_some() {
                    bail!("provider `{}`: a bundled provider only takes `bundled`", name);
                }
                Ok(Provider::Bundled { dir })
            }
            (None, None) => {
                if raw.output.is_some() {
                    bail!("provider `{}`: `output` requires `command`", name);
                }
                Ok(Provider::Static(ProviderInfo {
                    include_dirs: raw.include_dirs,
                    library_dirs: raw.library_dirs,
                    libraries: raw.libraries,
                }))
            }
        }
    }

    fn validate_extensions(
        extensions: &[ExtensionSpec],
        providers: &BTreeMap<String, Provider>,
        forms: &SourceForms,
    ) -> Result<()> {
        for generated in [&forms.generated, &forms.generated_cxx] {
            if forms.intermediate.is_empty()
                || generated.is_empty()
                || forms.intermediate == *generated
            {
                bail!(
                    "[sources]: intermediate (`{}`) and generated (`{}`) suffixes must be distinct and non-empty",
                    forms.intermediate,
                    generated
                );
            }
        }

        let mut seen = BTreeSet::new();
        for ext in extensions {
            if ext.name.trim().is_empty() {
                bail!("extension with empty name");
            }
            if !seen.insert(ext.name.as_str()) {
                bail!("extension `{}` is declared more than once", ext.name);
            }
            if ext.sources.is_empty() {
                bail!("extension `{}` has no sources", ext.name);
            }
            for provider in &ext.providers {
                if !providers.contains_key(provider) {
                    return Err(crate::util::errors::ExtError::UnknownProvider {
                        extension: ext.name.clone(),
                        provider: provider.clone(),
                    }
                    .into());
                }
            }
            for raw in &ext.defines {
                raw.parse::<Define>()
                    .map_err(|e| anyhow::anyhow!("extension `{}`: {}", ext.name, e))?;
            }
        }
        Ok(())
    }
}
