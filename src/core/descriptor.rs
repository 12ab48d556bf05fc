//! Extension descriptors - what gets built.
//!
//! An [`ExtensionDescriptor`] is the build specification of one native
//! extension module. A [`DescriptorSet`] is the ordered list handed to the
//! compile step.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Source language of an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    /// Derived by the compiler from the source suffix
    #[default]
    #[serde(rename = "default")]
    Default,
    /// C++
    #[serde(rename = "c++", alias = "cpp", alias = "cxx")]
    Cxx,
}

impl Language {
    /// Get the language name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Default => "default",
            Language::Cxx => "c++",
        }
    }
}

/// A preprocessor define: `NAME` or `NAME=VALUE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    /// A define without a value (`-DNAME`).
    pub fn flag(name: impl Into<String>) -> Self {
        Define {
            name: name.into(),
            value: None,
        }
    }

    /// A define with a value (`-DNAME=VALUE`).
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Define {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl fmt::Display for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => write!(f, "{}", self.name),
        }
    }
}

impl std::str::FromStr for Define {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = match s.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim().to_string())),
            None => (s.trim(), None),
        };
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(format!("invalid define '{}'; expected NAME or NAME=VALUE", s));
        }
        Ok(Define {
            name: name.to_string(),
            value,
        })
    }
}

/// Build specification for one native extension module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDescriptor {
    /// Fully qualified module name (e.g. `pkg._ext.fast`)
    pub name: String,
    /// Source files, relative to the project root
    pub sources: Vec<PathBuf>,
    /// Include directories
    pub include_dirs: Vec<PathBuf>,
    /// Source language
    pub language: Language,
    /// Libraries to link (without -l prefix)
    pub libraries: Vec<String>,
    /// Library search paths
    pub library_dirs: Vec<PathBuf>,
    /// Extra compiler arguments
    pub extra_compile_args: Vec<String>,
    /// Extra linker arguments
    pub extra_link_args: Vec<String>,
    /// Preprocessor defines
    pub defines: Vec<Define>,
}

impl ExtensionDescriptor {
    /// Create a descriptor with the given name and sources.
    pub fn new(name: impl Into<String>, sources: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        ExtensionDescriptor {
            name: name.into(),
            sources: sources.into_iter().map(Into::into).collect(),
            include_dirs: Vec::new(),
            language: Language::Default,
            libraries: Vec::new(),
            library_dirs: Vec::new(),
            extra_compile_args: Vec::new(),
            extra_link_args: Vec::new(),
            defines: Vec::new(),
        }
    }

    /// Set the language.
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Add an include directory unless already present.
    pub fn add_include_dir(&mut self, dir: impl Into<PathBuf>) {
        push_unique(&mut self.include_dirs, dir.into());
    }

    /// Add a library search directory unless already present.
    pub fn add_library_dir(&mut self, dir: impl Into<PathBuf>) {
        push_unique(&mut self.library_dirs, dir.into());
    }

    /// Add a library unless already present.
    pub fn add_library(&mut self, lib: impl Into<String>) {
        push_unique(&mut self.libraries, lib.into());
    }

    /// Append a compiler argument unless already present.
    ///
    /// Returns `true` if the argument was added.
    pub fn add_compile_arg_once(&mut self, arg: &str) -> bool {
        push_unique(&mut self.extra_compile_args, arg.to_string())
    }

    /// Append a linker argument unless already present.
    ///
    /// Returns `true` if the argument was added.
    pub fn add_link_arg_once(&mut self, arg: &str) -> bool {
        push_unique(&mut self.extra_link_args, arg.to_string())
    }

    /// Add a define unless an identical one is present.
    pub fn add_define(&mut self, define: Define) -> bool {
        push_unique(&mut self.defines, define)
    }

    /// Check whether any source has the given extension (without the dot).
    pub fn has_sources_with_extension(&self, extension: &str) -> bool {
        self.sources.iter().any(|s| has_extension(s, extension))
    }
}

/// Check a path's extension without allocating.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) -> bool {
    if items.contains(&item) {
        false
    } else {
        items.push(item);
        true
    }
}

/// An ordered set of extension descriptors.
///
/// Order is manifest order; it only matters for reproducible output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptorSet {
    descriptors: Vec<ExtensionDescriptor>,
}

impl DescriptorSet {
    /// Create an empty set.
    pub fn new() -> Self {
        DescriptorSet::default()
    }

    /// Append a descriptor.
    pub fn push(&mut self, descriptor: ExtensionDescriptor) {
        self.descriptors.push(descriptor);
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Iterate over descriptors.
    pub fn iter(&self) -> std::slice::Iter<'_, ExtensionDescriptor> {
        self.descriptors.iter()
    }

    /// Iterate mutably over descriptors.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ExtensionDescriptor> {
        self.descriptors.iter_mut()
    }

    /// Find a descriptor by name.
    pub fn get(&self, name: &str) -> Option<&ExtensionDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Descriptor names in order.
    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    /// Borrow as a slice.
    pub fn as_slice(&self) -> &[ExtensionDescriptor] {
        &self.descriptors
    }

    /// Consume into the underlying vector.
    pub fn into_vec(self) -> Vec<ExtensionDescriptor> {
        self.descriptors
    }
}

impl From<Vec<ExtensionDescriptor>> for DescriptorSet {
    fn from(descriptors: Vec<ExtensionDescriptor>) -> Self {
        DescriptorSet { descriptors }
    }
}

impl FromIterator<ExtensionDescriptor> for DescriptorSet {
    fn from_iter<I: IntoIterator<Item = ExtensionDescriptor>>(iter: I) -> Self {
        DescriptorSet {
            descriptors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for DescriptorSet {
    type Item = ExtensionDescriptor;
    type IntoIter = std::vec::IntoIter<ExtensionDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.into_iter()
    }
}

impl<'a> IntoIterator for &'a DescriptorSet {
    type Item = &'a ExtensionDescriptor;
    type IntoIter = std::slice::Iter<'a, ExtensionDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}
