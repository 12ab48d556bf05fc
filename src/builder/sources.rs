//! Source-form resolution.
//!
//! An extension source exists in up to two forms: the intermediate form
//! fed to the translator (`.pyx`) and the generated lower-level form the
//! compiler consumes (`.c`). Either the translator is run and the
//! descriptor points at its output, or the descriptor is pointed at the
//! pre-generated sibling that ships with source archives.

use std::path::{Path, PathBuf};

use crate::builder::probe::ToolchainState;
use crate::builder::translator::Translator;
use crate::core::descriptor::{has_extension, DescriptorSet, Language};
use crate::core::manifest::SourceForms;
use crate::util::errors::ExtError;

/// Map an intermediate source to its generated sibling. C++ extensions
/// get the C++ generated suffix.
///
/// Paths with any other suffix are returned unchanged.
pub fn rewrite_to_generated(path: &Path, language: Language, forms: &SourceForms) -> PathBuf {
    if has_extension(path, &forms.intermediate) {
        path.with_extension(forms.generated_for(language))
    } else {
        path.to_path_buf()
    }
}

/// Point every descriptor at compilable sources.
///
/// With a translator, every intermediate source is translated first and a
/// translation failure is fatal. Without one, intermediate sources are
/// rewritten to their generated siblings; whether those exist is for the
/// compile step to find out.
pub fn resolve(
    mut set: DescriptorSet,
    state: &ToolchainState,
    translator: &dyn Translator,
    forms: &SourceForms,
) -> Result<DescriptorSet, ExtError> {
    if state.translator_available {
        translate_all(&set, translator, forms)?;
    } else {
        tracing::debug!(
            "translator unavailable; using pre-generated .{}/.{} sources",
            forms.generated,
            forms.generated_cxx
        );
    }

    for ext in set.iter_mut() {
        let language = ext.language;
        ext.sources = ext
            .sources
            .iter()
            .map(|s| rewrite_to_generated(s, language, forms))
            .collect();
    }
    Ok(set)
}

/// Translate every intermediate source of every descriptor.
///
/// Returns the generated paths in descriptor order.
pub fn translate_all(
    set: &DescriptorSet,
    translator: &dyn Translator,
    forms: &SourceForms,
) -> Result<Vec<PathBuf>, ExtError> {
    let mut generated = Vec::new();
    for ext in set {
        for source in &ext.sources {
            if !has_extension(source, &forms.intermediate) {
                continue;
            }
            let output = rewrite_to_generated(source, ext.language, forms);
            translator.translate(source, &output, ext.language)?;
            generated.push(output);
        }
    }
    Ok(generated)
}
