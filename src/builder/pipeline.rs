//! The extension-list pipeline: declared descriptors, plus provider paths,
//! with sources resolved and parallel compute injected.

use anyhow::{Context, Result};

use crate::builder::features;
use crate::builder::probe::ToolchainState;
use crate::builder::sources;
use crate::builder::toolchain::ParallelFlags;
use crate::builder::translator::Translator;
use crate::core::descriptor::DescriptorSet;
use crate::core::environment::EnvironmentContext;
use crate::core::manifest::{Manifest, SourceForms};
use crate::core::provider::ProviderRegistry;

/// Build the declared descriptors and merge in what their providers report.
///
/// Provider output follows the descriptor's own include dirs, library dirs
/// and libraries.
pub fn assemble(
    manifest: &Manifest,
    env: &EnvironmentContext,
    registry: &ProviderRegistry,
) -> Result<DescriptorSet> {
    let mut set = DescriptorSet::new();

    for spec in &manifest.extensions {
        let mut ext = spec.to_descriptor(env)?;

        for name in &spec.providers {
            let info = registry.query(name, &spec.name)?;
            for dir in info.include_dirs {
                ext.add_include_dir(dir);
            }
            for dir in info.library_dirs {
                ext.add_library_dir(dir);
            }
            for lib in info.libraries {
                ext.add_library(lib);
            }
        }

        tracing::debug!("declared extension {}", ext.name);
        set.push(ext);
    }

    Ok(set)
}

/// Resolve source forms, then inject parallel compute.
pub fn run_pipeline(
    set: DescriptorSet,
    state: &ToolchainState,
    translator: &dyn Translator,
    flags: &ParallelFlags,
    forms: &SourceForms,
) -> Result<DescriptorSet> {
    let set = sources::resolve(set, state, translator, forms)?;
    Ok(features::inject(set, state, flags))
}

/// Produce the final extension list for a probed toolchain.
pub fn build_extensions(
    manifest: &Manifest,
    env: &EnvironmentContext,
    registry: &ProviderRegistry,
    state: &ToolchainState,
    translator: &dyn Translator,
    flags: &ParallelFlags,
) -> Result<DescriptorSet> {
    let set = assemble(manifest, env, registry).context("failed to assemble extension list")?;
    let set = run_pipeline(set, state, translator, flags, &manifest.sources)?;

    tracing::info!(
        "resolved {} extension(s) ({} sources, parallel compute {})",
        set.len(),
        if state.translator_available {
            "translated"
        } else {
            "pre-generated"
        },
        if state.parallel.supported { "on" } else { "off" }
    );
    Ok(set)
}
