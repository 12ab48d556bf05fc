//! Bundled-library submodule initialisation for checkouts.

use std::path::Path;

use anyhow::{Context, Result};
use git2::Repository;

/// Initialise and update the named submodules of the repository at `root`,
/// like `git submodule update --init <name>`.
///
/// Failures are fatal: a bundled library that cannot be fetched would only
/// surface later as a missing include directory.
pub fn init_submodules(root: &Path, names: &[String]) -> Result<()> {
    if names.is_empty() {
        return Ok(());
    }

    let repo = Repository::open(root)
        .with_context(|| format!("failed to open git repository at {}", root.display()))?;

    for name in names {
        tracing::info!("Updating submodule {}", name);
        let mut submodule = repo
            .find_submodule(name)
            .with_context(|| format!("submodule `{}` is not declared in .gitmodules", name))?;
        submodule
            .update(true, None)
            .with_context(|| format!("failed to update submodule `{}`", name))?;
    }

    Ok(())
}
