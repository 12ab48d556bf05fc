//! Parallel-compute feature injection.

use crate::builder::probe::ToolchainState;
use crate::builder::toolchain::ParallelFlags;
use crate::core::descriptor::{Define, DescriptorSet};

/// Enable parallel compute on every descriptor when the toolchain supports it.
///
/// Each descriptor gets the compiler flag, the runtime link flag when the
/// runtime must be linked explicitly, and the parallel define. Applying this
/// twice leaves the set unchanged. Unsupported toolchains get the set back
/// untouched.
pub fn inject(mut set: DescriptorSet, state: &ToolchainState, flags: &ParallelFlags) -> DescriptorSet {
    if !state.parallel.supported {
        return set;
    }

    for ext in set.iter_mut() {
        ext.add_compile_arg_once(&flags.compile);
        if state.parallel.needs_runtime_link {
            if let Some(link) = &flags.link {
                ext.add_link_arg_once(link);
            }
        }
        ext.add_define(Define::flag(&flags.define));
    }

    tracing::debug!("enabled parallel compute for {} extension(s)", set.len());
    set
}
