//! Toolchain capability probing.
//!
//! Computes the [`ToolchainState`] for one invocation: whether the source
//! translator is usable and whether the C compiler supports parallel
//! compute. Probing never fails; absent capabilities are reported through
//! warnings and a `false` in the state.

use std::path::Path;

use serde::Serialize;

use crate::builder::toolchain::{CommandSpec, ProbeInput, Toolchain};
use crate::builder::translator::Translator;
use crate::util::config::{Config, FeatureSwitch, ToolchainConfig};
use crate::util::process::ProcessBuilder;

/// Parallel-compute support of the detected compiler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParallelSupport {
    /// Whether the compiler accepts the parallel flag
    pub supported: bool,
    /// Whether the parallel runtime must be linked explicitly
    pub needs_runtime_link: bool,
}

impl ParallelSupport {
    pub fn unsupported() -> Self {
        ParallelSupport::default()
    }
}

/// Capabilities detected for one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ToolchainState {
    pub translator_available: bool,
    pub parallel: ParallelSupport,
}

/// User switches and extra flags that shape probing.
#[derive(Debug, Clone, Default)]
pub struct ProbeSettings {
    pub translator: FeatureSwitch,
    pub parallel: FeatureSwitch,
    pub cflags: Vec<String>,
    pub ldflags: Vec<String>,
}

impl ProbeSettings {
    /// Combine the build switches with toolchain flags.
    pub fn from_config(config: &Config, toolchain: &ToolchainConfig) -> Self {
        ProbeSettings {
            translator: config.translator(),
            parallel: config.parallel(),
            cflags: toolchain.toolchain.cflags.clone(),
            ldflags: toolchain.toolchain.ldflags.clone(),
        }
    }
}

/// Minimal program that needs both the parallel pragmas and the runtime.
const PROBE_SOURCE: &str = r#"#include <omp.h>
#include <stdio.h>

int main(void) {
    int n = 0;
#pragma omp parallel
    {
#pragma omp atomic
        n += 1;
    }
    printf("%d %d\n", n, omp_get_max_threads());
    return 0;
}
"#;

/// Probe the translator and the compiler.
pub fn probe(
    translator: &dyn Translator,
    toolchain: Option<&dyn Toolchain>,
    settings: &ProbeSettings,
) -> ToolchainState {
    let state = ToolchainState {
        translator_available: detect_translator(translator, settings.translator),
        parallel: detect_parallel(toolchain, settings),
    };
    tracing::debug!("toolchain state: {:?}", state);
    state
}

/// Whether the translator is usable. Logs a warning when it is not.
pub fn detect_translator(translator: &dyn Translator, switch: FeatureSwitch) -> bool {
    if switch.is_off() {
        tracing::info!("translator disabled by configuration; using pre-generated sources");
        return false;
    }

    match translator.detect() {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("{}; falling back to pre-generated sources", e);
            false
        }
    }
}

/// Detect parallel-compute support by building a probe program.
pub fn detect_parallel(toolchain: Option<&dyn Toolchain>, settings: &ProbeSettings) -> ParallelSupport {
    if settings.parallel.is_off() {
        tracing::info!("parallel compute disabled by configuration");
        return ParallelSupport::unsupported();
    }

    let Some(toolchain) = toolchain else {
        tracing::warn!("no C compiler found; building without parallel compute");
        return ParallelSupport::unsupported();
    };

    let dir = match tempfile::Builder::new().prefix("extbuild-probe").tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!("could not create probe directory: {}", e);
            return ParallelSupport::unsupported();
        }
    };

    let source = dir.path().join("probe.c");
    if let Err(e) = std::fs::write(&source, PROBE_SOURCE) {
        tracing::warn!("could not write probe program: {}", e);
        return ParallelSupport::unsupported();
    }

    let support = detect_parallel_with(toolchain, dir.path(), settings, |cmd| {
        let pb = ProcessBuilder::from(cmd).cwd(dir.path());
        tracing::debug!("probe: {}", pb.display_command());
        match pb.exec() {
            Ok(out) => out.status.success(),
            Err(e) => {
                tracing::debug!("probe failed to run: {:#}", e);
                false
            }
        }
    });

    if !support.supported {
        tracing::warn!(
            "{} does not support parallel compute; building without it",
            toolchain.compiler_path().display()
        );
    }
    support
}

/// Run the probe build through `run`: first with the parallel compiler flag
/// alone, then with the explicit runtime link flag added.
pub fn detect_parallel_with<F>(
    toolchain: &dyn Toolchain,
    dir: &Path,
    settings: &ProbeSettings,
    mut run: F,
) -> ParallelSupport
where
    F: FnMut(&CommandSpec) -> bool,
{
    let flags = toolchain.parallel_flags();
    let exe = if toolchain.platform() == crate::builder::toolchain::ToolchainPlatform::Msvc {
        "probe.exe"
    } else {
        "probe"
    };

    let mut input = ProbeInput {
        source: dir.join("probe.c"),
        output: dir.join(exe),
        cflags: settings.cflags.clone(),
        ldflags: settings.ldflags.clone(),
    };
    input.cflags.push(flags.compile.clone());

    if run(&toolchain.probe_command(&input)) {
        return ParallelSupport {
            supported: true,
            needs_runtime_link: false,
        };
    }

    let Some(link) = flags.link else {
        return ParallelSupport::unsupported();
    };

    input.ldflags.push(link);
    if run(&toolchain.probe_command(&input)) {
        tracing::debug!("parallel runtime must be linked explicitly");
        return ParallelSupport {
            supported: true,
            needs_runtime_link: true,
        };
    }

    ParallelSupport::unsupported()
}
