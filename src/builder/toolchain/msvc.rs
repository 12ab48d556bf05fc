//! MSVC toolchain implementation.

use std::path::{Path, PathBuf};

use super::{CommandSpec, ParallelFlags, ProbeInput, Toolchain, ToolchainPlatform};

/// MSVC toolchain (Windows).
#[derive(Debug, Clone)]
pub struct MsvcToolchain {
    /// Path to cl.exe (compiler and link driver)
    pub cl: PathBuf,
}

impl MsvcToolchain {
    /// Create a new MSVC toolchain.
    pub fn new(cl: PathBuf) -> Self {
        MsvcToolchain { cl }
    }
}

impl Toolchain for MsvcToolchain {
    fn platform(&self) -> ToolchainPlatform {
        ToolchainPlatform::Msvc
    }

    fn compiler_path(&self) -> &Path {
        &self.cl
    }

    fn parallel_flags(&self) -> ParallelFlags {
        ParallelFlags::msvc()
    }

    fn probe_command(&self, input: &ProbeInput) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.cl);

        cmd = cmd.arg("/nologo");

        // Custom flags
        cmd = cmd.args(input.cflags.iter().cloned());

        // Input
        cmd = cmd.arg(input.source.display().to_string());

        // Output executable
        cmd = cmd.arg(format!("/Fe{}", input.output.display()));

        // Everything after /link goes to link.exe
        if !input.ldflags.is_empty() {
            cmd = cmd.arg("/link");
            cmd = cmd.args(input.ldflags.iter().cloned());
        }

        cmd
    }
}
