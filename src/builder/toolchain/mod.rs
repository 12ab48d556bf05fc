//! Toolchain abstraction for the parallel-compute probe.
//!
//! This module provides a unified interface for generating the probe
//! compile-and-link command across compiler families (GCC, Clang, MSVC),
//! and for the flags each family uses to enable OpenMP-style parallelism.
//!
//! Toolchain detection priority:
//! 1. Toolchain config file (`.extbuild/toolchain.toml` or `~/.extbuild/toolchain.toml`)
//! 2. Environment variable (CC)
//! 3. Auto-detection (searching PATH for common compilers)

use std::path::{Path, PathBuf};

mod detect;
mod gcc;
mod msvc;

pub use detect::{detect_compiler_family, detect_toolchain};
pub use gcc::GccToolchain;
pub use msvc::MsvcToolchain;

/// A command to execute, with program, arguments, and environment.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// The program to run (e.g., "gcc", "cl.exe")
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
    /// Environment variables to set
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Input for a probe build: one source compiled and linked into an executable.
#[derive(Debug, Clone)]
pub struct ProbeInput {
    /// Probe source file
    pub source: PathBuf,
    /// Output executable
    pub output: PathBuf,
    /// Compiler flags (config flags followed by the parallel flag)
    pub cflags: Vec<String>,
    /// Linker flags (config flags, then the runtime link flag on retry)
    pub ldflags: Vec<String>,
}

/// Flags a compiler family uses to build with parallel compute enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelFlags {
    /// Compiler flag enabling parallel pragmas
    pub compile: String,
    /// Linker flag for the parallel runtime, when it can be linked explicitly
    pub link: Option<String>,
    /// Preprocessor define announcing parallel support to the sources
    pub define: String,
}

/// Define announcing parallel support, identical across families.
pub const PARALLEL_DEFINE: &str = "USE_OPENMP";

impl ParallelFlags {
    /// GCC and Clang spelling.
    pub fn gnu() -> Self {
        ParallelFlags {
            compile: "-fopenmp".to_string(),
            link: Some("-lgomp".to_string()),
            define: PARALLEL_DEFINE.to_string(),
        }
    }

    /// MSVC spelling; the runtime is linked by the compiler driver.
    pub fn msvc() -> Self {
        ParallelFlags {
            compile: "/openmp".to_string(),
            link: None,
            define: PARALLEL_DEFINE.to_string(),
        }
    }
}

/// The platform/family of a toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainPlatform {
    /// GCC (GNU Compiler Collection)
    Gcc,
    /// Clang/LLVM
    Clang,
    /// Apple Clang (macOS)
    AppleClang,
    /// Microsoft Visual C++
    Msvc,
}

impl ToolchainPlatform {
    /// Get the platform name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainPlatform::Gcc => "gcc",
            ToolchainPlatform::Clang => "clang",
            ToolchainPlatform::AppleClang => "apple-clang",
            ToolchainPlatform::Msvc => "msvc",
        }
    }
}

/// Trait for toolchain implementations.
///
/// Each toolchain knows its parallel-compute flags and how to spell a
/// single-step compile-and-link of the probe program.
pub trait Toolchain {
    /// Get the toolchain platform.
    fn platform(&self) -> ToolchainPlatform;

    /// Get the C compiler path.
    fn compiler_path(&self) -> &Path;

    /// Flags enabling parallel compute for this family.
    fn parallel_flags(&self) -> ParallelFlags;

    /// Generate a command that compiles and links the probe program.
    fn probe_command(&self, input: &ProbeInput) -> CommandSpec;
}
