//! Toolchain detection functions.

use std::path::{Path, PathBuf};

use crate::util::config::ToolchainConfig;
use crate::util::process::ProcessBuilder;

use super::{GccToolchain, MsvcToolchain, Toolchain, ToolchainPlatform};

/// Detect the available toolchain.
///
/// Tries to find a C compiler with the following priority:
/// 1. Toolchain config file (`cc` in `toolchain.toml`)
/// 2. The CC environment variable
/// 3. On Windows: cl.exe on PATH
/// 4. cc, gcc or clang on PATH
///
/// Returns `None` when no compiler is found; parallel compute is then
/// reported as unsupported rather than failing the build.
pub fn detect_toolchain(config: &ToolchainConfig) -> Option<Box<dyn Toolchain>> {
    if let Some(toolchain) = try_detect_from_config(config) {
        return Some(toolchain);
    }

    if let Some(toolchain) = try_detect_from_env() {
        return Some(toolchain);
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(cl) = which::which("cl") {
            tracing::debug!("using MSVC: {}", cl.display());
            return Some(Box::new(MsvcToolchain::new(cl)));
        }
    }

    let cc = which::which("cc")
        .or_else(|_| which::which("gcc"))
        .or_else(|_| which::which("clang"))
        .ok()?;

    Some(from_compiler(cc))
}

/// Try to create a toolchain from config file settings.
fn try_detect_from_config(config: &ToolchainConfig) -> Option<Box<dyn Toolchain>> {
    let cc = config.toolchain.cc.as_ref()?;

    let resolved = if cc.exists() {
        cc.clone()
    } else {
        match which::which(cc) {
            Ok(p) => p,
            Err(_) => {
                tracing::warn!("configured C compiler not found: {}", cc.display());
                return None;
            }
        }
    };

    tracing::info!("using toolchain from config: cc={}", resolved.display());
    Some(from_compiler(resolved))
}

fn try_detect_from_env() -> Option<Box<dyn Toolchain>> {
    let cc_env = std::env::var("CC").ok().filter(|v| !v.trim().is_empty())?;
    let cc = PathBuf::from(cc_env.trim());

    // CC may be a bare name that only resolves on PATH
    let cc = if cc.exists() {
        cc
    } else {
        which::which(&cc).unwrap_or(cc)
    };

    Some(from_compiler(cc))
}

fn from_compiler(cc: PathBuf) -> Box<dyn Toolchain> {
    match detect_compiler_family(&cc) {
        ToolchainPlatform::Msvc => Box::new(MsvcToolchain::new(cc)),
        family => Box::new(GccToolchain::new(cc, family)),
    }
}

/// Detect whether the compiler is GCC, Clang, Apple Clang or MSVC.
pub fn detect_compiler_family(cc: &Path) -> ToolchainPlatform {
    // Check binary name first
    let name = cc
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();

    if name == "cl" || name == "clang-cl" {
        return ToolchainPlatform::Msvc;
    } else if name.contains("clang") {
        // Could be Apple Clang or regular Clang
        return detect_clang_variant(cc);
    } else if name.contains("gcc") || name.contains("g++") {
        return ToolchainPlatform::Gcc;
    }

    // Try to detect from --version output
    if let Some(stdout) = version_output(cc) {
        if stdout.contains("clang") {
            return clang_variant_from(&stdout);
        } else if stdout.contains("gcc") || stdout.contains("free software foundation") {
            return ToolchainPlatform::Gcc;
        }
    }

    // Default to GCC
    ToolchainPlatform::Gcc
}

/// Detect if Clang is Apple Clang or regular Clang.
fn detect_clang_variant(cc: &Path) -> ToolchainPlatform {
    version_output(cc)
        .map(|stdout| clang_variant_from(&stdout))
        .unwrap_or(ToolchainPlatform::Clang)
}

fn clang_variant_from(version: &str) -> ToolchainPlatform {
    if version.contains("apple") {
        ToolchainPlatform::AppleClang
    } else {
        ToolchainPlatform::Clang
    }
}

fn version_output(cc: &Path) -> Option<String> {
    let output = ProcessBuilder::new(cc).arg("--version").exec().ok()?;
    Some(String::from_utf8_lossy(&output.stdout).to_lowercase())
}
