//! CLI integration tests for extbuild.
//!
//! These tests run the binary against throwaway projects. Every project
//! turns the translator and the parallel probe off through its project
//! config so results do not depend on the host toolchain.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the extbuild binary command, isolated from the user's global config.
fn extbuild(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("extbuild").unwrap();
    cmd.env("HOME", home).env_remove("CC");
    cmd
}

/// Create a temporary directory for test projects.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

const MANIFEST: &str = r#"
[package]
name = "pkg"
namespace = "pkg"

[build]
requires = ["numpy>=1.7.0"]

[translator]
program = "extbuild-no-such-cython"
requirement = "cython>=0.22"

[providers.arrays]
include-dirs = ["/opt/arrays/include"]

[[extension]]
name = "pkg._ext.fast"
sources = ["pkg/_ext/fast.pyx"]
extra-compile-args = ["-O3"]
providers = ["arrays"]

[[extension]]
name = "pkg._ext.kernels"
sources = ["pkg/_ext/kernels.cpp"]
language = "c++"
"#;

/// Write a project with the given manifest and capabilities switched off.
fn project(tmp: &TempDir, manifest: &str) -> std::path::PathBuf {
    let root = tmp.path().join("project");
    fs::create_dir_all(root.join(".extbuild")).unwrap();
    fs::write(root.join("Extbuild.toml"), manifest).unwrap();
    fs::write(
        root.join(".extbuild/config.toml"),
        "[build]\ntranslator = \"off\"\nparallel = \"off\"\n",
    )
    .unwrap();
    root
}

fn with_failing_provider() -> String {
    format!(
        "{}providers = [\"numpy\"]\n\n[providers.numpy]\ncommand = [\"extbuild-no-such-python\"]\n",
        MANIFEST
    )
}

// ============================================================================
// metadata-only invocations
// ============================================================================

#[test]
fn test_version_succeeds_with_failing_provider() {
    let tmp = temp_dir();
    let root = project(&tmp, &with_failing_provider());

    extbuild(tmp.path())
        .arg("--version")
        .current_dir(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("extbuild"));
}

#[test]
fn test_no_arguments_prints_help() {
    let tmp = temp_dir();

    extbuild(tmp.path())
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_clean_succeeds_with_failing_provider() {
    let tmp = temp_dir();
    let root = project(&tmp, &with_failing_provider());
    fs::create_dir_all(root.join(".extbuild/plan")).unwrap();
    fs::write(root.join(".extbuild/plan/extensions.json"), "[]").unwrap();

    extbuild(tmp.path())
        .arg("clean")
        .current_dir(&root)
        .assert()
        .success();

    assert!(!root.join(".extbuild/plan").exists());
    assert!(root.join(".extbuild/config.toml").exists());
}

#[test]
fn test_clean_all_removes_state_directory() {
    let tmp = temp_dir();
    let root = project(&tmp, MANIFEST);

    extbuild(tmp.path())
        .args(["clean", "--all"])
        .current_dir(&root)
        .assert()
        .success();

    assert!(!root.join(".extbuild").exists());
}

// ============================================================================
// extbuild build
// ============================================================================

#[test]
fn test_build_emit_plan_uses_generated_sources() {
    let tmp = temp_dir();
    let root = project(&tmp, MANIFEST);

    let output = extbuild(tmp.path())
        .args(["build", "--emit-plan"])
        .current_dir(&root)
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["package"], "pkg");
    assert_eq!(plan["requires"], serde_json::json!(["numpy>=1.7.0"]));
    assert_eq!(plan["toolchain"]["translator_available"], false);
    assert_eq!(plan["toolchain"]["parallel"]["supported"], false);

    let fast = &plan["extensions"][0];
    assert_eq!(fast["name"], "pkg._ext.fast");
    assert_eq!(fast["sources"][0], "pkg/_ext/fast.c");
    assert_eq!(fast["include_dirs"][0], "/opt/arrays/include");
    assert_eq!(fast["extra_compile_args"], serde_json::json!(["-O3"]));

    let kernels = &plan["extensions"][1];
    assert_eq!(kernels["sources"][0], "pkg/_ext/kernels.cpp");
    assert_eq!(kernels["language"], "c++");
}

#[test]
fn test_build_on_checkout_requires_translator() {
    let tmp = temp_dir();
    let root = project(&tmp, MANIFEST);
    fs::create_dir_all(root.join(".git")).unwrap();

    let output = extbuild(tmp.path())
        .args(["build", "--emit-plan"])
        .current_dir(&root)
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        plan["requires"],
        serde_json::json!(["numpy>=1.7.0", "cython>=0.22"])
    );
}

#[test]
fn test_build_writes_plan_file() {
    let tmp = temp_dir();
    let root = project(&tmp, MANIFEST);

    extbuild(tmp.path())
        .arg("build")
        .current_dir(&root)
        .assert()
        .success();

    let plan = fs::read_to_string(root.join(".extbuild/plan/extensions.json")).unwrap();
    assert!(plan.contains("pkg._ext.kernels"));
}

#[test]
fn test_build_from_subdirectory_and_with_directory_flag() {
    let tmp = temp_dir();
    let root = project(&tmp, MANIFEST);
    fs::create_dir_all(root.join("pkg/_ext")).unwrap();

    extbuild(tmp.path())
        .args(["build", "--emit-plan"])
        .current_dir(root.join("pkg/_ext"))
        .assert()
        .success()
        .stdout(predicate::str::contains("pkg._ext.fast"));

    extbuild(tmp.path())
        .args(["-C", "project", "build", "--emit-plan"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("pkg._ext.fast"));
}

#[test]
fn test_build_fails_with_missing_bundled_dir() {
    let tmp = temp_dir();
    let manifest = format!(
        "{}providers = [\"vendored\"]\n\n[providers.vendored]\nbundled = \"vendor/include\"\n",
        MANIFEST
    );
    let root = project(&tmp, &manifest);

    extbuild(tmp.path())
        .args(["build", "--emit-plan"])
        .current_dir(&root)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("bundled directory for `vendored` not found"));
}

#[test]
fn test_build_fails_with_failing_provider() {
    let tmp = temp_dir();
    let root = project(&tmp, &with_failing_provider());

    extbuild(tmp.path())
        .arg("build")
        .current_dir(&root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("capability provider `numpy` failed"));
}

#[test]
fn test_build_without_manifest() {
    let tmp = temp_dir();

    extbuild(tmp.path())
        .arg("build")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no manifest found"));
}

// ============================================================================
// extbuild sdist
// ============================================================================

#[test]
fn test_sdist_outside_checkout_is_skipped() {
    let tmp = temp_dir();
    let root = project(&tmp, &with_failing_provider());

    extbuild(tmp.path())
        .arg("sdist")
        .current_dir(&root)
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "not on a version-control checkout, can not create source distribution",
        ));
}

#[test]
fn test_sdist_on_checkout_without_translator_warns() {
    let tmp = temp_dir();
    let root = project(&tmp, MANIFEST);
    fs::create_dir_all(root.join(".git")).unwrap();

    extbuild(tmp.path())
        .arg("sdist")
        .current_dir(&root)
        .assert()
        .success()
        .stderr(predicate::str::contains("WARN"));
}

// ============================================================================
// extbuild test
// ============================================================================

#[cfg(unix)]
#[test]
fn test_runner_exit_code_propagates() {
    let tmp = temp_dir();
    let manifest = format!(
        "{}\n[commands]\ntest-runner = [\"sh\", \"-c\", \"exit 3\"]\n",
        MANIFEST
    );
    let root = project(&tmp, &manifest);

    extbuild(tmp.path())
        .arg("test")
        .current_dir(&root)
        .assert()
        .code(3);
}

#[cfg(unix)]
#[test]
fn test_runner_receives_namespace_by_default() {
    let tmp = temp_dir();
    let manifest = format!(
        "{}\n[commands]\ntest-runner = [\"sh\", \"-c\", \"echo \\\"ran $1\\\"\", \"runner\"]\n",
        MANIFEST
    );
    let root = project(&tmp, &manifest);

    extbuild(tmp.path())
        .arg("test")
        .current_dir(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("ran pkg"));

    extbuild(tmp.path())
        .args(["test", "pkg/tests"])
        .current_dir(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("ran pkg/tests"));
}

// ============================================================================
// extbuild completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = temp_dir();

    extbuild(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("extbuild"));
}
