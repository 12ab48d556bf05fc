//! `extbuild probe` command
//!
//! Runs the same capability detection as a build and reports it.

use anyhow::Result;

use extbuild::builder::probe::{probe, ProbeSettings};
use extbuild::builder::toolchain::detect_toolchain;
use extbuild::builder::translator::Translator;
use extbuild::ops::invocation::InvocationKind;
use extbuild::ops::Session;
use extbuild::util::GlobalContext;

pub fn execute(gctx: &GlobalContext, invocation: InvocationKind) -> Result<i32> {
    let session = Session::open(gctx, invocation)?;

    let translator = session.translator();
    match translator.detect() {
        Ok(info) => println!(
            "translator: {} {} ({})",
            translator.program(),
            info.version
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unknown version".to_string()),
            info.path.display()
        ),
        Err(e) => println!("translator: unavailable ({})", e),
    }

    let toolchain = detect_toolchain(session.toolchain_config());
    match toolchain.as_deref() {
        Some(tc) => println!(
            "compiler: {} ({})",
            tc.compiler_path().display(),
            tc.platform().as_str()
        ),
        None => println!("compiler: not found"),
    }

    let settings = ProbeSettings::from_config(session.config(), session.toolchain_config());
    let state = probe(&translator, toolchain.as_deref(), &settings);
    println!("{}", serde_json::to_string_pretty(&state)?);

    Ok(0)
}
