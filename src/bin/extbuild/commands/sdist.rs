//! `extbuild sdist` command
//!
//! Source archives must ship pre-generated sources, so this only works from
//! a version-control checkout where the translator can produce them.

use anyhow::Result;

use extbuild::ops::commands::{archive_build, CommandRun, Outcome};
use extbuild::ops::invocation::InvocationKind;
use extbuild::ops::Session;
use extbuild::util::GlobalContext;

pub fn execute(gctx: &GlobalContext, invocation: InvocationKind) -> Result<i32> {
    let mut session = Session::open(gctx, invocation)?;
    session.prepare()?;

    let translator = session.translator();
    let outcome = CommandRun::new("sdist").run(archive_build(&session, &translator))?;

    if let Outcome::Skipped(reason) = &outcome {
        eprintln!("     Skipped {}", reason);
    }
    Ok(outcome.exit_code())
}
