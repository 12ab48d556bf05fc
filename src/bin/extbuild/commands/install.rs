//! `extbuild install` command

use anyhow::Result;

use extbuild::ops::commands::{install, CommandRun};
use extbuild::ops::invocation::InvocationKind;
use extbuild::ops::plan::default_plan_path;
use extbuild::ops::Session;
use extbuild::util::GlobalContext;

pub fn execute(gctx: &GlobalContext, invocation: InvocationKind) -> Result<i32> {
    let mut session = Session::open(gctx, invocation)?;
    session.prepare()?;

    let plan_path = default_plan_path(session.root(), session.config());
    let outcome = CommandRun::new("install").run(install(&session, plan_path))?;

    Ok(outcome.exit_code())
}
