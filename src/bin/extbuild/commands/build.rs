//! `extbuild build` command

use anyhow::Result;

use crate::cli::BuildArgs;
use extbuild::ops::invocation::InvocationKind;
use extbuild::ops::plan::{default_plan_path, write_plan};
use extbuild::ops::Session;
use extbuild::util::GlobalContext;

pub fn execute(args: BuildArgs, gctx: &GlobalContext, invocation: InvocationKind) -> Result<i32> {
    let mut session = Session::open(gctx, invocation)?;
    session.prepare()?;

    let plan = session.plan()?;
    for req in &plan.requires {
        tracing::debug!("build requirement: {}", req);
    }

    if args.emit_plan {
        println!("{}", plan.to_json()?);
        return Ok(0);
    }

    let path = args
        .out
        .unwrap_or_else(|| default_plan_path(session.root(), session.config()));
    write_plan(&path, &plan)?;
    eprintln!("       Wrote {}", path.display());

    Ok(0)
}
