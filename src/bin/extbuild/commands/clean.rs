//! `extbuild clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use extbuild::ops::plan::plan_dir;
use extbuild::util::fs::remove_dir_all_if_exists;
use extbuild::util::GlobalContext;

pub fn execute(args: CleanArgs, gctx: &GlobalContext) -> Result<i32> {
    let root = gctx.find_project_root()?;

    let dir = if args.all {
        // Remove entire .extbuild directory
        GlobalContext::project_dir(&root)
    } else {
        plan_dir(&root, &gctx.load_config(&root))
    };

    remove_dir_all_if_exists(&dir)?;
    eprintln!("     Removed {}", dir.display());

    Ok(0)
}
