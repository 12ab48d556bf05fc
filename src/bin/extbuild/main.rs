//! extbuild CLI - conditional build orchestration for native extension modules

use std::io::IsTerminal;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use extbuild::ops::invocation::{classify, InvocationKind};
use extbuild::util::diagnostic::emit;
use extbuild::util::{ExtError, GlobalContext};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = classify(&args);

    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    match run(cli, invocation) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            match e.downcast_ref::<ExtError>() {
                Some(ext) => emit(&ext.to_diagnostic(), color),
                None => eprintln!("error: {:#}", e),
            }
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli, invocation: InvocationKind) -> Result<i32> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("extbuild=debug")
    } else {
        EnvFilter::new("extbuild=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let gctx = match &cli.directory {
        Some(dir) => {
            let cwd = std::env::current_dir()?.join(dir);
            GlobalContext::with_cwd(cwd)?
        }
        None => GlobalContext::new()?,
    };

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(0);
    };

    // Execute command
    match command {
        Commands::Build(args) => commands::build::execute(args, &gctx, invocation),
        Commands::Install => commands::install::execute(&gctx, invocation),
        Commands::Sdist => commands::sdist::execute(&gctx, invocation),
        Commands::Test(args) => commands::test::execute(args, &gctx, invocation),
        Commands::Clean(args) => commands::clean::execute(args, &gctx),
        Commands::Probe => commands::probe::execute(&gctx, invocation),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
