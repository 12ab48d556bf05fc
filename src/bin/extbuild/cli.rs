//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// extbuild - conditional build orchestration for native extension modules
#[derive(Parser)]
#[command(name = "extbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Run as if started in this directory
    #[arg(short = 'C', value_name = "DIR", global = true)]
    pub directory: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the extension list and write the build plan
    Build(BuildArgs),

    /// Build, then run the base install command
    Install,

    /// Translate sources and run the base source-archive command
    Sdist,

    /// Run the test runner
    Test(TestArgs),

    /// Remove generated state
    Clean(CleanArgs),

    /// Show the detected translator and compiler capabilities
    Probe,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Print the build plan as JSON instead of writing it
    #[arg(long)]
    pub emit_plan: bool,

    /// Where to write the build plan
    #[arg(long, value_name = "PATH", conflicts_with = "emit_plan")]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct TestArgs {
    /// Arguments for the test runner (defaults to the package namespace)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Remove the whole .extbuild directory, not just the plan
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
