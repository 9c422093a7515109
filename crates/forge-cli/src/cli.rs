//! Argument parsing for the `forge` binary.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[clap(author, about = "Content-addressed task runner with memoized outputs", long_about = None)]
#[command(name = "forge", version)]
pub struct Cli {
    /// Raise the logging level; repeat for more detail (-v, -vv, -vvv).
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Force color output even when stderr is not a terminal.
    #[clap(long, global = true)]
    pub color: bool,

    /// Disable color output unconditionally.
    #[clap(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one or more tasks matching a specifier.
    Run(RunArgs),
    /// Print the forge version and exit.
    Version,
    /// Generate a shell completion script on stdout.
    Completion { shell: Shell },
}

impl Cli {
    /// Whether stderr output should be colorized, resolving `--color` /
    /// `--no-color` against the terminal's own color support.
    pub fn use_color(&self) -> bool {
        if self.no_color {
            false
        } else if self.color {
            true
        } else {
            forge_lib::telemetry::stderr_supports_color()
        }
    }

    pub fn print_completions(shell: Shell) {
        clap_complete::generate(shell, &mut Cli::command(), "forge", &mut std::io::stdout());
    }
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// A path to an application directory, or an `app[.task]` pattern
    /// (either half may be `*`).
    pub specifier: String,

    /// Which tasks to execute: only those the Status Manager reports
    /// pending, or every selected task regardless of status.
    #[clap(long, value_enum, default_value_t = FilterArg::Always)]
    pub filter: FilterArg,

    /// Skip uploading declared outputs after a successful run.
    #[clap(long)]
    pub skip_upload: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    Pending,
    Always,
}

impl From<FilterArg> for forge_lib::Filter {
    fn from(value: FilterArg) -> Self {
        match value {
            FilterArg::Pending => forge_lib::Filter::OnlyPending,
            FilterArg::Always => forge_lib::Filter::Always,
        }
    }
}
