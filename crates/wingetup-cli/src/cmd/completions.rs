//! Completions command

use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io::stdout;

use crate::Cli;

/// Write completions for `shell` to stdout.
pub fn completions(shell: Shell) {
    generate(shell, &mut Cli::command(), "wingetup", &mut stdout());
}
