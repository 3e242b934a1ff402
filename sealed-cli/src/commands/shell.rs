//! Completion scripts and the man page, both rendered from the clap model.

use std::io::Write;

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::Cli;
use crate::error::CliError;

const BIN_NAME: &str = "sealed-cli";

fn write_completions(shell: Shell, out: &mut dyn Write) {
    clap_complete::generate(shell, &mut Cli::command(), BIN_NAME, out);
}

fn write_manpage(out: &mut dyn Write) -> Result<(), CliError> {
    clap_mangen::Man::new(Cli::command()).render(out)?;
    Ok(())
}

/// Completions command handler
pub fn cmd_completions(shell: Shell) -> Result<(), CliError> {
    write_completions(shell, &mut std::io::stdout().lock());
    Ok(())
}

/// Manpage command handler
pub fn cmd_manpage() -> Result<(), CliError> {
    write_manpage(&mut std::io::stdout().lock())
}
