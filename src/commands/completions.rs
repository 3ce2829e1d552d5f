//! # Completions Command Implementation
//!
//! Prints a shell completion script for `gitlab-reconcile` to stdout.
//!
//! ```bash
//! gitlab-reconcile completions bash > ~/.local/share/bash-completion/completions/gitlab-reconcile
//! gitlab-reconcile completions zsh > ~/.zfunc/_gitlab-reconcile
//! ```

use std::io::{self, Write};

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

use crate::cli::Cli;

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Execute the `completions` command.
pub fn execute(args: CompletionsArgs) -> Result<()> {
    write_completions(args.shell, &mut io::stdout())
}

fn write_completions(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, out);
    out.flush()?;
    Ok(())
}
