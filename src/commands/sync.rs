//! # Sync Command Implementation
//!
//! Runs the full reconciliation: deletes checkouts the group no longer has,
//! clones the ones it is missing, and optionally updates the rest.
//!
//! Deletions are confirmed once, interactively, unless `--force` is given.
//! `--dry-run` reports every planned action and performs none of them.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm};
use log::warn;

use gitlab_reconcile::executor::{Confirmer, FsRemover};
use gitlab_reconcile::local::FsDirectoryLister;
use gitlab_reconcile::output::{self, emoji, OutputConfig};
use gitlab_reconcile::reconcile::Reconciler;

use super::TargetArgs;

/// Reconcile local checkouts with the group
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Delete without asking for confirmation
    #[arg(short, long)]
    pub force: bool,

    /// Show what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

/// Asks on the terminal. A prompt that cannot be shown counts as "no".
struct PromptConfirmer;

impl Confirmer for PromptConfirmer {
    fn confirm_deletions(&mut self, paths: &[PathBuf]) -> bool {
        println!("The following directories will be deleted:");
        for path in paths {
            println!("  {}", path.display());
        }
        let theme = ColorfulTheme::default();
        match Confirm::with_theme(&theme)
            .with_prompt(format!("Delete {} directories?", paths.len()))
            .default(false)
            .interact()
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Cannot ask for confirmation: {}", e);
                false
            }
        }
    }
}

/// Execute the `sync` command.
pub fn execute(args: SyncArgs, out: &OutputConfig) -> Result<()> {
    let config = args.target.configuration(args.force, args.dry_run)?;
    let client = args.target.client()?;
    let git = args.target.git();

    let header = if config.dry_run() {
        "[Dry Run] Reconciling"
    } else {
        "Reconciling"
    };
    println!(
        "{} {} {} in {}",
        emoji(out, "🔄", "[SYNC]"),
        header,
        config.group_id(),
        config.group_directory().display()
    );

    let (plan, report) = Reconciler::new(&config, &client, &FsDirectoryLister, &git, &FsRemover)
        .run(&mut PromptConfirmer)?;

    if plan.is_empty() {
        for line in output::plan_lines(out, &plan) {
            println!("{}", line);
        }
        return Ok(());
    }
    for outcome in report.outcomes() {
        println!("{}", output::outcome_line(out, outcome));
    }
    println!("{}", output::summary_line(out, &report));

    if report.has_failures() {
        bail!("{} of {} actions failed", report.failed(), report.outcomes().len());
    }
    Ok(())
}
