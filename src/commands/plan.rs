//! # Plan Command Implementation
//!
//! Builds both catalogs and prints the actions `sync` would take. Nothing is
//! cloned, updated, or deleted, and no prompt is shown.

use anyhow::Result;
use clap::Args;

use gitlab_reconcile::executor::FsRemover;
use gitlab_reconcile::local::FsDirectoryLister;
use gitlab_reconcile::output::{self, emoji, OutputConfig};
use gitlab_reconcile::reconcile::Reconciler;

use super::TargetArgs;

/// Show the reconciliation plan
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

/// Execute the `plan` command.
pub fn execute(args: PlanArgs, out: &OutputConfig) -> Result<()> {
    let config = args.target.configuration(false, true)?;
    let client = args.target.client()?;
    let git = args.target.git();

    println!(
        "{} Planning {} in {}",
        emoji(out, "🔍", "[PLAN]"),
        config.group_id(),
        config.group_directory().display()
    );

    let plan =
        Reconciler::new(&config, &client, &FsDirectoryLister, &git, &FsRemover).plan()?;
    for line in output::plan_lines(out, &plan) {
        println!("{}", line);
    }
    Ok(())
}
