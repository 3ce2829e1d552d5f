//! # Output Configuration
//!
//! Controls how plans and run reports are rendered on stdout. Colors and
//! emoji follow terminal capabilities and user preferences:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! Diagnostics go through `log` to stderr; everything here writes the
//! user-facing summary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gitlab_reconcile::output::{OutputConfig, emoji};
//!
//! let config = OutputConfig::from_env_and_flag("auto");
//! println!("{} Planning...", emoji(&config, "🔍", "[PLAN]"));
//! ```

use std::env;

use console::style;

use crate::executor::{ExecutionOutcome, Report, Status};
use crate::planner::{Action, ActionKind, Plan};

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is the value of `--color`: "always", "never", or "auto".
    /// In auto mode colors are disabled when `NO_COLOR` is set, when
    /// `CLICOLOR=0`, when `TERM=dumb`, or when stdout is not a TTY (unless
    /// `CLICOLOR_FORCE=1`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the emoji when colors are enabled, otherwise the plain text.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

fn action_marker<'a>(config: &OutputConfig, kind: ActionKind) -> &'a str {
    match kind {
        ActionKind::Delete | ActionKind::DeleteExtra => emoji(config, "🗑️ ", "[DEL]"),
        ActionKind::Clone => emoji(config, "📥", "[CLONE]"),
        ActionKind::Update => emoji(config, "🔄", "[UPDATE]"),
        ActionKind::OriginMismatch => emoji(config, "⚠️ ", "[MISMATCH]"),
    }
}

/// One line describing a planned action.
pub fn plan_line(config: &OutputConfig, action: &Action) -> String {
    format!("{} {}", action_marker(config, action.kind()), action)
}

/// Lines for a whole plan, or a single "nothing to do" line.
pub fn plan_lines(config: &OutputConfig, plan: &Plan) -> Vec<String> {
    if plan.is_empty() {
        return vec![format!(
            "{} Nothing to do: local checkouts match the group",
            emoji(config, "✅", "[OK]")
        )];
    }
    plan.actions()
        .iter()
        .map(|action| plan_line(config, action))
        .collect()
}

/// One line describing what happened to an action.
pub fn outcome_line(config: &OutputConfig, outcome: &ExecutionOutcome) -> String {
    let (marker, detail) = match &outcome.status {
        Status::Success => (emoji(config, "✅", "[OK]"), String::new()),
        Status::Skipped(reason) => (emoji(config, "⏭️ ", "[SKIP]"), format!(": {}", reason)),
        Status::Failed(reason) => (emoji(config, "❌", "[FAIL]"), format!(": {}", reason)),
    };
    let line = format!("{} {}{}", marker, outcome.action, detail);
    if !config.use_color {
        return line;
    }
    match outcome.status {
        Status::Success => line,
        Status::Skipped(_) => style(line).yellow().to_string(),
        Status::Failed(_) => style(line).red().to_string(),
    }
}

/// Closing summary with per-status counts.
pub fn summary_line(config: &OutputConfig, report: &Report) -> String {
    let marker = if report.has_failures() {
        emoji(config, "❌", "[FAIL]")
    } else {
        emoji(config, "✅", "[OK]")
    };
    format!(
        "{} {} succeeded, {} skipped, {} failed",
        marker,
        report.succeeded(),
        report.skipped(),
        report.failed()
    )
}
