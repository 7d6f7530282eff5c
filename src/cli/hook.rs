//! `mem hook` command
//!
//! Installs a post-commit shim into the enclosing git repository. After each
//! commit the shim calls `mem hook run post-commit`, which derives a memory
//! from the commit's diff. Derived memories are staged in the store, not
//! committed.
//!
//! # Usage
//! ```bash
//! mem hook install                          # extract strategy
//! mem hook install --strategy all --script ./on-commit.sh
//! mem hook install --force                  # back up an existing hook
//! mem hook uninstall --keep-config
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use tracing::warn;

use super::App;
use crate::hook::{Strategy, POST_COMMIT};

#[derive(Args, Debug)]
pub struct HookArgs {
    #[command(subcommand)]
    pub command: HookCommands,
}

#[derive(Subcommand, Debug)]
pub enum HookCommands {
    /// Install the post-commit hook
    Install {
        /// extract, summarize, script or all
        #[arg(long, default_value = "extract")]
        strategy: Strategy,

        /// Script for the script strategy (optional extra step for all)
        #[arg(long)]
        script: Option<PathBuf>,

        /// Replace an existing hook, backing it up first
        #[arg(long)]
        force: bool,
    },

    /// Remove the hook, restoring any backup
    Uninstall {
        /// Keep the hook settings in the config for a later install
        #[arg(long)]
        keep_config: bool,
    },

    /// Run a hook handler (called by the installed shim)
    #[command(hide = true)]
    Run {
        /// Hook type, e.g. post-commit
        hook_type: String,

        /// Extra arguments git passes to the hook
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
        rest: Vec<String>,
    },
}

pub async fn run(args: HookArgs, app: &App) -> Result<()> {
    match args.command {
        HookCommands::Install {
            strategy,
            script,
            force,
        } => {
            let path = app
                .service
                .install_hook(&app.scope, strategy, script, force, &app.cancel)
                .context("install hook")?;
            println!("{} Installed post-commit hook ({})", "✓".green(), strategy);
            println!("   {}", path.display().to_string().dimmed());
            Ok(())
        }
        HookCommands::Uninstall { keep_config } => {
            app.service
                .uninstall_hook(&app.scope, keep_config, &app.cancel)
                .context("uninstall hook")?;
            println!("{} Uninstalled post-commit hook", "✓".green());
            Ok(())
        }
        HookCommands::Run { hook_type, .. } => {
            run_handler(&hook_type, app).await;
            Ok(())
        }
    }
}

/// Never fails: a hook must not block the commit that triggered it
async fn run_handler(hook_type: &str, app: &App) {
    if hook_type != POST_COMMIT {
        eprintln!("mem hook: unsupported hook type: {}", hook_type);
        return;
    }

    match app.service.run_hook(hook_type, &app.cancel).await {
        Ok(report) => {
            for key in &report.stored {
                tracing::info!(key = %key, "derived memory staged");
            }
        }
        Err(e) => {
            warn!(error = %e, "hook run failed");
            eprintln!("mem hook: {}", e);
        }
    }
}
