//! `mem del` command
//!
//! # Usage
//! ```bash
//! mem del notes/old
//! mem rm notes/old -m "drop stale note"
//! mem del notes/old --no-commit
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::{parse_key, App};

#[derive(Args, Debug)]
pub struct DelArgs {
    /// Memory key
    pub key: String,

    /// Commit message (default: "del: <key>")
    #[arg(short, long)]
    pub message: Option<String>,

    /// Stage the removal without committing
    #[arg(long)]
    pub no_commit: bool,
}

pub async fn run(args: DelArgs, app: &App) -> Result<()> {
    let key = parse_key(&args.key)?;

    app.service
        .delete(&app.scope, &key, &app.cancel)
        .await
        .context("delete memory")?;

    if !args.no_commit {
        let message = args.message.unwrap_or_else(|| format!("del: {}", key));
        app.service
            .commit(&app.scope, &message, &app.cancel)
            .context("commit")?;
    }

    println!("{} Deleted {}", "✓".green(), key.as_str().cyan());
    Ok(())
}
