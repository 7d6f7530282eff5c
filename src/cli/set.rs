//! `mem set` command
//!
//! Creates or overwrites a memory and commits it.
//!
//! # Usage
//! ```bash
//! mem set notes/api "timeout is 30s"
//! echo "from stdin" | mem set notes/api
//! mem set notes/api "draft" --no-commit   # stage only
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::{content_or_stdin, parse_key, App};

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Memory key (e.g. notes/api)
    pub key: String,

    /// Value; read from stdin when omitted
    pub value: Option<String>,

    /// Commit message (default: "set: <key>")
    #[arg(short, long)]
    pub message: Option<String>,

    /// Stage the change without committing
    #[arg(long)]
    pub no_commit: bool,
}

pub async fn run(args: SetArgs, app: &App) -> Result<()> {
    let key = parse_key(&args.key)?;
    let content = content_or_stdin(args.value)?;

    app.service
        .set(&app.scope, &key, content.as_bytes(), &app.cancel)
        .await
        .context("set memory")?;

    if !args.no_commit {
        let message = args.message.unwrap_or_else(|| format!("set: {}", key));
        app.service
            .commit(&app.scope, &message, &app.cancel)
            .context("commit")?;
    }

    println!("{} Set {}", "✓".green(), key.as_str().cyan());
    Ok(())
}
