//! `mem add` command
//!
//! Appends to a memory (creating it if needed) and commits.
//!
//! # Usage
//! ```bash
//! mem add journal/2024 "met with the API team"
//! git log -1 --format=%s | mem add changes/log
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::{content_or_stdin, parse_key, App};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Memory key
    pub key: String,

    /// Text to append; read from stdin when omitted
    pub content: Option<String>,

    /// Commit message (default: "add: append to <key>")
    #[arg(short, long)]
    pub message: Option<String>,
}

pub async fn run(args: AddArgs, app: &App) -> Result<()> {
    let key = parse_key(&args.key)?;
    let content = content_or_stdin(args.content)?;

    let commit = app
        .service
        .add(&app.scope, &key, &content, args.message.as_deref(), &app.cancel)
        .await
        .context("add to memory")?;

    println!(
        "{} Appended to {} {}",
        "✓".green(),
        key.as_str().cyan(),
        format!("[{}]", commit.short_hash()).dimmed()
    );
    Ok(())
}
