//! `mem ls` command
//!
//! Lists memory keys. The prefix is matched literally against the key
//! string, so `notes` also matches `notes-archive/x`.
//!
//! # Usage
//! ```bash
//! mem ls
//! mem ls notes/
//! mem ls --json
//! ```

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use super::{print_json, App};

#[derive(Args, Debug)]
pub struct LsArgs {
    /// Only keys starting with this prefix
    #[arg(default_value = "")]
    pub prefix: String,
}

pub fn run_ls(args: LsArgs, app: &App) -> Result<()> {
    let memories = app
        .service
        .list(&app.scope, &args.prefix, &app.cancel)
        .context("list memories")?;

    if app.json {
        let rows: Vec<_> = memories
            .iter()
            .map(|m| {
                json!({
                    "key": m.key,
                    "size": m.size(),
                    "created_at": m.created_at,
                    "updated_at": m.updated_at,
                })
            })
            .collect();
        return print_json(&rows);
    }

    for memory in &memories {
        println!("{}", memory.key);
    }
    Ok(())
}
