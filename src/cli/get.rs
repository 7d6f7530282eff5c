//! `mem get` command
//!
//! Prints a memory. Without `--scope` the project store is searched first,
//! then the global one.
//!
//! # Usage
//! ```bash
//! mem get notes/api
//! mem get notes/api --json
//! mem get style/rust --scope global
//! ```

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use std::io::Write;

use super::{parse_key, print_json, App};

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Memory key
    pub key: String,
}

pub fn run(args: GetArgs, app: &App) -> Result<()> {
    let key = parse_key(&args.key)?;
    let memory = app
        .service
        .get(&app.scope, &key, &app.cancel)
        .context("get memory")?;

    if app.json {
        return print_json(&json!({
            "key": memory.key,
            "content": memory.text(),
            "mime_type": memory.metadata.mime_type,
            "created_at": memory.created_at,
            "updated_at": memory.updated_at,
        }));
    }

    // Raw bytes, so binary memories survive a redirect
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&memory.content)?;
    stdout.flush()?;
    Ok(())
}
