//! `mem edit` command
//!
//! Replaces a memory and commits. Without content, opens `$EDITOR` (falling
//! back to `vi`) on a temporary copy of the current value.
//!
//! # Usage
//! ```bash
//! mem edit notes/api
//! mem edit notes/api "new text" -m "rewrite api note"
//! EDITOR="code -w" mem edit notes/api
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use super::{parse_key, App};

const DEFAULT_EDITOR: &str = "vi";

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Memory key
    pub key: String,

    /// New content; opens $EDITOR when omitted
    pub content: Option<String>,

    /// Commit message (default: "edit: update <key>")
    #[arg(short, long)]
    pub message: Option<String>,
}

pub async fn run(args: EditArgs, app: &App) -> Result<()> {
    let key = parse_key(&args.key)?;

    let existing = match app.service.get(&app.scope, &key, &app.cancel) {
        Ok(memory) => Some(memory.content),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e).context("get memory"),
    };

    let content = match args.content {
        Some(c) => c.into_bytes(),
        None => edit_in_editor(existing.as_deref().unwrap_or_default()).await?,
    };

    if existing.as_deref() == Some(content.as_slice()) {
        println!("No changes.");
        return Ok(());
    }

    let commit = app
        .service
        .edit(&app.scope, &key, &content, args.message.as_deref(), &app.cancel)
        .await
        .context("edit memory")?;

    let verb = if existing.is_some() { "Updated" } else { "Created" };
    println!(
        "{} {} {} {}",
        "✓".green(),
        verb,
        key.as_str().cyan(),
        format!("[{}]", commit.short_hash()).dimmed()
    );
    Ok(())
}

/// Let the user edit `initial` and return the saved buffer
async fn edit_in_editor(initial: &[u8]) -> Result<Vec<u8>> {
    let path = temp_path();
    std::fs::write(&path, initial).context("create temp file")?;

    let result = run_editor(&path).await.and_then(|()| {
        std::fs::read(&path).with_context(|| format!("read {}", path.display()))
    });
    let _ = std::fs::remove_file(&path);
    result
}

async fn run_editor(path: &Path) -> Result<()> {
    let editor = std::env::var("EDITOR")
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string());

    // EDITOR may carry flags, e.g. "code -w"
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or(DEFAULT_EDITOR);

    let status = tokio::process::Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .await
        .with_context(|| format!("launch editor {:?}", program))?;

    if !status.success() {
        bail!("editor {:?} exited with {}", program, status);
    }
    Ok(())
}

fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("mem-edit-{}.txt", std::process::id()))
}
