//! History commands: `commit`, `status`, `log`, `diff`, `show`, `revert`
//!
//! # Usage
//! ```bash
//! mem commit -m "capture design notes"
//! mem status
//! mem log -n 5 --oneline
//! mem diff            # staged changes vs HEAD
//! mem diff HEAD~2     # HEAD vs an older revision
//! mem show HEAD~1
//! mem revert HEAD~1   # destructive: resets branch and files
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::{print_json, App};
use crate::core::history::{ChangeKind, Commit};

#[derive(Args, Debug)]
pub struct CommitArgs {
    /// Commit message
    #[arg(short, long)]
    pub message: String,
}

#[derive(Args, Debug)]
pub struct StatusArgs {}

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Number of commits to show (0 = all)
    #[arg(short = 'n', long = "number", default_value_t = 10)]
    pub number: i64,

    /// One commit per line
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Revision to compare HEAD against; staged changes when omitted
    pub reference: Option<String>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Revision (hash, branch, HEAD~n)
    #[arg(default_value = "HEAD")]
    pub reference: String,
}

#[derive(Args, Debug)]
pub struct RevertArgs {
    /// Revision to reset to
    pub reference: String,
}

pub fn run_commit(args: CommitArgs, app: &App) -> Result<()> {
    let commit = app
        .service
        .commit(&app.scope, &args.message, &app.cancel)
        .context("commit")?;

    println!("[{}] {}", commit.short_hash().yellow(), commit.message);
    Ok(())
}

pub fn run_status(_args: StatusArgs, app: &App) -> Result<()> {
    let status = app
        .service
        .status(&app.scope, &app.cancel)
        .context("read status")?;

    if app.json {
        return print_json(&serde_json::json!({
            "scope": status.scope.kind,
            "branch": status.branch.name,
            "staged": status.staged,
        }));
    }

    println!("On branch {}", status.branch.name.cyan().bold());
    println!("{}", format!("Scope: {}", status.scope).dimmed());

    if status.staged.is_empty() {
        println!("\nNothing staged.");
        return Ok(());
    }

    println!("\nChanges to be committed:");
    for change in &status.staged {
        let label = match change.kind {
            ChangeKind::Added => "added:   ".green(),
            ChangeKind::Modified => "modified:".yellow(),
            ChangeKind::Deleted => "deleted: ".red(),
        };
        println!("  {} {}", label, change.path);
    }
    Ok(())
}

pub fn run_log(args: LogArgs, app: &App) -> Result<()> {
    let commits = app
        .service
        .log(&app.scope, args.number, &app.cancel)
        .context("read log")?;

    if app.json {
        return print_json(&commits);
    }

    for commit in &commits {
        if args.oneline {
            println!("{} {}", commit.short_hash().yellow(), commit.message);
        } else {
            print_commit(commit);
        }
    }
    Ok(())
}

pub fn run_diff(args: DiffArgs, app: &App) -> Result<()> {
    let reference = args.reference.unwrap_or_default();
    let diff = app
        .service
        .diff(&app.scope, &reference, &app.cancel)
        .context("diff")?;

    if diff.is_empty() {
        println!("No changes.");
        return Ok(());
    }
    print!("{}", diff);
    Ok(())
}

pub fn run_show(args: ShowArgs, app: &App) -> Result<()> {
    let commit = app
        .service
        .show(&app.scope, &args.reference, &app.cancel)
        .with_context(|| format!("show {}", args.reference))?;

    if app.json {
        return print_json(&commit);
    }
    print_commit(&commit);
    if !commit.parents.is_empty() {
        println!("Parents: {}", commit.parents.join(" ").dimmed());
    }
    Ok(())
}

pub fn run_revert(args: RevertArgs, app: &App) -> Result<()> {
    app.service
        .revert(&app.scope, &args.reference, &app.cancel)
        .with_context(|| format!("revert to {}", args.reference))?;

    println!("{} Reverted to {}", "✓".green(), args.reference);
    Ok(())
}

fn print_commit(commit: &Commit) {
    println!("{} {}", "commit".yellow(), commit.hash.yellow());
    println!("Author: {}", commit.author);
    println!(
        "Date:   {}\n",
        commit.timestamp.format("%a %b %-d %H:%M:%S %Y %z")
    );
    for line in commit.message.lines() {
        println!("    {}", line);
    }
    println!();
}
