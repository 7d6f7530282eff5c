//! `mem branch` and `mem switch` commands
//!
//! # Usage
//! ```bash
//! mem branch                    # list, current marked with *
//! mem branch experiment         # create and switch
//! mem branch spike --no-switch  # create only
//! mem branch -d experiment      # delete (not the current branch)
//! mem switch main
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::{print_json, App};

#[derive(Args, Debug)]
pub struct BranchArgs {
    /// Branch to create (or delete with -d); lists branches when omitted
    pub name: Option<String>,

    /// Delete the named branch
    #[arg(short, long, requires = "name")]
    pub delete: bool,

    /// Create without switching to it
    #[arg(long, conflicts_with = "delete")]
    pub no_switch: bool,
}

#[derive(Args, Debug)]
pub struct SwitchArgs {
    /// Existing branch name
    pub name: String,
}

pub fn run(args: BranchArgs, app: &App) -> Result<()> {
    let Some(name) = args.name else {
        return list(app);
    };

    if args.delete {
        app.service
            .delete_branch(&app.scope, &name, &app.cancel)
            .context("delete branch")?;
        println!("Deleted branch {}", name);
        return Ok(());
    }

    app.service
        .create_branch(&app.scope, &name, &app.cancel)
        .context("create branch")?;
    if args.no_switch {
        println!("Created branch {}", name.cyan());
        return Ok(());
    }

    app.service
        .switch_branch(&app.scope, &name, &app.cancel)
        .context("switch branch")?;
    println!("Switched to new branch {}", name.cyan());
    Ok(())
}

pub fn run_switch(args: SwitchArgs, app: &App) -> Result<()> {
    app.service
        .switch_branch(&app.scope, &args.name, &app.cancel)
        .context("switch branch")?;
    println!("Switched to branch {}", args.name.cyan());
    Ok(())
}

fn list(app: &App) -> Result<()> {
    let current = app
        .service
        .current_branch(&app.scope, &app.cancel)
        .context("get current branch")?;
    let branches = app
        .service
        .branches(&app.scope, &app.cancel)
        .context("list branches")?;

    if app.json {
        let rows: Vec<_> = branches
            .iter()
            .map(|b| {
                serde_json::json!({
                    "name": b.name,
                    "head": b.head,
                    "current": b.name == current.name,
                })
            })
            .collect();
        return print_json(&rows);
    }

    for branch in &branches {
        if branch.name == current.name {
            println!("* {}", branch.name.green());
        } else {
            println!("  {}", branch.name);
        }
    }
    Ok(())
}
