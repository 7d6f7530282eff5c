//! `mem init` command
//!
//! Initializes a memory store.
//!
//! # Usage
//! ```bash
//! mem init            # Project store in the current directory (.mem)
//! mem init --global   # Global store (~/.mem, memories in ~/.memories)
//! ```

use anyhow::{Context, Result};
use clap::Args;

use super::App;
use crate::core::scope::ScopeType;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Initialize the global store instead of a project store
    #[arg(long)]
    pub global: bool,
}

pub fn run(args: InitArgs, app: &App) -> Result<()> {
    let kind = if args.global {
        ScopeType::Global
    } else {
        ScopeType::Project
    };

    let scope = app
        .service
        .init(kind, &app.cancel)
        .context("initialize store")?;

    println!("✅ Initialized memory store at {}", scope.store.display());
    println!("   Memories: {}", scope.root.display());
    println!("   Config:   {}", scope.config_path().display());
    println!("\nNext steps:");
    println!("  mem set notes/first \"Your first memory\"");
    println!("  mem log");

    Ok(())
}
