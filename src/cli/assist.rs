//! `mem summarize` and `mem tag` commands
//!
//! Both need a default provider (`mem provider add` + `mem provider default`).
//!
//! # Usage
//! ```bash
//! mem summarize             # everything in scope
//! mem summarize notes/      # one prefix
//! mem tag notes/api --json
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::{parse_key, print_json, App};

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Only memories whose key starts with this prefix
    #[arg(default_value = "")]
    pub prefix: String,
}

#[derive(Args, Debug)]
pub struct TagArgs {
    /// Memory key
    pub key: String,
}

pub async fn run_summarize(args: SummarizeArgs, app: &App) -> Result<()> {
    let summary = app
        .service
        .summarize(&app.scope, &args.prefix, &app.cancel)
        .await
        .context("summarize")?;

    if app.json {
        return print_json(&summary);
    }

    println!("# {}\n\n{}", summary.title.bold(), summary.overview);
    if !summary.key_points.is_empty() {
        println!("\nKey Points:");
        for point in &summary.key_points {
            println!("  - {}", point);
        }
    }
    if !summary.tags.is_empty() {
        println!("\nTags: {}", summary.tags.join(", ").cyan());
    }
    Ok(())
}

pub async fn run_tag(args: TagArgs, app: &App) -> Result<()> {
    let key = parse_key(&args.key)?;
    let tags = app
        .service
        .autotag(&app.scope, &key, &app.cancel)
        .await
        .context("auto-tag")?;

    if app.json {
        return print_json(&tags);
    }

    println!("Tags:       {}", tags.tags.join(", ").cyan());
    println!("Category:   {}", tags.category);
    println!("Confidence: {:.2}", tags.confidence);
    Ok(())
}
