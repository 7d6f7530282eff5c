//! `mem search` and `mem index` commands
//!
//! Keyword search scans every memory. Semantic search needs an embedder
//! (`[embeddings] backend = "http"`) and a built index.
//!
//! # Usage
//! ```bash
//! mem search timeout
//! mem search "how do retries work" --semantic -n 5
//! mem index           # rebuild the vector index
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::{print_json, App};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Rank by embedding similarity
    #[arg(short, long)]
    pub semantic: bool,

    /// Maximum results (0 = unlimited)
    #[arg(short = 'n', long = "number", default_value_t = 10)]
    pub number: usize,
}

#[derive(Args, Debug)]
pub struct IndexArgs {}

pub async fn run(args: SearchArgs, app: &App) -> Result<()> {
    let hits = if args.semantic {
        app.service
            .semantic_search(&app.scope, &args.query, args.number, &app.cancel)
            .await
            .context("semantic search")?
    } else {
        app.service
            .keyword_search(&app.scope, &args.query, args.number, &app.cancel)
            .context("keyword search")?
    };

    if app.json {
        return print_json(&hits);
    }

    if hits.is_empty() {
        println!("No results for: {}", args.query);
        return Ok(());
    }

    for hit in &hits {
        if args.semantic {
            println!("{}  {}", format!("{:.4}", hit.score).dimmed(), hit.key.as_str().cyan());
        } else {
            println!("{}", hit.key.as_str().cyan());
        }
    }
    Ok(())
}

pub async fn run_index(_args: IndexArgs, app: &App) -> Result<()> {
    let count = app
        .service
        .rebuild_index(&app.scope, &app.cancel)
        .await
        .context("rebuild index")?;

    println!("{} Index rebuilt ({} memories)", "✓".green(), count);
    Ok(())
}
