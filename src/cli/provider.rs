//! `mem provider` command
//!
//! Manage the text-completion providers used by `summarize`, `tag` and the
//! summarize hook strategy. Any OpenAI-compatible `/chat/completions`
//! endpoint works; `openai` and `ollama` know their default base URL.
//!
//! # Usage
//! ```bash
//! mem provider list
//! mem provider add openai --model gpt-4o-mini --api-key sk-...
//! mem provider add local --model llama3 --base-url http://localhost:8080/v1
//! mem provider default openai
//! mem provider test openai
//! mem provider remove local
//! ```

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use super::App;
use crate::config::ProviderConfig;

#[derive(Args, Debug)]
pub struct ProviderArgs {
    #[command(subcommand)]
    pub command: ProviderCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProviderCommands {
    /// List configured providers
    List,

    /// Add or replace a provider
    Add {
        /// Provider name (e.g. openai, ollama, or any name with --base-url)
        name: String,

        /// Model name
        #[arg(long)]
        model: String,

        /// API key
        #[arg(long, env = "MEM_PROVIDER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Base URL of an OpenAI-compatible API
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Remove a provider
    Remove {
        name: String,
    },

    /// Set the default provider
    Default {
        name: String,
    },

    /// Check that a provider answers
    Test {
        name: String,
    },
}

pub async fn run(args: ProviderArgs, app: &App) -> Result<()> {
    match args.command {
        ProviderCommands::List => list(app),
        ProviderCommands::Add {
            name,
            model,
            api_key,
            base_url,
        } => {
            let provider = ProviderConfig {
                api_key,
                base_url,
                model,
            };
            app.service
                .add_provider(&app.scope, &name, provider, &app.cancel)
                .context("add provider")?;
            println!("{} Added provider {}", "✓".green(), name.cyan());
            Ok(())
        }
        ProviderCommands::Remove { name } => {
            app.service
                .remove_provider(&app.scope, &name, &app.cancel)
                .context("remove provider")?;
            println!("{} Removed provider {}", "✓".green(), name);
            Ok(())
        }
        ProviderCommands::Default { name } => {
            app.service
                .set_default_provider(&app.scope, &name, &app.cancel)
                .context("set default")?;
            println!("Default provider set to {}", name.cyan());
            Ok(())
        }
        ProviderCommands::Test { name } => {
            let reply = app
                .service
                .test_provider(&app.scope, &name, &app.cancel)
                .await
                .context("test provider")?;
            println!("{} Provider {} is working", "✓".green(), name.cyan());
            println!("   {}", reply.trim().dimmed());
            Ok(())
        }
    }
}

fn list(app: &App) -> Result<()> {
    let providers = app
        .service
        .providers(&app.scope, &app.cancel)
        .context("list providers")?;

    if app.json {
        let rows: Vec<_> = providers
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name,
                    "model": p.model,
                    "base_url": p.base_url,
                    "default": p.is_default,
                })
            })
            .collect();
        return super::print_json(&rows);
    }

    if providers.is_empty() {
        println!("No providers configured.");
        return Ok(());
    }

    for p in &providers {
        let marker = if p.is_default {
            " ★".yellow().to_string()
        } else {
            String::new()
        };
        println!("{}{}  {}", p.name.cyan().bold(), marker, p.model.dimmed());
    }
    Ok(())
}
