//! CLI module - Command definitions and handlers
//!
//! Every handler takes its parsed args plus the shared [`App`] and talks to
//! [`MemoryService`]; nothing here touches the store directly.

use std::io::Read;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::core::key::Key;
use crate::core::scope::ScopeType;
use crate::service::MemoryService;

pub mod add;
pub mod assist;
pub mod branch;
pub mod browse;
pub mod delete;
pub mod edit;
pub mod external;
pub mod get;
pub mod history;
pub mod hook;
pub mod init;
pub mod provider;
pub mod search;
pub mod set;

/// mem - versioned memory store on top of git
///
/// Keys map to files, history is git. Project stores live in `.mem` next to
/// your code, the global store under your home directory.
#[derive(Parser, Debug)]
#[command(name = "mem")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Target scope (project or global); default: nearest project, else global
    #[arg(long, global = true)]
    pub scope: Option<ScopeType>,

    /// Output in JSON format where supported
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a memory store
    Init(init::InitArgs),

    /// Create or update a memory
    Set(set::SetArgs),

    /// Print a memory
    Get(get::GetArgs),

    /// Delete a memory
    #[command(visible_aliases = ["delete", "rm"])]
    Del(delete::DelArgs),

    /// List memories
    #[command(visible_alias = "list")]
    Ls(browse::LsArgs),

    /// Append to a memory and commit
    Add(add::AddArgs),

    /// Replace a memory (opens $EDITOR without content) and commit
    Edit(edit::EditArgs),

    /// Commit staged changes
    Commit(history::CommitArgs),

    /// Show current branch and staged changes
    Status(history::StatusArgs),

    /// Show commit history
    Log(history::LogArgs),

    /// Show changes against HEAD or a revision
    Diff(history::DiffArgs),

    /// Show one commit
    Show(history::ShowArgs),

    /// Reset to a revision, discarding later work
    Revert(history::RevertArgs),

    /// List, create or delete branches
    Branch(branch::BranchArgs),

    /// Switch to an existing branch
    Switch(branch::SwitchArgs),

    /// Search memories
    Search(search::SearchArgs),

    /// Rebuild the vector index
    Index(search::IndexArgs),

    /// Summarize memories with the default provider
    Summarize(assist::SummarizeArgs),

    /// Suggest tags for a memory with the default provider
    Tag(assist::TagArgs),

    /// Manage text-completion providers
    Provider(provider::ProviderArgs),

    /// Manage the git post-commit hook
    Hook(hook::HookArgs),

    /// Any other name runs `mem-<name>` from PATH
    #[command(external_subcommand)]
    External(Vec<String>),
}

impl Commands {
    /// `hook run` is awaited by git, so it never waits on background work
    pub fn is_hook_run(&self) -> bool {
        matches!(
            self,
            Commands::Hook(hook::HookArgs {
                command: hook::HookCommands::Run { .. }
            })
        )
    }
}

/// Shared state for one invocation
pub struct App {
    pub service: MemoryService,
    /// Scope hint passed to every service call ("" = resolve normally)
    pub scope: String,
    pub json: bool,
    pub cancel: CancellationToken,
}

impl App {
    pub fn new(service: MemoryService, scope: Option<ScopeType>, json: bool, cancel: CancellationToken) -> Self {
        Self {
            service,
            scope: scope.map(|s| s.to_string()).unwrap_or_default(),
            json,
            cancel,
        }
    }
}

/// Dispatch a parsed command
pub async fn run(command: Commands, app: &App) -> Result<()> {
    match command {
        Commands::Init(args) => init::run(args, app),
        Commands::Set(args) => set::run(args, app).await,
        Commands::Get(args) => get::run(args, app),
        Commands::Del(args) => delete::run(args, app).await,
        Commands::Ls(args) => browse::run_ls(args, app),
        Commands::Add(args) => add::run(args, app).await,
        Commands::Edit(args) => edit::run(args, app).await,
        Commands::Commit(args) => history::run_commit(args, app),
        Commands::Status(args) => history::run_status(args, app),
        Commands::Log(args) => history::run_log(args, app),
        Commands::Diff(args) => history::run_diff(args, app),
        Commands::Show(args) => history::run_show(args, app),
        Commands::Revert(args) => history::run_revert(args, app),
        Commands::Branch(args) => branch::run(args, app),
        Commands::Switch(args) => branch::run_switch(args, app),
        Commands::Search(args) => search::run(args, app).await,
        Commands::Index(args) => search::run_index(args, app).await,
        Commands::Summarize(args) => assist::run_summarize(args, app).await,
        Commands::Tag(args) => assist::run_tag(args, app).await,
        Commands::Provider(args) => provider::run(args, app).await,
        Commands::Hook(args) => hook::run(args, app).await,
        Commands::External(args) => external::run(args, app).await,
    }
}

/// Parse a user-supplied key with a readable error
pub(crate) fn parse_key(raw: &str) -> Result<Key> {
    Key::parse(raw).with_context(|| format!("invalid key {:?}", raw))
}

/// The positional value, or all of stdin when it is absent
pub(crate) fn content_or_stdin(value: Option<String>) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read stdin")?;
            Ok(buf)
        }
    }
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_run_is_detected() {
        let cli = Cli::try_parse_from(["mem", "hook", "run", "post-commit"]).unwrap();
        assert!(cli.command.is_hook_run());

        let cli = Cli::try_parse_from(["mem", "index"]).unwrap();
        assert!(!cli.command.is_hook_run());
    }

    #[test]
    fn test_unknown_command_is_external() {
        let cli = Cli::try_parse_from(["mem", "hello", "world", "--flag"]).unwrap();
        match cli.command {
            Commands::External(args) => assert_eq!(args, ["hello", "world", "--flag"]),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
