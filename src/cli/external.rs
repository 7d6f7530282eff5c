//! External subcommands
//!
//! `mem <name> [args...]` for an unknown `<name>` runs `mem-<name>` from
//! `PATH`, git style. The plugin inherits stdio and gets the resolved scope
//! in its environment:
//!
//! | Variable         | Value                                  |
//! |------------------|----------------------------------------|
//! | `MEM_VERSION`    | version of this binary                 |
//! | `MEM_BIN`        | path of this binary                    |
//! | `MEM_SCOPE`      | `project` or `global`                  |
//! | `MEM_ROOT`       | directory holding the memory files     |
//! | `MEM_SCOPE_PATH` | store directory                        |
//! | `MEM_CONFIG`     | scope config file                      |
//! | `MEM_BRANCH`     | current branch (initialized scopes)    |
//!
//! # Usage
//! ```bash
//! mem hello world   # runs `mem-hello world`
//! ```

use anyhow::{anyhow, bail, Context, Result};

use super::App;

pub const PREFIX: &str = "mem-";

pub async fn run(args: Vec<String>, app: &App) -> Result<()> {
    let mut args = args.into_iter();
    let name = args.next().context("missing subcommand")?;

    let binary = format!("{}{}", PREFIX, name);
    let path = which::which(&binary)
        .map_err(|_| anyhow!("unknown command {:?}: {} not found in PATH", name, binary))?;

    let mut cmd = tokio::process::Command::new(&path);
    cmd.args(args).env("MEM_VERSION", env!("CARGO_PKG_VERSION"));
    if let Ok(exe) = std::env::current_exe() {
        cmd.env("MEM_BIN", exe);
    }
    for (key, value) in app.service.scope_env(&app.scope, &app.cancel)? {
        cmd.env(key, value);
    }

    let status = cmd
        .status()
        .await
        .with_context(|| format!("run {}", path.display()))?;
    if !status.success() {
        bail!("{} exited with {}", binary, status);
    }
    Ok(())
}
