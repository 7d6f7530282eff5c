//! Summarize and script strategies

use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::context::CommitContext;
use crate::collab::Provider;
use crate::error::{MemError, OpContext, Result};

pub const ENV_COMMIT_HASH: &str = "MEM_COMMIT_HASH";
pub const ENV_COMMIT_MSG: &str = "MEM_COMMIT_MSG";
pub const ENV_COMMIT_AUTHOR: &str = "MEM_COMMIT_AUTHOR";

pub(crate) fn summarize_prompt(ctx: &CommitContext) -> String {
    format!(
        "Summarize the following git commit in 1-3 sentences.\n\
         Focus on what changed and why.\n\n\
         Commit: {}\nMessage: {}\n\nDiff:\n{}",
        ctx.hash, ctx.message, ctx.diff
    )
}

/// Ask the provider for a short prose summary of the commit
pub async fn summarize(ctx: &CommitContext, provider: &dyn Provider) -> Result<String> {
    let summary = provider.complete(&summarize_prompt(ctx)).await?;
    Ok(summary.trim().to_string())
}

/// Run `script` with the diff on stdin and commit metadata in the environment
///
/// The script's stdout is sent to stderr so it never pollutes the output of
/// the git command that triggered the hook.
pub async fn run_script(ctx: &CommitContext, script: &Path) -> Result<()> {
    let mut child = Command::new(script)
        .env(ENV_COMMIT_HASH, &ctx.hash)
        .env(ENV_COMMIT_MSG, &ctx.message)
        .env(ENV_COMMIT_AUTHOR, &ctx.author)
        .stdin(Stdio::piped())
        .stdout(std::io::stderr())
        .stderr(Stdio::inherit())
        .spawn()
        .op("spawn hook script")?;

    if let Some(mut stdin) = child.stdin.take() {
        let diff = ctx.diff.clone().into_bytes();
        // A script that never reads stdin closes the pipe early; that is fine
        match stdin.write_all(&diff).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                debug!("hook script closed stdin early")
            }
            Err(e) => return Err(e).op("write hook script stdin"),
        }
    }

    let status = child.wait().await.op("wait for hook script")?;
    if !status.success() {
        return Err(MemError::Collaborator(format!(
            "script {} exited with {}",
            script.display(),
            status
        )));
    }
    Ok(())
}
