//! Install / uninstall of the managed post-commit shim
//!
//! The shim lives in the hooks directory of the git repository that encloses
//! the scope root. A hook is "managed" iff its content carries [`HOOK_MARKER`];
//! anything else belongs to the user and is never clobbered without `force`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::context::discover;
use super::Strategy;
use crate::config::{Config, HookConfig, DEFAULT_HOOK_PREFIX};
use crate::core::scope::Scope;
use crate::error::{MemError, OpContext, Result};

/// Marker identifying a hook written by mem
pub const HOOK_MARKER: &str = "# mem: managed post-commit hook";

/// The only trigger point supported
pub const POST_COMMIT: &str = "post-commit";

const BACKUP_SUFFIX: &str = ".bak";

/// Shell shim content for `hook_type`
pub fn hook_script(hook_type: &str) -> String {
    format!(
        "#!/bin/sh\n{}\nexec mem hook run {} \"$@\"\n",
        HOOK_MARKER, hook_type
    )
}

pub fn is_managed_hook(content: &str) -> bool {
    content.contains(HOOK_MARKER)
}

/// Options for [`install`]
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Scope hint recorded in the hook config
    pub scope_hint: String,
    pub strategy: Strategy,
    pub script: Option<PathBuf>,
    pub force: bool,
}

/// Path of the post-commit hook for the repository enclosing `scope.root`
pub fn hook_path(scope: &Scope) -> Result<PathBuf> {
    let repo = discover(&scope.root)?;
    Ok(repo.path().join("hooks").join(POST_COMMIT))
}

/// Write the shim and enable the hook in the scope's config
///
/// Returns the path of the installed hook.
pub fn install(scope: &Scope, opts: &InstallOptions) -> Result<PathBuf> {
    let path = hook_path(scope)?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).op("create hooks directory")?;
    }

    match fs::read_to_string(&path) {
        Ok(existing) if !is_managed_hook(&existing) => {
            if !opts.force {
                return Err(MemError::HookConflict(path));
            }
            let backup = backup_path(&path);
            fs::write(&backup, existing).op("backup existing hook")?;
            make_executable(&backup)?;
            info!(backup = %backup.display(), "backed up existing hook");
        }
        Ok(_) => debug!("replacing managed hook"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        // Unreadable as text is still somebody else's hook
        Err(e) if e.kind() == ErrorKind::InvalidData && !opts.force => {
            return Err(MemError::HookConflict(path));
        }
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            let backup = backup_path(&path);
            fs::copy(&path, &backup).op("backup existing hook")?;
        }
        Err(e) => return Err(e).op("read existing hook"),
    }

    fs::write(&path, hook_script(POST_COMMIT)).op("write hook")?;
    make_executable(&path)?;

    let hook = HookConfig {
        enabled: true,
        scope: opts.scope_hint.clone(),
        strategy: opts.strategy,
        script: opts.script.clone(),
        key_prefix: DEFAULT_HOOK_PREFIX.to_string(),
        quiet: false,
    };
    Config::save_hook(&scope.config_path(), &hook)?;

    info!(hook = %path.display(), strategy = %opts.strategy, "installed post-commit hook");
    Ok(path)
}

/// Remove the managed shim, restoring a backup if one exists
///
/// With `keep_config` the hook config is left as-is for a later reinstall;
/// otherwise it is reset to defaults (disabled).
pub fn uninstall(scope: &Scope, keep_config: bool) -> Result<()> {
    let path = hook_path(scope)?;

    match fs::read_to_string(&path) {
        Ok(content) => {
            if !is_managed_hook(&content) {
                return Err(MemError::UnmanagedHook(path));
            }
            let backup = backup_path(&path);
            if backup.is_file() {
                fs::rename(&backup, &path).op("restore hook backup")?;
                info!(hook = %path.display(), "restored previous hook");
            } else {
                fs::remove_file(&path).op("remove hook")?;
                info!(hook = %path.display(), "removed hook");
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => debug!("no hook installed"),
        Err(e) if e.kind() == ErrorKind::InvalidData => return Err(MemError::UnmanagedHook(path)),
        Err(e) => return Err(e).op("read hook"),
    }

    if !keep_config {
        Config::save_hook(&scope.config_path(), &HookConfig::default())?;
    }
    Ok(())
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).op("set hook permissions")
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
